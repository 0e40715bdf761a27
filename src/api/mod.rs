//! Typed endpoint wrappers
//!
//! Each resource gets a small handle borrowing the [`ApiClient`], so calls
//! read as `client.books().list(&query)`. Everything goes through
//! [`ApiClient::send`] and inherits its auth, cache and error handling.

pub mod auth;
pub mod books;
pub mod cart;
pub mod categories;
pub mod comments;
pub mod contact;
pub mod orders;
pub mod posts;
pub mod shops;

pub use auth::{Auth, Avatar, Credentials, ProfileUpdate, Registration, User};
pub use books::{Book, BookQuery, Books, LikeStatus};
pub use cart::{Cart, CartApi, CartItem};
pub use categories::{Categories, Category};
pub use comments::{Comment, Comments, NewComment};
pub use contact::{Contact, ContactMessage};
pub use orders::{NewOrder, Order, OrderLine, Orders};
pub use posts::{Post, Posts};
pub use shops::{Shop, Shops};

use crate::client::ApiClient;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Serialize a request payload
pub(crate) fn to_body<T: Serialize>(payload: &T) -> Result<Value, ApiError> {
    serde_json::to_value(payload).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Percent-encode one path segment
pub(crate) fn segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

/// Paginated list envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

/// Page selection shared by the list endpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageParams {
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            page_size: None,
        }
    }

    pub(crate) fn apply(&self, request: crate::client::ApiRequest) -> crate::client::ApiRequest {
        request
            .query_opt("page", self.page)
            .query_opt("page_size", self.page_size)
    }
}

impl ApiClient {
    pub fn auth(&self) -> Auth<'_> {
        Auth::new(self)
    }

    pub fn books(&self) -> Books<'_> {
        Books::new(self)
    }

    pub fn categories(&self) -> Categories<'_> {
        Categories::new(self)
    }

    pub fn shops(&self) -> Shops<'_> {
        Shops::new(self)
    }

    pub fn posts(&self) -> Posts<'_> {
        Posts::new(self)
    }

    pub fn comments(&self) -> Comments<'_> {
        Comments::new(self)
    }

    pub fn orders(&self) -> Orders<'_> {
        Orders::new(self)
    }

    pub fn cart(&self) -> CartApi<'_> {
        CartApi::new(self)
    }

    pub fn contact(&self) -> Contact<'_> {
        Contact::new(self)
    }
}
