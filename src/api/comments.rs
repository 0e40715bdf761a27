//! Reader comments on books

use super::{segment, to_body, Page, PageParams};
use crate::client::{ApiClient, ApiRequest, AuthMode};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    #[serde(default)]
    pub author: Option<String>,
    pub text: String,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewComment {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

pub struct Comments<'a> {
    client: &'a ApiClient,
}

fn comments_path(book_slug: &str) -> String {
    format!("/books/{}/comments/", segment(book_slug))
}

impl<'a> Comments<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, book_slug: &str, page: PageParams) -> Result<Page<Comment>> {
        let request = page.apply(ApiRequest::get(comments_path(book_slug)));
        Ok(self.client.send_as(request).await?)
    }

    /// Post a comment; cached pages of the thread are dropped
    pub async fn add(&self, book_slug: &str, comment: &NewComment) -> Result<Comment> {
        let path = comments_path(book_slug);
        let request = ApiRequest::post(path.as_str())
            .json(to_body(comment)?)
            .auth(AuthMode::Required);
        let created: Comment = self.client.send_as(request).await?;
        self.client.invalidate(&path);
        Ok(created)
    }
}
