//! Book catalogue, likes included

use super::{segment, Page};
use crate::client::{ApiClient, ApiRequest, AuthMode};
use crate::Result;
use serde::{Deserialize, Serialize};

const BOOKS_PATH: &str = "/books/";
const LIKED_PATH: &str = "/books/liked/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: u64,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Decimal amount as sent by the server
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub shop: Option<String>,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub is_liked: bool,
}

/// Filters for the book list
#[derive(Debug, Clone, Default)]
pub struct BookQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub category: Option<String>,
    pub shop: Option<String>,
    pub search: Option<String>,
    /// Sort field, `-` prefix for descending (`-created_at`, `price`)
    pub ordering: Option<String>,
}

impl BookQuery {
    fn apply(&self, request: ApiRequest) -> ApiRequest {
        request
            .query_opt("page", self.page)
            .query_opt("page_size", self.page_size)
            .query_opt("category", self.category.as_deref())
            .query_opt("shop", self.shop.as_deref())
            .query_opt("search", self.search.as_deref().filter(|s| !s.is_empty()))
            .query_opt("ordering", self.ordering.as_deref())
    }
}

/// Result of a like toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LikeStatus {
    pub liked: bool,
    #[serde(default)]
    pub likes_count: u64,
}

pub struct Books<'a> {
    client: &'a ApiClient,
}

impl<'a> Books<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, query: &BookQuery) -> Result<Page<Book>> {
        let request = query.apply(ApiRequest::get(BOOKS_PATH));
        Ok(self.client.send_as(request).await?)
    }

    pub async fn get(&self, slug: &str) -> Result<Book> {
        let path = format!("{}{}/", BOOKS_PATH, segment(slug));
        Ok(self.client.send_as(ApiRequest::get(path)).await?)
    }

    /// Toggle the like on a book and record the outcome locally
    pub async fn toggle_like(&self, slug: &str) -> Result<LikeStatus> {
        let path = format!("{}{}/like/", BOOKS_PATH, segment(slug));
        let request = ApiRequest::post(path).auth(AuthMode::Required);
        let status: LikeStatus = self.client.send_as(request).await?;

        let storage = self.client.storage();
        let mut liked = storage.liked_books()?;
        liked.retain(|s| s != slug);
        if status.liked {
            liked.push(slug.to_string());
        }
        storage.store_liked_books(&liked)?;

        self.client.invalidate(LIKED_PATH);
        self.client
            .invalidate(&format!("{}{}/", BOOKS_PATH, segment(slug)));
        Ok(status)
    }

    /// Books the user liked; refreshes the stored slugs
    pub async fn liked(&self) -> Result<Page<Book>> {
        let request = ApiRequest::get(LIKED_PATH).auth(AuthMode::Required);
        let page: Page<Book> = self.client.send_as(request).await?;

        let slugs: Vec<String> = page.results.iter().map(|b| b.slug.clone()).collect();
        self.client.storage().store_liked_books(&slugs)?;
        Ok(page)
    }

    /// Whether the book is liked, from locally stored state
    pub fn is_liked(&self, slug: &str) -> Result<bool> {
        Ok(self
            .client
            .storage()
            .liked_books()?
            .iter()
            .any(|s| s == slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{client_with, ScriptedTransport, BASE};
    use crate::storage::TokenPair;
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;

    fn book(slug: &str) -> serde_json::Value {
        json!({"id": 1, "slug": slug, "title": "Dune", "price": "12.50"})
    }

    fn logged_in(transport: Arc<ScriptedTransport>) -> ApiClient {
        let client = client_with(transport);
        client
            .storage()
            .store_login(&TokenPair {
                access: "a1".into(),
                refresh: Some("r1".into()),
                expires_at: None,
            })
            .unwrap();
        client
    }

    #[tokio::test]
    async fn test_list_sends_filters() {
        let transport = Arc::new(ScriptedTransport::new(BASE));
        transport.always(
            Method::GET,
            BOOKS_PATH,
            200,
            json!({"count": 1, "next": null, "previous": null, "results": [book("dune")]}),
        );
        let client = client_with(transport.clone());

        let query = BookQuery {
            category: Some("sci-fi".into()),
            search: Some(String::new()),
            ordering: Some("-created_at".into()),
            ..Default::default()
        };
        let page = client.books().list(&query).await.unwrap();
        assert_eq!(page.results[0].price.as_deref(), Some("12.50"));

        let sent = &transport.sent()[0];
        assert_eq!(
            sent.query,
            vec![
                ("category".to_string(), "sci-fi".to_string()),
                ("ordering".to_string(), "-created_at".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_toggle_like_updates_stored_slugs() {
        let transport = Arc::new(ScriptedTransport::new(BASE));
        transport.once(Method::POST, "/books/dune/like/", 200, json!({"liked": true, "likes_count": 5}));
        transport.once(Method::POST, "/books/dune/like/", 200, json!({"liked": false, "likes_count": 4}));
        transport.always(Method::GET, "/books/dune/", 200, book("dune"));
        let client = logged_in(transport.clone());

        client.books().get("dune").await.unwrap();
        assert_eq!(client.cached_entries(), 1);

        let status = client.books().toggle_like("dune").await.unwrap();
        assert!(status.liked);
        assert!(client.books().is_liked("dune").unwrap());
        assert_eq!(client.cached_entries(), 0);

        client.books().toggle_like("dune").await.unwrap();
        assert!(!client.books().is_liked("dune").unwrap());
    }

    #[tokio::test]
    async fn test_liked_syncs_storage() {
        let transport = Arc::new(ScriptedTransport::new(BASE));
        transport.always(
            Method::GET,
            LIKED_PATH,
            200,
            json!({"count": 2, "results": [book("dune"), book("emma")]}),
        );
        let client = logged_in(transport.clone());

        let page = client.books().liked().await.unwrap();
        assert_eq!(page.count, 2);
        assert_eq!(client.storage().liked_books().unwrap(), vec!["dune", "emma"]);
    }

    #[tokio::test]
    async fn test_like_requires_login() {
        let transport = Arc::new(ScriptedTransport::new(BASE));
        let client = client_with(transport.clone());

        assert!(client.books().toggle_like("dune").await.is_err());
        assert_eq!(transport.calls(), 0);
    }
}
