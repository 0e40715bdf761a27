//! Blog posts

use super::{segment, Page, PageParams};
use crate::client::{ApiClient, ApiRequest};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const POSTS_PATH: &str = "/posts/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

pub struct Posts<'a> {
    client: &'a ApiClient,
}

impl<'a> Posts<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, page: PageParams) -> Result<Page<Post>> {
        let request = page.apply(ApiRequest::get(POSTS_PATH));
        Ok(self.client.send_as(request).await?)
    }

    pub async fn get(&self, slug: &str) -> Result<Post> {
        let path = format!("{}{}/", POSTS_PATH, segment(slug));
        Ok(self.client.send_as(ApiRequest::get(path)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{client_with, ScriptedTransport, BASE};
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_post_detail() {
        let transport = Arc::new(ScriptedTransport::new(BASE));
        transport.always(
            Method::GET,
            "/posts/spring-sale/",
            200,
            json!({
                "id": 4,
                "slug": "spring-sale",
                "title": "Spring sale",
                "published_at": "2026-03-01T09:00:00Z"
            }),
        );
        let client = client_with(transport);

        let post = client.posts().get("spring-sale").await.unwrap();
        assert_eq!(post.published_at.unwrap().to_rfc3339(), "2026-03-01T09:00:00+00:00");
        assert_eq!(post.content, None);
    }
}
