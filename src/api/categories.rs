//! Book categories

use super::{segment, Page, PageParams};
use crate::client::{ApiClient, ApiRequest};
use crate::Result;
use serde::{Deserialize, Serialize};

const CATEGORIES_PATH: &str = "/categories/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub books_count: Option<u64>,
}

pub struct Categories<'a> {
    client: &'a ApiClient,
}

impl<'a> Categories<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, page: PageParams) -> Result<Page<Category>> {
        let request = page.apply(ApiRequest::get(CATEGORIES_PATH));
        Ok(self.client.send_as(request).await?)
    }

    pub async fn get(&self, slug: &str) -> Result<Category> {
        let path = format!("{}{}/", CATEGORIES_PATH, segment(slug));
        Ok(self.client.send_as(ApiRequest::get(path)).await?)
    }
}
