//! Shops and their listings

use super::{segment, Book, Page, PageParams};
use crate::client::{ApiClient, ApiRequest};
use crate::Result;
use serde::{Deserialize, Serialize};

const SHOPS_PATH: &str = "/shops/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    pub id: u64,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
}

pub struct Shops<'a> {
    client: &'a ApiClient,
}

impl<'a> Shops<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, page: PageParams) -> Result<Page<Shop>> {
        let request = page.apply(ApiRequest::get(SHOPS_PATH));
        Ok(self.client.send_as(request).await?)
    }

    pub async fn get(&self, slug: &str) -> Result<Shop> {
        let path = format!("{}{}/", SHOPS_PATH, segment(slug));
        Ok(self.client.send_as(ApiRequest::get(path)).await?)
    }

    pub async fn books(&self, slug: &str, page: PageParams) -> Result<Page<Book>> {
        let path = format!("{}{}/books/", SHOPS_PATH, segment(slug));
        let request = page.apply(ApiRequest::get(path));
        Ok(self.client.send_as(request).await?)
    }
}
