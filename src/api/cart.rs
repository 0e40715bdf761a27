//! Shopping cart

use crate::client::{ApiClient, ApiRequest, AuthMode};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;

const CART_PATH: &str = "/cart/";
const ITEMS_PATH: &str = "/cart/items/";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub total: Option<String>,
}

impl Cart {
    pub fn quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: u64,
    /// Book id
    pub book: u64,
    #[serde(default)]
    pub title: Option<String>,
    pub quantity: u32,
    #[serde(default)]
    pub price: Option<String>,
}

pub struct CartApi<'a> {
    client: &'a ApiClient,
}

impl<'a> CartApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn get(&self) -> Result<Cart> {
        let request = ApiRequest::get(CART_PATH).auth(AuthMode::Required);
        Ok(self.client.send_as(request).await?)
    }

    pub async fn add(&self, book_id: u64, quantity: u32) -> Result<CartItem> {
        let request = ApiRequest::post(ITEMS_PATH)
            .json(json!({ "book": book_id, "quantity": quantity }))
            .auth(AuthMode::Required);
        let item = self.client.send_as(request).await?;
        self.client.invalidate(CART_PATH);
        Ok(item)
    }

    pub async fn update(&self, item_id: u64, quantity: u32) -> Result<CartItem> {
        let request = ApiRequest::patch(format!("{}{}/", ITEMS_PATH, item_id))
            .json(json!({ "quantity": quantity }))
            .auth(AuthMode::Required);
        let item = self.client.send_as(request).await?;
        self.client.invalidate(CART_PATH);
        Ok(item)
    }

    pub async fn remove(&self, item_id: u64) -> Result<()> {
        let request =
            ApiRequest::delete(format!("{}{}/", ITEMS_PATH, item_id)).auth(AuthMode::Required);
        self.client.send(request).await?;
        self.client.invalidate(CART_PATH);
        Ok(())
    }
}
