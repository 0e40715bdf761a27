//! Order history and checkout

use super::{to_body, Page, PageParams};
use crate::client::{ApiClient, ApiRequest, AuthMode};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const ORDERS_PATH: &str = "/orders/";
const CART_PATH: &str = "/cart/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub status: String,
    #[serde(default)]
    pub total: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(default)]
    pub book: Option<String>,
    pub quantity: u32,
    #[serde(default)]
    pub price: Option<String>,
}

/// Checkout details; the order is built from the current cart
#[derive(Debug, Clone, Serialize)]
pub struct NewOrder {
    pub address: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

pub struct Orders<'a> {
    client: &'a ApiClient,
}

impl<'a> Orders<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, page: PageParams) -> Result<Page<Order>> {
        let request = page
            .apply(ApiRequest::get(ORDERS_PATH))
            .auth(AuthMode::Required);
        Ok(self.client.send_as(request).await?)
    }

    pub async fn get(&self, id: u64) -> Result<Order> {
        let request = ApiRequest::get(format!("{}{}/", ORDERS_PATH, id)).auth(AuthMode::Required);
        Ok(self.client.send_as(request).await?)
    }

    /// Place an order. Checkout empties the cart, so both caches go.
    pub async fn create(&self, order: &NewOrder) -> Result<Order> {
        let request = ApiRequest::post(ORDERS_PATH)
            .json(to_body(order)?)
            .auth(AuthMode::Required);
        let created: Order = self.client.send_as(request).await?;
        self.client.invalidate(ORDERS_PATH);
        self.client.invalidate(CART_PATH);
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{client_with, ScriptedTransport, BASE};
    use crate::error::ApiError;
    use crate::storage::TokenPair;
    use crate::StorefrontError;
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;

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
    async fn test_create_order_drops_cart_cache() {
        let transport = Arc::new(ScriptedTransport::new(BASE));
        transport.always(Method::GET, CART_PATH, 200, json!({"items": []}));
        transport.always(
            Method::POST,
            ORDERS_PATH,
            201,
            json!({"id": 12, "status": "pending", "total": "25.00",
                   "items": [{"book": "Dune", "quantity": 2, "price": "12.50"}]}),
        );
        let client = logged_in(transport.clone());
        client.get(CART_PATH).await.unwrap();

        let order = client
            .orders()
            .create(&NewOrder {
                address: "Amir Temur 1, Tashkent".into(),
                phone: "+998901234567".into(),
                note: None,
            })
            .await
            .unwrap();
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(client.cached_entries(), 0);
    }

    #[tokio::test]
    async fn test_validation_errors_keep_field_data() {
        let transport = Arc::new(ScriptedTransport::new(BASE));
        transport.always(
            Method::POST,
            ORDERS_PATH,
            400,
            json!({"phone": ["Enter a valid phone number."]}),
        );
        let client = logged_in(transport.clone());

        let err = client
            .orders()
            .create(&NewOrder {
                address: "x".into(),
                phone: "123".into(),
                note: None,
            })
            .await
            .unwrap_err();
        let StorefrontError::Api(api) = err else {
            panic!("expected an API error");
        };
        let body = api.normalized();
        assert_eq!(body.status, Some(400));
        assert_eq!(body.data["phone"][0], "Enter a valid phone number.");
        assert!(matches!(api, ApiError::Status { .. }));
    }
}
