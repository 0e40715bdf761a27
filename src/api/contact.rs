//! Contact form

use super::to_body;
use crate::client::{ApiClient, ApiRequest};
use crate::Result;
use serde::Serialize;
use serde_json::Value;

const CONTACT_PATH: &str = "/contact/";

#[derive(Debug, Clone, Serialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
}

pub struct Contact<'a> {
    client: &'a ApiClient,
}

impl<'a> Contact<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn send(&self, message: &ContactMessage) -> Result<Value> {
        let request = ApiRequest::post(CONTACT_PATH).json(to_body(message)?);
        Ok(self.client.send(request).await?)
    }
}
