//! Authentication support for the API client
//!
//! - [`jwt`]: reading the expiry claim of access tokens
//! - [`refresh`]: the single-flight refresh coordinator
//! - [`SessionEvent`]: notifications for the UI layer (login, refresh,
//!   expiry with the login route to redirect to, logout)

pub mod jwt;
pub mod refresh;

pub use refresh::RefreshCoordinator;

use crate::error::ApiError;
use crate::storage::TokenPair;
use chrono::{Duration, Utc};
use serde::Deserialize;

/// Endpoint exchanging a refresh token for a new access token
pub const REFRESH_PATH: &str = "/auth/token/refresh/";

/// Session lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    Refreshed,
    /// Tokens are gone; the UI should send the user to `login_path`
    Expired { login_path: String },
    LoggedOut,
}

/// Token payload returned by login and refresh
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
    /// Access token lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    pub fn from_value(value: serde_json::Value) -> Result<Self, ApiError> {
        serde_json::from_value(value)
            .map_err(|e| ApiError::Decode(format!("token response: {}", e)))
    }

    /// Out-of-range lifetimes are treated as no explicit expiry
    pub fn into_pair(self) -> TokenPair {
        let expires_at = self
            .expires_in
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime));
        TokenPair {
            access: self.access,
            refresh: self.refresh,
            expires_at,
        }
    }
}
