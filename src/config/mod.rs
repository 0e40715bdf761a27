//! Configuration system
//!
//! Loads ~/.config/storefront/config.yaml with support for:
//! - Backend base URL (overridable via `STOREFRONT_API_URL`)
//! - Supported and default locales
//! - Request timeout, response cache TTL and token refresh leeway
//! - Location of the persisted client state

mod client_config;
pub mod validation;

pub use client_config::{ClientConfig, API_URL_ENV};
pub use validation::{validate_config, validate_config_result, ValidationError};
