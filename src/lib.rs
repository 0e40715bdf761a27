//! Storefront - authenticated API client for a multi-locale book marketplace
//!
//! Every backend call goes through one [`ApiClient`] that attaches the
//! bearer token and `Accept-Language`, refreshes expired tokens exactly once
//! no matter how many requests notice, replays a request once after a 401,
//! serves repeated GETs from a short-lived cache and collapses identical
//! in-flight GETs into one network call.
//!
//! # Architecture
//!
//! - **client**: request pipeline, transport seam (reqwest)
//! - **auth**: token expiry, single-flight refresh, session events
//! - **cache**: TTL response cache and pending-request ledger
//! - **storage**: persisted tokens and user data (memory, SQLite)
//! - **locale**: supported locales, negotiation, localized routes
//! - **api**: typed wrappers for the marketplace endpoints
//! - **config**: YAML configuration and validation

pub mod api;
pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod locale;
pub mod logging;
pub mod storage;

// Re-exports
pub use client::ApiClient;
pub use error::{ApiError, Result, StorefrontError};
