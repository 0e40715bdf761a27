//! Error types for Storefront
//!
//! Two layers of errors live here:
//! - [`ApiError`]: what a single backend call can fail with. It is `Clone`
//!   because one in-flight request may settle many waiting callers.
//! - [`StorefrontError`]: the crate-wide error covering configuration,
//!   local storage and everything the CLI touches.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Result type alias for Storefront operations
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Comprehensive error type for Storefront operations
#[derive(Error, Debug)]
pub enum StorefrontError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Client state storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// SQLite database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend call errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Other errors
    #[error("{0}")]
    Other(String),

    /// Anyhow errors (for more context)
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Failure of a single backend call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The request never produced an HTTP response (connect, timeout, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-2xx status
    #[error("Request failed ({status}): {message}")]
    Status {
        status: u16,
        message: String,
        data: Value,
    },

    /// The access token could not be refreshed; the session is over
    #[error("Session refresh failed: {reason}")]
    RefreshFailed {
        reason: String,
        original: Option<Box<ApiError>>,
    },

    /// A refresh was needed but no refresh token is stored
    #[error("No refresh token available")]
    MissingRefreshToken,

    /// The endpoint requires a login and no credentials are stored
    #[error("Authentication required")]
    Unauthenticated,

    /// The payload did not have the expected shape
    #[error("Unexpected response payload: {0}")]
    Decode(String),
}

/// Coarse classification of [`ApiError`]s
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Authentication,
    Client,
    Server,
    Decode,
}

/// Uniform `{status, message, data}` shape handed to UI code
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub status: Option<u16>,
    pub message: String,
    pub data: Value,
}

impl ApiError {
    /// Build a normalized status error from a response body.
    ///
    /// The message is taken from the first string among the `detail`,
    /// `message` and `error` fields, falling back to the status' reason
    /// phrase.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let data: Value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(body)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
        };

        let message = ["detail", "message", "error"]
            .iter()
            .find_map(|field| data.get(field).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| canonical_reason(status));

        ApiError::Status {
            status,
            message,
            data,
        }
    }

    /// HTTP status behind this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::RefreshFailed {
                original: Some(original),
                ..
            } => original.status(),
            ApiError::MissingRefreshToken | ApiError::Unauthenticated => Some(401),
            _ => None,
        }
    }

    /// True for plain 401 responses (the ones that trigger a refresh)
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Status { status: 401, .. })
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Network(_) => ErrorKind::Network,
            ApiError::Decode(_) => ErrorKind::Decode,
            ApiError::RefreshFailed { .. }
            | ApiError::MissingRefreshToken
            | ApiError::Unauthenticated => ErrorKind::Authentication,
            ApiError::Status { status, .. } => match status {
                401 => ErrorKind::Authentication,
                500..=599 => ErrorKind::Server,
                _ => ErrorKind::Client,
            },
        }
    }

    /// Collapse into the `{status, message, data}` shape
    pub fn normalized(&self) -> ErrorBody {
        match self {
            ApiError::Status {
                status,
                message,
                data,
            } => ErrorBody {
                status: Some(*status),
                message: message.clone(),
                data: data.clone(),
            },
            ApiError::RefreshFailed {
                original: Some(original),
                reason,
            } => {
                let mut body = original.normalized();
                body.message = format!("{}: {}", body.message, reason);
                body
            }
            other => ErrorBody {
                status: other.status(),
                message: other.to_string(),
                data: Value::Null,
            },
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}

fn canonical_reason(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status))
}
