//! Configuration validation
//!
//! Validates storefront configuration for correctness:
//! - Base URL is an absolute http(s) URL
//! - Locales are well-formed and the default is among the supported ones
//! - Timeouts and TTLs are non-zero

use super::client_config::ClientConfig;
use crate::locale::Locale;
use crate::StorefrontError;
use reqwest::Url;
use std::collections::HashSet;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Validate a storefront configuration, collecting every problem found
pub fn validate_config(config: &ClientConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if !is_valid_base_url(&config.base_url) {
        errors.push(ValidationError::new(
            "base_url",
            format!("Invalid API URL: {}", config.base_url),
        ));
    }

    if config.supported_locales.is_empty() {
        errors.push(ValidationError::new(
            "supported_locales",
            "At least one locale must be supported",
        ));
    }

    let mut seen = HashSet::new();
    for tag in &config.supported_locales {
        if Locale::parse(tag).is_err() {
            errors.push(ValidationError::new(
                "supported_locales",
                format!("Invalid locale tag '{}'", tag),
            ));
        }
        if !seen.insert(tag.to_ascii_lowercase()) {
            errors.push(ValidationError::new(
                "supported_locales",
                format!("Duplicate locale: {}", tag),
            ));
        }
    }

    if !seen.contains(&config.default_locale.to_ascii_lowercase()) {
        errors.push(ValidationError::new(
            "default_locale",
            format!(
                "Default locale '{}' must be one of: {}",
                config.default_locale,
                config.supported_locales.join(", ")
            ),
        ));
    }

    if config.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "request_timeout_secs",
            "Timeout must be greater than 0",
        ));
    }

    if config.cache_ttl_secs == 0 {
        errors.push(ValidationError::new(
            "cache_ttl_secs",
            "Cache TTL must be greater than 0",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_valid_base_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
                && parsed.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}

/// Validate configuration and return a Result
pub fn validate_config_result(config: &ClientConfig) -> crate::Result<()> {
    validate_config(config).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        StorefrontError::Config(format!(
            "Configuration validation failed:\n  - {}",
            messages.join("\n  - ")
        ))
    })
}
