//! Storefront configuration file handling
//!
//! Loads and manages the ~/.config/storefront/config.yaml file.

use crate::locale::{Locale, LocaleSet};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides the backend base URL
pub const API_URL_ENV: &str = "STOREFRONT_API_URL";

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_supported_locales() -> Vec<String> {
    vec!["en".to_string(), "ru".to_string(), "uz".to_string()]
}

fn default_request_timeout() -> u64 {
    30
}

fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}

fn default_refresh_leeway() -> u64 {
    30
}

fn default_state_path() -> PathBuf {
    // Always use ~/.config for consistency across platforms (macOS, Linux)
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(".config");
    path.push("storefront");
    path.push("state.db");
    path
}

/// Storefront client configuration
///
/// Everything except `base_url` is a fixed client policy; `base_url` may be
/// overridden from the environment via [`API_URL_ENV`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend REST API root (endpoint paths are appended to it)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Locale used when none is requested
    #[serde(default = "default_locale")]
    pub default_locale: String,

    /// Locales the storefront is translated into
    #[serde(default = "default_supported_locales")]
    pub supported_locales: Vec<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Lifetime of cached GET responses in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Refresh the access token this many seconds before it expires
    #[serde(default = "default_refresh_leeway")]
    pub refresh_leeway_secs: u64,

    /// Path of the SQLite file holding tokens and cached user data
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

impl ClientConfig {
    /// Create a configuration with all defaults
    pub fn new() -> Self {
        Self {
            base_url: default_base_url(),
            default_locale: default_locale(),
            supported_locales: default_supported_locales(),
            request_timeout_secs: default_request_timeout(),
            cache_ttl_secs: default_cache_ttl(),
            refresh_leeway_secs: default_refresh_leeway(),
            state_path: default_state_path(),
        }
    }

    /// Configuration pointing at an explicit backend, defaults otherwise
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the default path, falling back to defaults
    /// when the file does not exist yet
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::new());
        }
        Self::load(&path)
    }

    /// Load configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(crate::StorefrontError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Loading storefront configuration");

        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        tracing::debug!(
            base_url = %config.base_url,
            locales = config.supported_locales.len(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save_default(&self) -> Result<()> {
        let path = Self::default_path();
        self.save(&path)
    }

    /// Save configuration to a specific path
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "Saving storefront configuration");

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;

        Ok(())
    }

    /// Get the default config path (~/.config/storefront/config.yaml)
    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".config");
        path.push("storefront");
        path.push("config.yaml");
        path
    }

    /// Apply the base URL override from the environment, if set
    pub fn apply_env(&mut self) {
        self.apply_base_url_override(std::env::var(API_URL_ENV).ok());
    }

    /// Replace `base_url` with a non-empty override
    pub fn apply_base_url_override(&mut self, url: Option<String>) {
        if let Some(url) = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) {
            tracing::debug!(base_url = %url, "Base URL overridden");
            self.base_url = url;
        }
    }

    /// Base URL without a trailing slash
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn refresh_leeway(&self) -> Duration {
        Duration::from_secs(self.refresh_leeway_secs)
    }

    /// Build the locale set described by this configuration
    pub fn locales(&self) -> Result<LocaleSet> {
        let supported = self
            .supported_locales
            .iter()
            .map(|tag| Locale::parse(tag))
            .collect::<Result<Vec<_>>>()?;
        LocaleSet::new(supported, Locale::parse(&self.default_locale)?)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}
