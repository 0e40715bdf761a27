//! Typed view over the client state: tokens, login time, cached user data

use super::StateStore;
use crate::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

/// Keys used in the state store
pub mod keys {
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const TOKEN_EXPIRES_AT: &str = "token_expires_at";
    pub const LOGIN_AT: &str = "login_at";
    pub const USER: &str = "user";
    pub const LIKED_BOOKS: &str = "liked_books";
}

/// Tokens issued by a login or refresh
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPair {
    pub access: String,
    /// Absent when the server did not rotate the refresh token
    pub refresh: Option<String>,
    /// Absent when the server sent no explicit lifetime
    pub expires_at: Option<DateTime<Utc>>,
}

/// Token and session storage backed by any [`StateStore`]
#[derive(Clone)]
pub struct TokenStorage {
    store: Arc<dyn StateStore>,
}

impl std::fmt::Debug for TokenStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStorage").finish_non_exhaustive()
    }
}

impl TokenStorage {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Storage over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(super::MemoryStore::new()))
    }

    pub fn access_token(&self) -> Result<Option<String>> {
        self.store.get(keys::ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> Result<Option<String>> {
        self.store.get(keys::REFRESH_TOKEN)
    }

    /// Explicitly stored access token expiry
    pub fn expires_at(&self) -> Result<Option<DateTime<Utc>>> {
        self.timestamp(keys::TOKEN_EXPIRES_AT)
    }

    pub fn login_at(&self) -> Result<Option<DateTime<Utc>>> {
        self.timestamp(keys::LOGIN_AT)
    }

    /// True when any credential is stored
    pub fn has_credentials(&self) -> Result<bool> {
        Ok(self.access_token()?.is_some() || self.refresh_token()?.is_some())
    }

    /// Persist the tokens of a fresh login and stamp the login time
    pub fn store_login(&self, tokens: &TokenPair) -> Result<()> {
        self.store_refresh(tokens)?;
        self.store.set(keys::LOGIN_AT, &Utc::now().to_rfc3339())?;
        Ok(())
    }

    /// Persist refreshed tokens.
    ///
    /// The stored refresh token is only replaced when the server rotated it.
    /// The stored expiry always follows the new access token, so a missing
    /// lifetime falls back to the token's own claim.
    pub fn store_refresh(&self, tokens: &TokenPair) -> Result<()> {
        self.store.set(keys::ACCESS_TOKEN, &tokens.access)?;
        if let Some(refresh) = &tokens.refresh {
            self.store.set(keys::REFRESH_TOKEN, refresh)?;
        }
        match tokens.expires_at {
            Some(at) => self.store.set(keys::TOKEN_EXPIRES_AT, &at.to_rfc3339())?,
            None => self.store.remove(keys::TOKEN_EXPIRES_AT)?,
        }
        Ok(())
    }

    /// Forget every auth token
    pub fn clear_tokens(&self) -> Result<()> {
        for key in [
            keys::ACCESS_TOKEN,
            keys::REFRESH_TOKEN,
            keys::TOKEN_EXPIRES_AT,
            keys::LOGIN_AT,
        ] {
            self.store.remove(key)?;
        }
        Ok(())
    }

    pub fn cached_user(&self) -> Result<Option<Value>> {
        self.json(keys::USER)
    }

    pub fn store_user(&self, user: &Value) -> Result<()> {
        self.store.set(keys::USER, &serde_json::to_string(user)?)
    }

    /// Slugs of the books the user liked, as last seen
    pub fn liked_books(&self) -> Result<Vec<String>> {
        Ok(self
            .json(keys::LIKED_BOOKS)?
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default())
    }

    pub fn store_liked_books(&self, slugs: &[String]) -> Result<()> {
        self.store
            .set(keys::LIKED_BOOKS, &serde_json::to_string(slugs)?)
    }

    /// Forget tokens and every piece of cached user data
    pub fn clear_all(&self) -> Result<()> {
        self.clear_tokens()?;
        self.store.remove(keys::USER)?;
        self.store.remove(keys::LIKED_BOOKS)?;
        Ok(())
    }

    fn timestamp(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(at) => Ok(Some(at.with_timezone(&Utc))),
            Err(e) => {
                tracing::warn!(key, error = %e, "Ignoring malformed timestamp in client state");
                Ok(None)
            }
        }
    }

    fn json(&self, key: &str) -> Result<Option<Value>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, error = %e, "Ignoring malformed JSON in client state");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::Duration;
    use serde_json::json;

    fn pair(access: &str, refresh: Option<&str>) -> TokenPair {
        TokenPair {
            access: access.to_string(),
            refresh: refresh.map(str::to_string),
            expires_at: None,
        }
    }

    #[test]
    fn test_store_login() {
        let storage = TokenStorage::in_memory();
        assert!(!storage.has_credentials().unwrap());

        let expires = Utc::now() + Duration::minutes(15);
        storage
            .store_login(&TokenPair {
                expires_at: Some(expires),
                ..pair("a1", Some("r1"))
            })
            .unwrap();

        assert_eq!(storage.access_token().unwrap().as_deref(), Some("a1"));
        assert_eq!(storage.refresh_token().unwrap().as_deref(), Some("r1"));
        assert_eq!(
            storage.expires_at().unwrap().map(|t| t.timestamp()),
            Some(expires.timestamp())
        );
        assert!(storage.login_at().unwrap().is_some());
        assert!(storage.has_credentials().unwrap());
    }

    #[test]
    fn test_refresh_keeps_unrotated_refresh_token() {
        let storage = TokenStorage::in_memory();
        storage
            .store_login(&TokenPair {
                expires_at: Some(Utc::now()),
                ..pair("a1", Some("r1"))
            })
            .unwrap();

        storage.store_refresh(&pair("a2", None)).unwrap();
        assert_eq!(storage.access_token().unwrap().as_deref(), Some("a2"));
        assert_eq!(storage.refresh_token().unwrap().as_deref(), Some("r1"));
        assert_eq!(storage.expires_at().unwrap(), None);

        storage.store_refresh(&pair("a3", Some("r2"))).unwrap();
        assert_eq!(storage.refresh_token().unwrap().as_deref(), Some("r2"));
    }

    #[test]
    fn test_clear_tokens_keeps_user_data() {
        let storage = TokenStorage::in_memory();
        storage.store_login(&pair("a", Some("r"))).unwrap();
        storage.store_user(&json!({"id": 7})).unwrap();

        storage.clear_tokens().unwrap();
        assert!(!storage.has_credentials().unwrap());
        assert!(storage.login_at().unwrap().is_none());
        assert_eq!(storage.cached_user().unwrap(), Some(json!({"id": 7})));

        storage.clear_all().unwrap();
        assert_eq!(storage.cached_user().unwrap(), None);
    }

    #[test]
    fn test_liked_books() {
        let storage = TokenStorage::in_memory();
        assert!(storage.liked_books().unwrap().is_empty());

        storage
            .store_liked_books(&["dune".to_string(), "emma".to_string()])
            .unwrap();
        assert_eq!(storage.liked_books().unwrap(), vec!["dune", "emma"]);
    }

    #[test]
    fn test_malformed_values_are_ignored() {
        let store = Arc::new(MemoryStore::new());
        store.set(keys::TOKEN_EXPIRES_AT, "yesterday").unwrap();
        store.set(keys::USER, "{not json").unwrap();

        let storage = TokenStorage::new(store);
        assert_eq!(storage.expires_at().unwrap(), None);
        assert_eq!(storage.cached_user().unwrap(), None);
    }
}
