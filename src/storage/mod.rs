//! Persisted client state
//!
//! A small best-effort key-value store standing in for the browser's local
//! storage: tokens, their expiry, the login time, the cached user profile
//! and liked books. Nothing here is authoritative; the backend always is.

mod memory;
mod sqlite;
mod tokens;

pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, SqliteStoreConfig};
pub use tokens::{keys, TokenPair, TokenStorage};

use crate::Result;

/// String key-value storage for client state
pub trait StateStore: Send + Sync {
    /// Read a value, `None` if the key is absent
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite a value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a key; deleting a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;

    /// Delete every key
    fn clear(&self) -> Result<()>;
}
