//! Response caching and request de-duplication
//!
//! Both structures are keyed by [`cache_key`]: the endpoint path plus its
//! query parameters in canonical order.
//!
//! - [`ResponseCache`]: last successful GET payload per key, served while
//!   younger than the TTL
//! - [`PendingRequests`]: the in-flight request per key, so concurrent
//!   identical GETs share one network call
//!
//! Clearing the cache starts a new generation. A request started under an
//! older generation still answers its own callers but is never stored, so
//! a payload fetched before a locale or session change cannot outlive it.

use crate::error::ApiError;
use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Build the cache key for a path and its query parameters.
///
/// Parameters are sorted and percent-encoded so call-site ordering never
/// produces two keys for the same request.
pub fn cache_key(path: &str, query: &[(String, String)]) -> String {
    if query.is_empty() {
        return path.to_string();
    }

    let mut pairs: Vec<&(String, String)> = query.iter().collect();
    pairs.sort();

    let encoded: Vec<String> = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();

    format!("{}?{}", path, encoded.join("&"))
}

struct CacheEntry {
    value: Value,
    captured_at: Instant,
}

/// In-memory GET response cache with a fixed TTL
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
    generation: AtomicU64,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Current generation; bumped by every [`ResponseCache::clear`]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh payload for `key`; stale entries are evicted on the way
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.captured_at.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                tracing::trace!(key, "Evicted stale cache entry");
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: &str, value: Value) {
        self.lock().insert(
            key.to_string(),
            CacheEntry {
                value,
                captured_at: Instant::now(),
            },
        );
    }

    /// Store `value` only if no clear happened since `generation` was read
    pub fn insert_if_current(&self, key: &str, value: Value, generation: u64) -> bool {
        let mut entries = self.lock();
        if self.generation() != generation {
            return false;
        }
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                captured_at: Instant::now(),
            },
        );
        true
    }

    /// Drop every entry whose key starts with `prefix`
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    /// Drop every expired entry
    pub fn purge_expired(&self) -> usize {
        let ttl = self.ttl;
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.captured_at.elapsed() < ttl);
        before - entries.len()
    }

    pub fn clear(&self) {
        let mut entries = self.lock();
        self.generation.fetch_add(1, Ordering::SeqCst);
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A request result that any number of callers can await
pub type SharedResponse = Shared<BoxFuture<'static, Result<Value, ApiError>>>;

struct Inflight {
    ticket: u64,
    response: WeakShared<BoxFuture<'static, Result<Value, ApiError>>>,
}

/// Ledger of in-flight GET requests.
///
/// Entries are weak: the request lives only as long as some caller awaits
/// it. Each entry carries a ticket so a settling request removes its own
/// entry and never a newer one registered under the same key.
#[derive(Default)]
pub struct PendingRequests {
    inflight: Mutex<HashMap<String, Inflight>>,
    next_ticket: AtomicU64,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the in-flight request for `key`, or register the one built
    /// by `start`. The flag is true when an existing request was joined.
    ///
    /// `start` receives the entry's ticket; the future must hand it back to
    /// [`PendingRequests::remove`] when it settles or is dropped.
    pub fn join_or_insert<F>(&self, key: &str, start: F) -> (SharedResponse, bool)
    where
        F: FnOnce(u64) -> BoxFuture<'static, Result<Value, ApiError>>,
    {
        let mut inflight = self.lock();
        if let Some(existing) = inflight.get(key).and_then(|entry| entry.response.upgrade()) {
            return (existing, true);
        }

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let shared = start(ticket).shared();
        match shared.downgrade() {
            Some(response) => {
                inflight.insert(key.to_string(), Inflight { ticket, response });
            }
            None => {
                inflight.remove(key);
            }
        }
        (shared, false)
    }

    /// Remove the entry for `key` if it still belongs to `ticket`
    pub fn remove(&self, key: &str, ticket: u64) -> bool {
        let mut inflight = self.lock();
        match inflight.get(key) {
            Some(entry) if entry.ticket == ticket => {
                inflight.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Forget every entry; running requests finish for their current
    /// callers but can no longer be joined
    pub fn clear(&self) -> usize {
        let mut inflight = self.lock();
        let dropped = inflight.len();
        inflight.clear();
        dropped
    }

    pub fn contains(&self, key: &str) -> bool {
        // Upgraded handles must outlive the guard: dropping the last one
        // runs the request's drop path, which takes this lock
        let mut live = Vec::new();
        let inflight = self.lock();
        live.extend(inflight.get(key).and_then(|entry| entry.response.upgrade()));
        drop(inflight);
        !live.is_empty()
    }

    pub fn len(&self) -> usize {
        let mut live = Vec::new();
        let inflight = self.lock();
        live.extend(inflight.values().filter_map(|entry| entry.response.upgrade()));
        drop(inflight);
        live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Inflight>> {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_cache_key_is_order_independent() {
        let a = cache_key("/books/", &params(&[("page", "2"), ("category", "sci-fi")]));
        let b = cache_key("/books/", &params(&[("category", "sci-fi"), ("page", "2")]));
        assert_eq!(a, b);
        assert_eq!(a, "/books/?category=sci-fi&page=2");
    }

    #[test]
    fn test_cache_key_encodes_values() {
        assert_eq!(cache_key("/categories/", &[]), "/categories/");
        assert_eq!(
            cache_key("/books/", &params(&[("search", "war & peace")])),
            "/books/?search=war%20%26%20peace"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.insert("/categories/", json!([{"id": 1}]));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get("/categories/"), Some(json!([{"id": 1}])));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("/categories/"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.insert("/old/", json!(1));
        tokio::time::advance(Duration::from_secs(61)).await;
        cache.insert("/new/", json!(2));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_prefix() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.insert("/cart/", json!({}));
        cache.insert("/cart/?page=2", json!({}));
        cache.insert("/books/", json!([]));

        assert_eq!(cache.invalidate_prefix("/cart/"), 2);
        assert!(cache.get("/books/").is_some());

        cache.clear();
        assert!(cache.is_empty());
    }

    async fn never_started() -> Result<Value, ApiError> {
        panic!("second request must not start")
    }

    #[test]
    fn test_clear_starts_new_generation() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let before = cache.generation();
        assert!(cache.insert_if_current("/categories/", json!(["en"]), before));

        cache.clear();
        assert!(!cache.insert_if_current("/categories/", json!(["en"]), before));
        assert!(cache.is_empty());
        assert!(cache.insert_if_current("/categories/", json!(["ru"]), cache.generation()));
        assert_eq!(cache.get("/categories/"), Some(json!(["ru"])));
    }

    #[tokio::test]
    async fn test_pending_requests_join_existing() {
        let pending = Arc::new(PendingRequests::new());
        let (gate_tx, gate_rx) = tokio::sync::oneshot::channel::<()>();

        let ledger = Arc::clone(&pending);
        let (first, joined) = pending.join_or_insert("/categories/", move |ticket| {
            async move {
                let _ = gate_rx.await;
                ledger.remove("/categories/", ticket);
                Ok(json!(["fiction"]))
            }
            .boxed()
        });
        assert!(!joined);

        let (second, joined) = pending.join_or_insert("/categories/", |_| never_started().boxed());
        assert!(joined);
        assert!(pending.contains("/categories/"));

        gate_tx.send(()).unwrap();
        let (a, b) = futures::join!(first, second);
        assert_eq!(a.unwrap(), json!(["fiction"]));
        assert_eq!(b.unwrap(), json!(["fiction"]));
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_cleared_entries_are_not_joined() {
        let pending = PendingRequests::new();
        let (old, _) = pending.join_or_insert("/cart/", |_| async { Ok(json!("old")) }.boxed());
        assert_eq!(pending.clear(), 1);

        let (new, joined) = pending.join_or_insert("/cart/", |_| async { Ok(json!("new")) }.boxed());
        assert!(!joined);
        assert_eq!(old.await.unwrap(), json!("old"));
        assert_eq!(new.await.unwrap(), json!("new"));
    }

    #[test]
    fn test_stale_ticket_does_not_remove_newer_entry() {
        let pending = PendingRequests::new();
        let (_first, _) = pending.join_or_insert("/orders/", |_| never_started().boxed());
        pending.clear();
        let (_second, _) = pending.join_or_insert("/orders/", |_| never_started().boxed());

        assert!(!pending.remove("/orders/", 0));
        assert!(pending.contains("/orders/"));
        assert!(pending.remove("/orders/", 1));
        assert!(!pending.contains("/orders/"));
    }

    #[test]
    fn test_abandoned_requests_are_released() {
        let pending = PendingRequests::new();
        let (response, _) = pending.join_or_insert("/posts/", |_| never_started().boxed());
        assert!(pending.contains("/posts/"));

        // No caller left: the request is dropped and the slot can be reused
        drop(response);
        assert!(!pending.contains("/posts/"));
        let (_again, joined) = pending.join_or_insert("/posts/", |_| never_started().boxed());
        assert!(!joined);
    }
}
