//! Authenticated API client
//!
//! Every call to the backend goes through [`ApiClient::send`], which applies
//! one policy to all of them:
//!
//! 1. GETs are answered from the response cache while fresh, and identical
//!    in-flight GETs are joined instead of re-sent.
//! 2. Unless the request opts out, the access token is checked first and
//!    refreshed when it is expired or about to be.
//! 3. The bearer token and `Accept-Language` are attached; JSON bodies get a
//!    JSON content type, multipart bodies are left to the transport.
//! 4. A 401 triggers one refresh and one replay. Anything else is returned
//!    as a normalized [`ApiError`] with no retry.
//!
//! All state (cache, pending ledger, refresh coordinator, locale) belongs to
//! the client instance. Clones share it.

mod request;
mod transport;

pub use request::{ApiRequest, AuthMode, Body, FormPart};
pub use transport::{user_agent, OutboundRequest, RawResponse, ReqwestTransport, Transport};

use crate::auth::{jwt, RefreshCoordinator, SessionEvent, TokenResponse, REFRESH_PATH};
use crate::cache::{PendingRequests, ResponseCache};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::locale::{Locale, LocaleSet};
use crate::storage::{SqliteStore, SqliteStoreConfig, TokenStorage};
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 16;

/// Client for the storefront REST backend
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    base_url: String,
    refresh_leeway: chrono::Duration,
    locales: LocaleSet,
    locale: RwLock<Locale>,
    storage: TokenStorage,
    transport: Arc<dyn Transport>,
    cache: ResponseCache,
    pending: PendingRequests,
    refresh: RefreshCoordinator,
    events: broadcast::Sender<SessionEvent>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("locale", &self.locale())
            .field("cached", &self.inner.cache.len())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Assemble a client from its parts
    pub fn new(
        config: &ClientConfig,
        storage: TokenStorage,
        transport: Arc<dyn Transport>,
    ) -> crate::Result<Self> {
        let locales = config.locales()?;
        let locale = locales.default_locale().clone();
        let leeway = chrono::Duration::from_std(config.refresh_leeway())
            .map_err(|e| crate::StorefrontError::Config(format!("refresh leeway: {}", e)))?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            inner: Arc::new(Inner {
                base_url: config.api_root().to_string(),
                refresh_leeway: leeway,
                locales,
                locale: RwLock::new(locale),
                storage,
                transport,
                cache: ResponseCache::new(config.cache_ttl()),
                pending: PendingRequests::new(),
                refresh: RefreshCoordinator::new(),
                events,
            }),
        })
    }

    /// Client with the reqwest transport and SQLite-backed state
    pub fn from_config(config: &ClientConfig) -> crate::Result<Self> {
        let store = SqliteStore::new(SqliteStoreConfig::at(config.state_path.clone()))?;
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Self::new(
            config,
            TokenStorage::new(Arc::new(store)),
            Arc::new(transport),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn storage(&self) -> &TokenStorage {
        &self.inner.storage
    }

    pub fn locales(&self) -> &LocaleSet {
        &self.inner.locales
    }

    /// The locale sent as `Accept-Language`
    pub fn locale(&self) -> Locale {
        self.inner.current_locale()
    }

    /// Switch the active locale (unsupported tags fall back to the default).
    ///
    /// Cached payloads are localized, so a change empties the cache.
    pub fn set_locale(&self, tag: &str) -> Locale {
        let next = self.inner.locales.resolve(Some(tag));
        let changed = {
            let mut current = self
                .inner
                .locale
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let changed = *current != next;
            *current = next.clone();
            changed
        };
        if changed {
            info!(locale = %next, "Locale changed, clearing response cache");
            self.inner.reset_responses();
        }
        next
    }

    /// Session notifications (refresh, expiry, login, logout)
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        self.inner.emit(event);
    }

    /// Drop cached responses and detach in-flight GETs, which still answer
    /// their current callers but are neither joined nor stored afterwards
    pub fn clear_cache(&self) {
        self.inner.reset_responses();
    }

    /// Drop cached GETs whose key starts with `path_prefix`
    pub fn invalidate(&self, path_prefix: &str) -> usize {
        let dropped = self.inner.cache.invalidate_prefix(path_prefix);
        if dropped > 0 {
            debug!(prefix = path_prefix, dropped, "Invalidated cached responses");
        }
        dropped
    }

    pub fn cached_entries(&self) -> usize {
        self.inner.cache.len()
    }

    /// Whether a refresh call is currently in flight
    pub fn is_refreshing(&self) -> bool {
        self.inner.refresh.is_refreshing()
    }

    /// Send a request through the full pipeline and return its JSON payload
    pub async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        if !request.is_get() {
            return self.inner.execute(request).await;
        }

        let key = request.cache_key();
        if let Some(cached) = self.inner.cache.get(&key) {
            debug!(key = %key, "Serving response from cache");
            return Ok(cached);
        }

        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        let (response, joined) = self.inner.pending.join_or_insert(&key, move |ticket| {
            let generation = inner.cache.generation();
            let slot = PendingSlot {
                inner,
                key: task_key,
                ticket,
            };
            async move {
                let result = slot.inner.execute(request).await;
                if let Ok(payload) = &result {
                    slot.inner.cache.purge_expired();
                    if !slot.inner.cache.insert_if_current(&slot.key, payload.clone(), generation) {
                        debug!(key = %slot.key, "Cache cleared while in flight, not storing response");
                    }
                }
                drop(slot);
                result
            }
            .boxed()
        });

        if joined {
            debug!(key = %key, "Joining in-flight request");
        }
        response.await
    }

    /// Send a request and deserialize its payload
    pub async fn send_as<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let payload = self.send(request).await?;
        decode(payload)
    }

    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn post_json(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.send(ApiRequest::post(path).json(body)).await
    }

    pub async fn put_json(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.send(ApiRequest::put(path).json(body)).await
    }

    pub async fn patch_json(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.send(ApiRequest::patch(path).json(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.send(ApiRequest::delete(path)).await
    }

    pub async fn post_multipart(&self, path: &str, parts: Vec<FormPart>) -> Result<Value, ApiError> {
        self.send(ApiRequest::post(path).multipart(parts)).await
    }

    /// Exchange the stored refresh token now, joining any refresh in flight
    pub async fn refresh_session(&self) -> Result<String, ApiError> {
        self.inner.refresh_access_token().await
    }

    /// Make sure a usable access token is stored, refreshing if needed
    pub async fn ensure_access_token(&self) -> Result<Option<String>, ApiError> {
        self.inner
            .authorize(&ApiRequest::get("/").auth(AuthMode::Optional))
            .await
    }
}

/// Ledger registration of one in-flight GET, released when the request
/// settles or its last caller goes away
struct PendingSlot {
    inner: Arc<Inner>,
    key: String,
    ticket: u64,
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        self.inner.pending.remove(&self.key, self.ticket);
    }
}

/// Deserialize a payload into the caller's type
pub fn decode<T: DeserializeOwned>(payload: Value) -> Result<T, ApiError> {
    serde_json::from_value(payload).map_err(|e| ApiError::Decode(e.to_string()))
}

impl Inner {
    fn current_locale(&self) -> Locale {
        self.locale
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn reset_responses(&self) {
        // Ledger first: a caller arriving in between starts a fresh request
        // rather than joining one that predates the clear
        self.pending.clear();
        self.cache.clear();
    }

    fn emit(&self, event: SessionEvent) {
        debug!(?event, "Session event");
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn stored_access_token(&self) -> Option<String> {
        self.storage.access_token().unwrap_or_else(|e| {
            warn!(error = %e, "Could not read access token");
            None
        })
    }

    fn stored_refresh_token(&self) -> Option<String> {
        self.storage.refresh_token().unwrap_or_else(|e| {
            warn!(error = %e, "Could not read refresh token");
            None
        })
    }

    /// Stored expiry, else the token's own `exp` claim
    fn is_expiring(&self, token: &str) -> bool {
        let stored = self.storage.expires_at().unwrap_or_else(|e| {
            warn!(error = %e, "Could not read token expiry");
            None
        });
        let expires_at = stored.or_else(|| jwt::decode_expiry(token));
        jwt::is_expiring(expires_at, self.refresh_leeway, chrono::Utc::now())
    }

    /// Run a request with auth handling and the single 401 replay
    async fn execute(self: &Arc<Self>, request: ApiRequest) -> Result<Value, ApiError> {
        let token = self.authorize(&request).await?;

        match self.dispatch(&request, token.as_deref()).await {
            Err(err) if err.is_unauthorized() && request.auth != AuthMode::Skip => {
                warn!(
                    method = %request.method,
                    path = %request.path,
                    "Request unauthorized, refreshing token and retrying once"
                );
                let token = self.recover_unauthorized(token.as_deref(), err).await?;
                self.dispatch(&request, Some(&token)).await
            }
            result => result,
        }
    }

    /// Token to attach to `request`, refreshing first when needed
    async fn authorize(self: &Arc<Self>, request: &ApiRequest) -> Result<Option<String>, ApiError> {
        if request.auth == AuthMode::Skip {
            return Ok(None);
        }

        match self.stored_access_token() {
            Some(token) if !self.is_expiring(&token) => Ok(Some(token)),
            Some(_) => {
                debug!("Access token expired or expiring, refreshing before request");
                self.refresh_access_token().await.map(Some)
            }
            None if self.stored_refresh_token().is_some() => {
                self.refresh_access_token().await.map(Some)
            }
            None if request.auth == AuthMode::Required => Err(ApiError::Unauthenticated),
            None => Ok(None),
        }
    }

    /// New token after a 401 on a request sent with `sent_token`
    async fn recover_unauthorized(
        self: &Arc<Self>,
        sent_token: Option<&str>,
        original: ApiError,
    ) -> Result<String, ApiError> {
        // Another caller may have refreshed while this request was in flight
        if let Some(current) = self.stored_access_token() {
            if Some(current.as_str()) != sent_token && !self.is_expiring(&current) {
                debug!("Token changed since request was sent, replaying with it");
                return Ok(current);
            }
        }

        self.refresh_access_token()
            .await
            .map_err(|err| ApiError::RefreshFailed {
                reason: match err {
                    ApiError::RefreshFailed { reason, .. } => reason,
                    other => other.to_string(),
                },
                original: Some(Box::new(original)),
            })
    }

    async fn refresh_access_token(self: &Arc<Self>) -> Result<String, ApiError> {
        let inner = Arc::clone(self);
        self.refresh
            .run(move || async move { inner.perform_refresh().await })
            .await
    }

    /// The refresh call itself; only ever run by the coordinator
    async fn perform_refresh(&self) -> Result<String, ApiError> {
        let Some(refresh_token) = self.stored_refresh_token() else {
            warn!("Access token unusable and no refresh token stored");
            self.end_session();
            return Err(ApiError::MissingRefreshToken);
        };

        info!("Refreshing access token");
        let request = ApiRequest::post(REFRESH_PATH)
            .json(json!({ "refresh": refresh_token }))
            .auth(AuthMode::Skip);

        let refreshed = self
            .dispatch(&request, None)
            .await
            .and_then(TokenResponse::from_value);

        match refreshed {
            Ok(response) => {
                let pair = response.into_pair();
                if let Err(e) = self.storage.store_refresh(&pair) {
                    warn!(error = %e, "Could not persist refreshed tokens");
                }
                self.emit(SessionEvent::Refreshed);
                Ok(pair.access)
            }
            Err(err) => {
                warn!(error = %err, "Token refresh failed, ending session");
                self.end_session();
                Err(ApiError::RefreshFailed {
                    reason: err.to_string(),
                    original: None,
                })
            }
        }
    }

    /// Forget credentials and user-scoped responses, then ask for a login
    fn end_session(&self) {
        if let Err(e) = self.storage.clear_tokens() {
            warn!(error = %e, "Could not clear stored tokens");
        }
        self.reset_responses();
        let login_path = self.locales.login_path(&self.current_locale());
        self.emit(SessionEvent::Expired { login_path });
    }

    fn outbound(&self, request: &ApiRequest, token: Option<&str>) -> OutboundRequest {
        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            (
                "Accept-Language".to_string(),
                self.current_locale().as_header().to_string(),
            ),
        ];
        if let Some(token) = token {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }
        if matches!(request.body, Body::Json(_)) {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        OutboundRequest {
            method: request.method.clone(),
            url: format!("{}{}", self.base_url, request.path),
            query: request.query.clone(),
            headers,
            body: request.body.clone(),
        }
    }

    /// One network round trip, with the response normalized
    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> Result<Value, ApiError> {
        let outbound = self.outbound(request, token);
        debug!(method = %outbound.method, url = %outbound.url, "Sending request");

        let response = self.transport.send(outbound).await.map_err(|err| {
            warn!(path = %request.path, error = %err, "Request failed");
            err
        })?;

        if !response.is_success() {
            let err = ApiError::from_status(response.status, &response.body);
            debug!(path = %request.path, status = response.status, "Request returned error status");
            return Err(err);
        }

        if response.body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&response.body)
            .map_err(|e| ApiError::Decode(format!("{} {}: {}", request.method, request.path, e)))
    }
}
