//! Stale-while-revalidate response cache
//!
//! Wraps [`Transport::post`] with a read-through, write-back cache keyed by
//! endpoint, payload and device session.
//!
//! # Request flow
//!
//! 1. The cached body (fresh or stale) is handed to the update callback
//!    before the network call starts. With nothing cached, an
//!    endpoint-appropriate empty body is handed over instead.
//! 2. The network call always runs.
//! 3. A non-empty response is persisted and handed to the callback when the
//!    endpoint is realtime-critical, nothing was cached, or it differs
//!    structurally from the cached body.
//! 4. On failure the cached body (if any) is handed to the callback and the
//!    original error is returned.
//!
//! Storage is best-effort: every storage failure is logged and treated as a
//! miss, it never blocks the network call.
//!
//! # Storage format
//!
//! | Key | Value |
//! |-----|-------|
//! | `cache_<endpoint>_<payload json>_<session id>` | `{"data": <body>, "timestamp": <unix ms>}` |

use crate::http::{RequestOptions, Transport};
use crate::session::SessionManager;
use crate::storage::KvStore;
use crate::{CacheConfig, ClientResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::util::now_millis;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Prefix shared by every cache key
pub const CACHE_KEY_PREFIX: &str = "cache_";

/// Session id used in keys when no device token is stored
pub const NO_SESSION: &str = "no_session";

/// One cached response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Last successful response body
    pub data: Value,
    /// Unix milliseconds at which the entry was written
    pub timestamp: i64,
}

impl CacheEntry {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            timestamp: now_millis(),
        }
    }

    /// Whether the entry is within `ttl` of `now` (unix ms)
    pub fn is_fresh(&self, now: i64, ttl: Duration) -> bool {
        now - self.timestamp <= ttl.as_millis() as i64
    }
}

/// Build the storage key for a request
pub fn cache_key(endpoint: &str, payload: &Value, session_id: &str) -> String {
    format!("{CACHE_KEY_PREFIX}{endpoint}_{payload}_{session_id}")
}

/// Whether `key` was built by [`cache_key`] for `session_id`
///
/// The session id must directly follow the payload JSON, so a session `b`
/// does not claim the keys of a session `a_b`.
pub fn key_in_session(key: &str, session_id: &str) -> bool {
    let Some(rest) = key
        .strip_prefix(CACHE_KEY_PREFIX)
        .and_then(|k| k.strip_suffix(session_id))
        .and_then(|k| k.strip_suffix('_'))
    else {
        return false;
    };
    // rest is `<endpoint>_<payload>`; both may contain '_'
    rest.match_indices('_')
        .any(|(i, _)| serde_json::from_str::<Value>(&rest[i + 1..]).is_ok())
}

/// Response bodies that carry nothing usable
fn is_empty_body(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

/// Delete every cache entry whose key matches `pred`
///
/// Returns the number of keys removed; storage failures are logged and
/// count as zero.
pub(crate) async fn purge_cache_entries(
    store: &dyn KvStore,
    pred: impl Fn(&str) -> bool,
) -> usize {
    let keys = match store.all_keys().await {
        Ok(keys) => keys,
        Err(e) => {
            warn!(error = %e, "Listing cache keys failed");
            return 0;
        }
    };

    let doomed: Vec<String> = keys
        .into_iter()
        .filter(|k| k.starts_with(CACHE_KEY_PREFIX) && pred(k))
        .collect();

    if doomed.is_empty() {
        return 0;
    }

    match store.multi_remove(&doomed).await {
        Ok(()) => doomed.len(),
        Err(e) => {
            warn!(error = %e, count = doomed.len(), "Removing cache entries failed");
            0
        }
    }
}

/// HTTP client with a local response cache in front of it
#[derive(Clone)]
pub struct CachedClient {
    transport: Arc<dyn Transport>,
    store: Arc<dyn KvStore>,
    session: SessionManager,
    config: CacheConfig,
}

impl CachedClient {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn KvStore>) -> Self {
        Self::with_config(transport, store, CacheConfig::default())
    }

    pub fn with_config(
        transport: Arc<dyn Transport>,
        store: Arc<dyn KvStore>,
        config: CacheConfig,
    ) -> Self {
        let session = SessionManager::new(store.clone());
        Self {
            transport,
            store,
            session,
            config,
        }
    }

    /// Session store sharing this client's storage
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    async fn current_session_id(&self) -> String {
        self.session
            .device_session_id()
            .await
            .unwrap_or_else(|| NO_SESSION.to_string())
    }

    async fn read_entry(&self, key: &str) -> Option<CacheEntry> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, cache_key = key, "Cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, cache_key = key, "Discarding unreadable cache entry");
                None
            }
        }
    }

    async fn write_entry(&self, key: &str, body: &Value) {
        let raw = match serde_json::to_string(&CacheEntry::new(body.clone())) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, cache_key = key, "Cache entry serialization failed");
                return;
            }
        };

        if let Err(e) = self.store.set(key, &raw).await {
            warn!(error = %e, cache_key = key, "Cache write failed");
        }
    }

    /// POST `payload` to `endpoint`, smoothing the wait with cached data
    ///
    /// `on_update` receives the placeholder (cached or empty body) before the
    /// network call starts, and the fresh body before this future resolves
    /// whenever it is worth re-rendering. Errors are always returned to the
    /// caller, even when cached data could be shown.
    #[instrument(skip(self, payload, options, on_update), fields(endpoint = %endpoint))]
    pub async fn request<F>(
        &self,
        endpoint: &str,
        payload: &Value,
        options: &RequestOptions,
        mut on_update: F,
    ) -> ClientResult<Value>
    where
        F: FnMut(&Value) + Send,
    {
        let session_id = self.current_session_id().await;
        let key = cache_key(endpoint, payload, &session_id);
        let realtime = self.config.is_realtime(endpoint);
        let ttl = self.config.ttl_for(endpoint);

        let cached = self.read_entry(&key).await;
        match &cached {
            Some(entry) => {
                if entry.is_fresh(now_millis(), ttl) {
                    debug!(realtime, "Cache hit");
                } else {
                    debug!(realtime, age_ms = now_millis() - entry.timestamp, "Stale cache entry used as placeholder");
                }
                on_update(&entry.data);
            }
            None => {
                debug!("Cache miss, showing empty placeholder");
                on_update(&self.config.placeholder_for(endpoint));
            }
        }

        match self.transport.post(endpoint, payload, options).await {
            Ok(body) => {
                if is_empty_body(&body) {
                    if cached.is_none() {
                        on_update(&body);
                    }
                    return Ok(body);
                }

                self.write_entry(&key, &body).await;

                match &cached {
                    Some(entry) if !realtime => {
                        if entry.data != body {
                            on_update(&body);
                        } else {
                            debug!("Fresh body unchanged, skipping update");
                        }
                    }
                    _ => on_update(&body),
                }
                Ok(body)
            }
            Err(err) => {
                warn!(error = %err, transient = err.is_transient(), "Request failed, falling back to cache");
                if let Some(entry) = self.read_entry(&key).await {
                    on_update(&entry.data);
                }
                Err(err)
            }
        }
    }

    /// Delete the entry for one request in the current session
    pub async fn clear_cache(&self, endpoint: &str, payload: &Value) {
        let key = cache_key(endpoint, payload, &self.current_session_id().await);
        if let Err(e) = self.store.remove(&key).await {
            warn!(error = %e, cache_key = %key, "Cache clear failed");
        }
    }

    /// Delete every entry of the current session
    pub async fn clear_all_cache(&self) -> usize {
        let session_id = self.current_session_id().await;
        let removed =
            purge_cache_entries(self.store.as_ref(), |k| key_in_session(k, &session_id)).await;
        info!(removed, "Cleared session cache");
        removed
    }

    /// Delete every entry regardless of session
    pub async fn clear_all_cache_on_new_session(&self) -> usize {
        let removed = purge_cache_entries(self.store.as_ref(), |_| true).await;
        info!(removed, "Cleared cache for new device session");
        removed
    }
}
