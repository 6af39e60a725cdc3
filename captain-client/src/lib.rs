//! Captain Client - backend access for the captain app
//!
//! Provides HTTP calls to the restaurant backend, a best-effort local
//! key-value store, the login/device session store, and a
//! stale-while-revalidate response cache layered over the HTTP client.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod storage;

pub use cache::{CacheEntry, CachedClient, cache_key};
pub use config::{CacheConfig, ClientConfig};
pub use error::{ClientError, ClientResult};
pub use http::{HttpClient, RequestOptions, Transport};
pub use session::{AppSettings, LoginSession, OutletSelection, SessionChange, SessionManager};
pub use storage::{KvStore, MemoryStore, RedbStore, StoreError, StoreResult};

// Re-export shared types for convenience
pub use shared::ApiEnvelope;
