//! Response cache contract and the in-memory backend.
//!
//! Caching is opt-in per request: the client consults a [`Cache`] only when
//! the caller passes [`CacheOptions`]. Backends are injected at client
//! construction and must be safe to share across tasks.
//!
//! ```
//! use jsonfetch::cache::{Cache, CacheOptions, InMemoryCache, RequestIdentity};
//! use serde_json::json;
//! use time::Duration;
//!
//! # tokio_test_block(async {
//! let cache = InMemoryCache::new();
//! let identity = RequestIdentity::new("/users/1", None);
//! let options = CacheOptions::expire_after(Duration::minutes(5)).on_events(["users"]);
//!
//! cache.store(&identity, json!({"id": 1}), &options).await;
//! assert_eq!(cache.read(&identity).await, Some(json!({"id": 1})));
//!
//! cache.raise_expire_events(&["users"]).await;
//! assert_eq!(cache.read(&identity).await, None);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
//! # }
//! ```

mod keys;
mod lock;
mod memory;

use async_trait::async_trait;
use serde_json::Value;
use time::{Duration, OffsetDateTime};

pub use keys::derive_key;
pub use memory::{CacheEntry, InMemoryCache};

pub const METRIC_CACHE_HIT: &str = "jsonfetch_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "jsonfetch_cache_miss_total";
pub const METRIC_CACHE_STORE: &str = "jsonfetch_cache_store_total";
pub const METRIC_CACHE_INVALIDATED: &str = "jsonfetch_cache_invalidated_total";

/// The part of a request that decides which cached item it maps to.
///
/// Headers and method are not included: two requests with the same locator
/// and body share one cache identity. [`crate::FetchClient`] uses the fully
/// resolved URL, query string included, as the locator.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestIdentity {
    pub locator: String,
    pub body: Option<Value>,
}

impl RequestIdentity {
    pub fn new(locator: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            locator: locator.into(),
            body,
        }
    }

    pub fn cache_key(&self) -> String {
        derive_key(self)
    }
}

/// Per-request caching policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// Absolute expiry. Entries stored without one are never served.
    pub expire_at: Option<OffsetDateTime>,
    /// Event names whose raising drops the entry.
    pub expire_on_events: Vec<String>,
}

impl CacheOptions {
    pub fn expire_at(at: OffsetDateTime) -> Self {
        Self {
            expire_at: Some(at),
            ..Self::default()
        }
    }

    pub fn expire_after(ttl: Duration) -> Self {
        Self::expire_at(OffsetDateTime::now_utc() + ttl)
    }

    pub fn on_events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expire_on_events
            .extend(events.into_iter().map(Into::into));
        self
    }
}

/// Capability every cache backend provides.
///
/// None of the operations fail from the caller's point of view; a backend
/// that cannot serve a read reports a miss, and a backend that cannot keep a
/// write drops it.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Look up `identity`. Missing and expired entries both yield `None`.
    async fn read(&self, identity: &RequestIdentity) -> Option<Value>;

    /// Remember `data` for `identity` under `options`.
    async fn store(&self, identity: &RequestIdentity, data: Value, options: &CacheOptions);

    /// Drop every entry registered against any of `events`.
    async fn raise_expire_events(&self, events: &[&str]);
}
