//! Process-local cache backend.

use std::collections::BTreeSet;
use std::sync::RwLock;

use async_trait::async_trait;
use metrics::counter;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info};

use super::lock::{read_entries, write_entries};
use super::{
    Cache, CacheOptions, METRIC_CACHE_HIT, METRIC_CACHE_INVALIDATED, METRIC_CACHE_MISS,
    METRIC_CACHE_STORE, RequestIdentity,
};

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub data: Value,
    pub expire_at: Option<OffsetDateTime>,
    pub expire_on_events: BTreeSet<String>,
}

impl CacheEntry {
    fn new(key: String, data: Value, options: &CacheOptions) -> Self {
        Self {
            key,
            data,
            expire_at: options.expire_at,
            expire_on_events: options.expire_on_events.iter().cloned().collect(),
        }
    }

    /// An entry without an expiry is never fresh.
    pub fn is_fresh_at(&self, now: OffsetDateTime) -> bool {
        self.expire_at.is_some_and(|at| at > now)
    }

    fn expires_on_any(&self, events: &[&str]) -> bool {
        events
            .iter()
            .any(|event| self.expire_on_events.contains(*event))
    }
}

/// Append-only list of entries, scanned in insertion order.
///
/// Writing the same identity twice keeps both entries and reads resolve to
/// the earliest one. Expired entries stay in place until an expire event
/// removes them or the cache is dropped.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<Vec<CacheEntry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `identity` as of `now`.
    pub fn lookup_at(&self, identity: &RequestIdentity, now: OffsetDateTime) -> Option<Value> {
        let key = identity.cache_key();
        let entries = read_entries(&self.entries, "lookup");
        let hit = entries
            .iter()
            .find(|entry| entry.key == key)
            .filter(|entry| entry.is_fresh_at(now))
            .map(|entry| entry.data.clone());

        if hit.is_some() {
            counter!(METRIC_CACHE_HIT).increment(1);
            debug!(cache_key = %key, "Cache hit");
        } else {
            counter!(METRIC_CACHE_MISS).increment(1);
            debug!(cache_key = %key, "Cache miss");
        }
        hit
    }

    pub fn insert(&self, identity: &RequestIdentity, data: Value, options: &CacheOptions) {
        let entry = CacheEntry::new(identity.cache_key(), data, options);
        debug!(
            cache_key = %entry.key,
            expire_at = ?entry.expire_at,
            expire_on_events = ?entry.expire_on_events,
            "Cache entry stored"
        );
        write_entries(&self.entries, "insert").push(entry);
        counter!(METRIC_CACHE_STORE).increment(1);
    }

    /// Remove entries tied to any of `events`; returns how many were dropped.
    pub fn invalidate(&self, events: &[&str]) -> usize {
        let mut entries = write_entries(&self.entries, "invalidate");
        let before = entries.len();
        entries.retain(|entry| !entry.expires_on_any(events));
        let removed = before - entries.len();

        if removed > 0 {
            counter!(METRIC_CACHE_INVALIDATED).increment(removed as u64);
        }
        info!(events = ?events, removed, "Cache expire events raised");
        removed
    }

    pub fn entries(&self) -> Vec<CacheEntry> {
        read_entries(&self.entries, "entries").clone()
    }

    pub fn len(&self) -> usize {
        read_entries(&self.entries, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        write_entries(&self.entries, "clear").clear();
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn read(&self, identity: &RequestIdentity) -> Option<Value> {
        self.lookup_at(identity, OffsetDateTime::now_utc())
    }

    async fn store(&self, identity: &RequestIdentity, data: Value, options: &CacheOptions) {
        self.insert(identity, data, options);
    }

    async fn raise_expire_events(&self, events: &[&str]) {
        self.invalidate(events);
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use serde_json::json;
    use time::{Duration, macros::datetime};

    use super::*;

    const NOW: OffsetDateTime = datetime!(2024-05-01 12:00 UTC);

    fn identity(locator: &str) -> RequestIdentity {
        RequestIdentity::new(locator, None)
    }

    fn until(at: OffsetDateTime) -> CacheOptions {
        CacheOptions::expire_at(at)
    }

    #[test]
    fn fresh_entry_is_served() {
        let cache = InMemoryCache::new();
        cache.insert(
            &identity("/a"),
            json!({"v": 1}),
            &until(NOW + Duration::minutes(1)),
        );

        assert_eq!(cache.lookup_at(&identity("/a"), NOW), Some(json!({"v": 1})));
        assert_eq!(cache.lookup_at(&identity("/b"), NOW), None);
    }

    #[test]
    fn expiry_is_strictly_greater_than_now() {
        let cache = InMemoryCache::new();
        cache.insert(&identity("/a"), json!(1), &until(NOW));

        assert_eq!(cache.lookup_at(&identity("/a"), NOW), None);
        assert_eq!(
            cache.lookup_at(&identity("/a"), NOW - Duration::seconds(1)),
            Some(json!(1))
        );
        assert_eq!(cache.len(), 1, "expired entries are not pruned on read");
    }

    #[test]
    fn entry_without_expiry_is_never_served() {
        let cache = InMemoryCache::new();
        cache.insert(&identity("/a"), json!(1), &CacheOptions::default());

        assert_eq!(cache.lookup_at(&identity("/a"), NOW), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn repeated_writes_accumulate_and_earliest_wins() {
        let cache = InMemoryCache::new();
        let later = until(NOW + Duration::hours(1));
        cache.insert(&identity("/a"), json!("first"), &later);
        cache.insert(&identity("/a"), json!("second"), &later);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.lookup_at(&identity("/a"), NOW), Some(json!("first")));
    }

    #[test]
    fn stale_first_match_shadows_fresh_duplicate() {
        let cache = InMemoryCache::new();
        cache.insert(
            &identity("/a"),
            json!("old"),
            &until(NOW - Duration::hours(1)),
        );
        cache.insert(
            &identity("/a"),
            json!("new"),
            &until(NOW + Duration::hours(1)),
        );

        assert_eq!(cache.lookup_at(&identity("/a"), NOW), None);
    }

    #[test]
    fn expire_events_remove_only_matching_entries() {
        let cache = InMemoryCache::new();
        let ttl = NOW + Duration::hours(1);
        cache.insert(&identity("/x"), json!("x"), &until(ttl).on_events(["x"]));
        cache.insert(&identity("/y"), json!("y"), &until(ttl).on_events(["y"]));
        cache.insert(&identity("/none"), json!("n"), &until(ttl));

        assert_eq!(cache.invalidate(&["x"]), 1);

        assert_eq!(cache.lookup_at(&identity("/x"), NOW), None);
        assert_eq!(cache.lookup_at(&identity("/y"), NOW), Some(json!("y")));
        assert_eq!(cache.lookup_at(&identity("/none"), NOW), Some(json!("n")));
    }

    #[test]
    fn expire_events_are_idempotent() {
        let cache = InMemoryCache::new();
        let options = until(NOW + Duration::hours(1)).on_events(["a", "b"]);
        cache.insert(&identity("/ab"), json!(1), &options);

        assert_eq!(cache.invalidate(&["unknown"]), 0);
        assert_eq!(cache.invalidate(&["b", "c"]), 1);
        assert_eq!(cache.invalidate(&["b"]), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn body_is_part_of_identity() {
        let cache = InMemoryCache::new();
        let with_body = RequestIdentity::new("/q", Some(json!({"page": 1})));
        cache.insert(
            &with_body,
            json!("page one"),
            &until(NOW + Duration::hours(1)),
        );

        assert_eq!(cache.lookup_at(&with_body, NOW), Some(json!("page one")));
        assert_eq!(cache.lookup_at(&identity("/q"), NOW), None);
    }

    #[test]
    fn clear_drops_every_entry() {
        let cache = InMemoryCache::new();
        let ttl = until(NOW + Duration::hours(1));
        cache.insert(&identity("/a"), json!(1), &ttl);
        cache.insert(&identity("/b"), json!(2), &ttl.clone().on_events(["b"]));

        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.lookup_at(&identity("/a"), NOW), None);
        assert_eq!(cache.invalidate(&["b"]), 0);
    }

    #[tokio::test]
    async fn trait_roundtrip_uses_wall_clock() {
        let cache = InMemoryCache::new();
        let options =
            CacheOptions::expire_after(Duration::minutes(5)).on_events(["users"]);

        cache.store(&identity("/users"), json!([1, 2]), &options).await;
        assert_eq!(cache.read(&identity("/users")).await, Some(json!([1, 2])));

        cache.raise_expire_events(&["users"]).await;
        assert_eq!(cache.read(&identity("/users")).await, None);
    }

    #[test]
    fn recovers_from_poisoned_lock() {
        let cache = InMemoryCache::new();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = cache
                .entries
                .write()
                .expect("entries lock should be acquired");
            panic!("poison entries lock");
        }));

        cache.insert(&identity("/a"), json!(1), &until(NOW + Duration::hours(1)));
        assert_eq!(cache.len(), 1);
    }
}
