//! Read-through listing cache.
//!
//! Resolved folder listings are kept in session storage for a fixed TTL.
//! Concurrent misses for the same folder are not merged: both go to the
//! remote store and the later write wins.

use crate::db::{KeyValueStore, StoreError};
use crate::file_filter::is_supported_media;
use crate::storage::{GatewayError, ObjectStore};
use crate::types::MediaItem;
use futures::{future, stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// How long a resolved listing stays valid (3000 seconds)
pub const CACHE_TTL: Duration = Duration::from_secs(3000);

/// Lifetime of the signed URLs stored in a listing
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(3600);

/// Signing requests in flight per listing
const SIGNING_CONCURRENCY: usize = 8;

/// Source of "now" in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Persisted listing with the time it was resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: Vec<MediaItem>,
    /// Epoch milliseconds
    pub timestamp: i64,
}

impl CacheEntry {
    fn is_expired(&self, now: i64, ttl: Duration) -> bool {
        let ttl = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        now.saturating_sub(self.timestamp) > ttl
    }
}

pub struct ListingCache {
    gateway: Arc<dyn ObjectStore>,
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    bucket: String,
    ttl: Duration,
    url_ttl: Duration,
}

impl ListingCache {
    pub fn new(
        gateway: Arc<dyn ObjectStore>,
        storage: Arc<dyn KeyValueStore>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            storage,
            clock: Arc::new(SystemClock),
            bucket: bucket.into(),
            ttl: CACHE_TTL,
            url_ttl: SIGNED_URL_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_url_ttl(mut self, url_ttl: Duration) -> Self {
        self.url_ttl = url_ttl;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cache_key(folder: &str) -> String {
        format!("folderItems_{}", folder)
    }

    /// Media items of `folder`, from cache while fresh, otherwise listed and
    /// signed anew. Listing failures are returned without touching the cache.
    pub async fn folder_items(&self, folder: &str) -> Result<Vec<MediaItem>, GatewayError> {
        if let Some(entry) = self.cached(folder) {
            log::debug!("[ListingCache] Hit for {} ({} items)", folder, entry.data.len());
            return Ok(entry.data);
        }

        let prefix = format!("{}/", folder);
        let keys = self.gateway.list_all(&self.bucket, Some(&prefix)).await?;
        let data = self.resolve(keys).await;

        let entry = CacheEntry {
            data,
            timestamp: self.clock.now_millis(),
        };
        self.store(folder, &entry);
        log::info!(
            "[ListingCache] Resolved {} items for {}",
            entry.data.len(),
            folder
        );
        Ok(entry.data)
    }

    /// The fresh cache entry for `folder`, if any. Stale or unreadable
    /// entries are evicted on the way.
    pub fn cached(&self, folder: &str) -> Option<CacheEntry> {
        let key = Self::cache_key(folder);
        let raw = match self.storage.get(&key) {
            Ok(raw) => raw?,
            Err(err) => {
                log::warn!("[ListingCache] Failed to read {}: {}", key, err);
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) if !entry.is_expired(self.clock.now_millis(), self.ttl) => Some(entry),
            Ok(_) => {
                log::debug!("[ListingCache] Entry for {} expired", folder);
                self.evict(&key);
                None
            }
            Err(err) => {
                log::warn!("[ListingCache] Dropping corrupt entry for {}: {}", folder, err);
                self.evict(&key);
                None
            }
        }
    }

    /// Forget the listing of one folder
    pub fn invalidate(&self, folder: &str) -> Result<(), StoreError> {
        self.storage.remove(&Self::cache_key(folder))
    }

    /// Keep supported media keys and sign them, preserving listing order.
    /// Keys that fail to sign are left out.
    async fn resolve(&self, keys: Vec<String>) -> Vec<MediaItem> {
        let gateway = &self.gateway;
        let bucket = self.bucket.as_str();
        let url_ttl = self.url_ttl;

        stream::iter(keys.into_iter().filter(|key| is_supported_media(key)))
            .map(|key| async move {
                let signed = gateway.signed_url(bucket, &key, url_ttl).await;
                match signed {
                    Ok(url) => Some(MediaItem { key, url }),
                    Err(err) => {
                        log::warn!("[ListingCache] Skipping {}: {}", key, err);
                        None
                    }
                }
            })
            .buffered(SIGNING_CONCURRENCY)
            .filter_map(future::ready)
            .collect()
            .await
    }

    fn store(&self, folder: &str, entry: &CacheEntry) {
        let key = Self::cache_key(folder);
        let result = serde_json::to_string(entry)
            .map_err(StoreError::from)
            .and_then(|raw| self.storage.set(&key, &raw));
        if let Err(err) = result {
            log::warn!("[ListingCache] Failed to cache {}: {}", folder, err);
        }
    }

    fn evict(&self, key: &str) {
        if let Err(err) = self.storage.remove(key) {
            log::warn!("[ListingCache] Failed to evict {}: {}", key, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SessionStore;
    use crate::testing::{FakeStore, ManualClock};

    const START: i64 = 1_700_000_000_000;

    fn trip_keys() -> Vec<String> {
        vec![
            "trip2024/a.jpg".to_string(),
            "trip2024/b.mp4".to_string(),
            "trip2024/notes.txt".to_string(),
        ]
    }

    struct Fixture {
        gateway: Arc<FakeStore>,
        storage: Arc<SessionStore>,
        clock: Arc<ManualClock>,
        cache: ListingCache,
    }

    fn fixture(gateway: FakeStore) -> Fixture {
        let gateway = Arc::new(gateway);
        let storage = Arc::new(SessionStore::new());
        let clock = Arc::new(ManualClock::new(START));
        let cache = ListingCache::new(gateway.clone(), storage.clone(), "photos")
            .with_clock(clock.clone());
        Fixture {
            gateway,
            storage,
            clock,
            cache,
        }
    }

    fn stored_entry(fx: &Fixture, folder: &str) -> CacheEntry {
        let raw = fx
            .storage
            .get(&ListingCache::cache_key(folder))
            .unwrap()
            .unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn test_filters_to_media_and_signs_each() {
        let fx = fixture(FakeStore::new(trip_keys()));

        let items = fx.cache.folder_items("trip2024").await.unwrap();

        let keys: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["trip2024/a.jpg", "trip2024/b.mp4"]);
        assert!(items.iter().all(|i| i.url.contains(&i.key)));
        assert_eq!(fx.gateway.sign_calls(), 2);
    }

    /// Session storage that can be read but refuses every write
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }

        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_cache_write_still_returns_items() {
        let gateway = Arc::new(FakeStore::new(vec![
            "t/a.jpg".to_string(),
            "t/b.txt".to_string(),
        ]));
        let cache = ListingCache::new(gateway.clone(), Arc::new(ReadOnlyStore), "photos");

        let items = cache.folder_items("t").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].key, "t/a.jpg");

        // Nothing was cached, so the next call lists again
        cache.folder_items("t").await.unwrap();
        assert_eq!(gateway.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_second_call_within_ttl_hits_cache() {
        let fx = fixture(FakeStore::new(trip_keys()));

        let first = fx.cache.folder_items("trip2024").await.unwrap();
        fx.clock.advance(CACHE_TTL);
        let second = fx.cache.folder_items("trip2024").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(fx.gateway.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched_and_restamped() {
        let fx = fixture(FakeStore::new(trip_keys()));
        fx.cache.folder_items("trip2024").await.unwrap();
        assert_eq!(stored_entry(&fx, "trip2024").timestamp, START);

        fx.clock.advance(CACHE_TTL + Duration::from_millis(1));
        fx.gateway.set_keys(vec!["trip2024/c.png".to_string()]);
        let items = fx.cache.folder_items("trip2024").await.unwrap();

        assert_eq!(fx.gateway.list_calls(), 2);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].key, "trip2024/c.png");
        let entry = stored_entry(&fx, "trip2024");
        assert_eq!(entry.timestamp, START + CACHE_TTL.as_millis() as i64 + 1);
        assert_eq!(entry.data, items);
    }

    #[tokio::test]
    async fn test_stale_entry_is_never_served() {
        let fx = fixture(FakeStore::new(trip_keys()));
        fx.cache.folder_items("trip2024").await.unwrap();

        fx.clock.advance(CACHE_TTL * 2);

        assert!(fx.cache.cached("trip2024").is_none());
        // Evicted on read
        assert!(fx
            .storage
            .get(&ListingCache::cache_key("trip2024"))
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_signing_failure_omits_only_that_item() {
        let fx = fixture(FakeStore::new(trip_keys()).fail_signing_for("trip2024/a.jpg"));

        let items = fx.cache.folder_items("trip2024").await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].key, "trip2024/b.mp4");
    }

    #[tokio::test]
    async fn test_listing_failure_is_surfaced_and_not_cached() {
        let fx = fixture(FakeStore::new(trip_keys()).fail_listing_on_call(1));

        let result = fx.cache.folder_items("trip2024").await;

        assert!(matches!(result, Err(GatewayError::Listing { .. })));
        assert!(fx.storage.is_empty());

        // Next attempt goes remote again and succeeds
        let items = fx.cache.folder_items("trip2024").await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_treated_as_miss() {
        let fx = fixture(FakeStore::new(trip_keys()));
        fx.storage
            .set(&ListingCache::cache_key("trip2024"), "{\"data\": 42}")
            .unwrap();

        let items = fx.cache.folder_items("trip2024").await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(fx.gateway.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_absurd_timestamp_is_treated_as_stale() {
        let fx = fixture(FakeStore::new(trip_keys()));
        let entry = CacheEntry {
            data: Vec::new(),
            timestamp: i64::MIN,
        };
        fx.storage
            .set(
                &ListingCache::cache_key("trip2024"),
                &serde_json::to_string(&entry).unwrap(),
            )
            .unwrap();

        let items = fx.cache.folder_items("trip2024").await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(stored_entry(&fx, "trip2024").timestamp, START);
    }

    #[test]
    fn test_huge_ttl_does_not_wrap() {
        let entry = CacheEntry {
            data: Vec::new(),
            timestamp: START,
        };
        let ttl = Duration::from_secs(u64::MAX);

        assert!(!entry.is_expired(START + 1, ttl));
        assert!(!entry.is_expired(i64::MAX, ttl));
        assert!(entry.is_expired(i64::MAX, CACHE_TTL));
    }

    #[tokio::test]
    async fn test_concurrent_misses_both_go_remote_single_entry_wins() {
        let fx = fixture(FakeStore::new(trip_keys()));

        let (first, second) = tokio::join!(
            fx.cache.folder_items("trip2024"),
            fx.cache.folder_items("trip2024")
        );

        assert_eq!(fx.gateway.list_calls(), 2);
        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(fx.storage.len(), 1);
        assert_eq!(stored_entry(&fx, "trip2024").data.len(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let fx = fixture(FakeStore::new(trip_keys()));
        fx.cache.folder_items("trip2024").await.unwrap();

        fx.cache.invalidate("trip2024").unwrap();
        fx.cache.folder_items("trip2024").await.unwrap();

        assert_eq!(fx.gateway.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_folders_are_cached_independently() {
        let mut keys = trip_keys();
        keys.push("home/x.png".to_string());
        let fx = fixture(FakeStore::new(keys));

        fx.cache.folder_items("trip2024").await.unwrap();
        let home = fx.cache.folder_items("home").await.unwrap();
        fx.cache.folder_items("home").await.unwrap();

        assert_eq!(home.len(), 1);
        assert_eq!(fx.gateway.list_calls(), 2);
    }
}
