//! In-memory result cache backed by `moka`.
//!
//! Keeps the final [`ParcelOutcome`] of every resolution (errors included)
//! until evicted by the entry cap. There is no TTL. Concurrent lookups of
//! the same key share a single resolution.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use moka::future::Cache;
use parcel_lookup_parcel_models::{ParcelOutcome, ResolveInput};

/// Default maximum number of cached outcomes.
pub const DEFAULT_CAPACITY: u64 = 10_000;

/// Size-capped outcome cache with hit/miss counters.
pub struct ResultCache {
    cache: Cache<String, ParcelOutcome>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    /// Creates a cache holding at most `capacity` outcomes.
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(capacity).build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the cached outcome for `key`, if any.
    pub async fn get(&self, key: &str) -> Option<ParcelOutcome> {
        let found = self.cache.get(key).await;
        self.record(found.is_some());
        found
    }

    /// Returns the cached outcome for `key`, or runs `resolve` and caches
    /// its result.
    ///
    /// If another caller is already resolving the same key, this waits for
    /// that result instead of running `resolve`.
    pub async fn get_or_resolve<F>(&self, key: String, resolve: F) -> ParcelOutcome
    where
        F: Future<Output = ParcelOutcome>,
    {
        let entry = self.cache.entry(key).or_insert_with(resolve).await;
        self.record(!entry.is_fresh());
        entry.into_value()
    }

    /// Approximate number of cached outcomes.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Applies pending inserts and evictions so [`Self::entry_count`] is
    /// exact.
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }

    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    fn record(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Cache key for a validated request.
///
/// The address is lowercased with whitespace collapsed; coordinates are
/// fixed to 6 decimals. Absent parts are empty:
/// `"1 main st, dover, de||"`, `"|39.500000|-75.600000"`.
#[must_use]
pub fn cache_key(input: &ResolveInput) -> String {
    let address = input
        .address
        .as_deref()
        .map(|a| a.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
        .unwrap_or_default();

    let (lat, lon) = input.coordinate.map_or_else(
        || (String::new(), String::new()),
        |c| (format!("{:.6}", c.lat), format!("{:.6}", c.lon)),
    );

    format!("{address}|{lat}|{lon}")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use parcel_lookup_jurisdiction_models::Coordinate;
    use parcel_lookup_parcel_models::{ErrorCode, ParcelError};

    use super::*;

    fn no_parcel() -> ParcelOutcome {
        ParcelError::new(ErrorCode::NoParcel, "none").into()
    }

    #[test]
    fn key_normalizes_address_and_coordinates() {
        let a = ResolveInput {
            address: Some("1  Main St,\tDOVER".to_string()),
            coordinate: None,
        };
        assert_eq!(cache_key(&a), "1 main st, dover||");

        let b = ResolveInput {
            address: None,
            coordinate: Some(Coordinate::new(39.5, -75.6)),
        };
        assert_eq!(cache_key(&b), "|39.500000|-75.600000");
    }

    #[test]
    fn nearby_coordinates_share_a_key() {
        let key = |lat| {
            cache_key(&ResolveInput {
                address: None,
                coordinate: Some(Coordinate::new(lat, -75.6)),
            })
        };
        assert_eq!(key(39.500_000_1), key(39.5));
        assert_ne!(key(39.500_01), key(39.5));
    }

    #[tokio::test]
    async fn second_lookup_is_a_hit() {
        let cache = ResultCache::new(10);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let outcome = cache
                .get_or_resolve("k".to_string(), async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    no_parcel()
                })
                .await;
            assert_eq!(outcome.error_code(), Some(ErrorCode::NoParcel));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.get("k").await, Some(no_parcel()));
        assert_eq!(cache.get("other").await, None);
    }

    #[tokio::test]
    async fn concurrent_lookups_resolve_once() {
        let cache = Arc::new(ResultCache::new(10));
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_resolve("same".to_string(), async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::task::yield_now().await;
                            no_parcel()
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), no_parcel());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn capacity_is_enforced() {
        let cache = ResultCache::new(2);
        for i in 0..5 {
            cache
                .get_or_resolve(format!("k{i}"), async { no_parcel() })
                .await;
        }
        cache.sync().await;
        assert!(cache.entry_count() <= 2);
    }
}
