//! In-process TTL memoization for remote archive queries.
//!
//! Every remote operation goes through [`TtlCache::get_or_compute`]: a fresh
//! entry is returned as-is, an expired or missing entry triggers the compute
//! closure, and concurrent callers for the same key coalesce into a single
//! computation (single-flight) so the fan-out in `services::fetch` never
//! issues duplicate requests for one key.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::models::{Account, GlobalStats, MonthlyOccurrence, MonthlyTotal, TweetRecord};

struct CacheEntry<V> {
    value: V,
    fetched_at: Instant,
}

type Slot<V> = Arc<Mutex<Option<CacheEntry<V>>>>;

/// TTL cache with single-flight semantics, generic over the key and payload.
///
/// Entries are immutable once stored; expiry replaces them on the next
/// lookup. A failed compute stores nothing, so the next caller retries.
pub struct TtlCache<K, V> {
    ttl: Duration,
    slots: Mutex<HashMap<K, Slot<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key` if it is younger than the TTL,
    /// otherwise runs `compute` and stores its result.
    ///
    /// The per-key lock is held across the computation: concurrent callers
    /// for the same key wait and then read the stored result instead of
    /// recomputing. Keys are independent; computations for different keys
    /// run in parallel.
    pub async fn get_or_compute<F, Fut, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = {
            let mut slots = self.slots.lock().await;
            self.sweep_expired(&mut slots);
            Arc::clone(slots.entry(key).or_default())
        };

        let mut entry = slot.lock().await;

        if let Some(cached) = entry.as_ref()
            && cached.fetched_at.elapsed() <= self.ttl
        {
            return Ok(cached.value.clone());
        }

        let value = compute().await?;
        *entry = Some(CacheEntry {
            value: value.clone(),
            fetched_at: Instant::now(),
        });

        Ok(value)
    }

    /// Drops entries past their TTL while the map lock is already held.
    /// Ideally a background job, but opportunistic cleanup keeps the map
    /// from accumulating dead keys without one. Slots currently locked by
    /// an in-flight computation are left alone.
    fn sweep_expired(&self, slots: &mut HashMap<K, Slot<V>>) {
        slots.retain(|_, slot| match slot.try_lock() {
            Ok(entry) => entry
                .as_ref()
                .is_none_or(|e| e.fetched_at.elapsed() <= self.ttl),
            Err(_) => true,
        });
    }

    /// Number of keys currently tracked, fresh or not.
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.lock().await.is_empty()
    }
}

/// Cache key for a tweet search. The date range is part of the key because
/// the backend filters tweets server-side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TweetSearchKey {
    pub keyword: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub limit: u32,
}

/// Cache key for an occurrence lookup. The backend returns all months, and
/// callers narrow to their date range locally, so the range is deliberately
/// absent here: one cached payload serves any narrowing. Account ids are
/// sorted and deduplicated so logically equal filters hash identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OccurrenceKey {
    pub keyword: String,
    account_ids: Vec<String>,
}

impl OccurrenceKey {
    #[must_use]
    pub fn new(keyword: impl Into<String>, account_ids: &[String]) -> Self {
        let mut account_ids = account_ids.to_vec();
        account_ids.sort();
        account_ids.dedup();
        Self {
            keyword: keyword.into(),
            account_ids,
        }
    }

    #[must_use]
    pub fn account_ids(&self) -> &[String] {
        &self.account_ids
    }
}

/// All the typed caches one dashboard process owns, constructed once at
/// startup and shared by reference. Each remote operation kind keys its own
/// map, so a tweet search can never collide with an occurrence lookup.
pub struct FetchCache {
    pub tweets: TtlCache<TweetSearchKey, Vec<TweetRecord>>,
    pub occurrences: TtlCache<OccurrenceKey, Vec<MonthlyOccurrence>>,
    pub totals: TtlCache<(), Vec<MonthlyTotal>>,
    pub accounts: TtlCache<(), Vec<Account>>,
    pub stats: TtlCache<(), Option<GlobalStats>>,
}

impl FetchCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            tweets: TtlCache::new(ttl),
            occurrences: TtlCache::new(ttl),
            totals: TtlCache::new(ttl),
            accounts: TtlCache::new(ttl),
            stats: TtlCache::new(ttl),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_fetch(calls: &AtomicUsize) -> impl Future<Output = Result<u32, Infallible>> + '_ {
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        }
    }

    #[tokio::test]
    async fn test_hit_within_ttl_skips_compute() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(3600));
        let calls = AtomicUsize::new(0);

        let a = cache.get_or_compute("k", || counting_fetch(&calls)).await;
        let b = cache.get_or_compute("k", || counting_fetch(&calls)).await;

        assert_eq!(a, Ok(42));
        assert_eq!(b, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_recomputed() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(3600));
        let calls = AtomicUsize::new(0);

        cache
            .get_or_compute("k", || counting_fetch(&calls))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(3601)).await;
        cache
            .get_or_compute("k", || counting_fetch(&calls))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_drops_expired_keys() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(10));
        let calls = AtomicUsize::new(0);

        cache
            .get_or_compute("old", || counting_fetch(&calls))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;
        cache
            .get_or_compute("new", || counting_fetch(&calls))
            .await
            .unwrap();

        // "old" expired and was swept during the "new" lookup
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_single_flight_coalesces_concurrent_callers() {
        let cache: Arc<TtlCache<&'static str, u32>> =
            Arc::new(TtlCache::new(Duration::from_secs(3600)));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute("k", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<u32, Infallible>(7)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(7));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_compute_not_stored() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(3600));
        let calls = AtomicUsize::new(0);

        let failed: Result<u32, &str> = cache
            .get_or_compute("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("backend down")
            })
            .await;
        assert_eq!(failed, Err("backend down"));

        let ok: Result<u32, &str> = cache
            .get_or_compute("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(9)
            })
            .await;
        assert_eq!(ok, Ok(9));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_occurrence_key_normalizes_account_order() {
        let a = OccurrenceKey::new("tpot", &["2".to_string(), "1".to_string(), "2".to_string()]);
        let b = OccurrenceKey::new("tpot", &["1".to_string(), "2".to_string()]);
        assert_eq!(a, b);
    }
}
