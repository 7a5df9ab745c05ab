//! Short-lived memoization of refresh results, keyed by asset.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

type Slot<V> = Arc<AsyncMutex<Option<Entry<V>>>>;

/// Value returned from the cache, with whether it was already fresh.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<V> {
    pub value: V,
    pub hit: bool,
}

/// TTL cache allowing one in-flight computation per key.
///
/// Callers racing on the same key wait on that key's slot and then see the
/// freshly stored value. Failed computations are never stored.
pub struct TtlCache<K, V> {
    ttl: Duration,
    slots: Mutex<HashMap<K, Slot<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn slot(&self, key: &K) -> Slot<V> {
        let mut slots = self.slots.lock();
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: K, compute: F) -> Result<Cached<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(&key);
        let mut guard = slot.lock().await;

        if let Some(entry) = guard.as_ref() {
            if entry.stored_at.elapsed() < self.ttl {
                return Ok(Cached {
                    value: entry.value.clone(),
                    hit: true,
                });
            }
        }

        match compute().await {
            Ok(value) => {
                *guard = Some(Entry {
                    value: value.clone(),
                    stored_at: Instant::now(),
                });
                Ok(Cached { value, hit: false })
            }
            Err(e) => {
                *guard = None;
                Err(e)
            }
        }
    }

    /// Drop the entry for `key` so the next call recomputes.
    pub fn invalidate(&self, key: &K) {
        self.slots.lock().remove(key);
    }

    pub fn clear(&self) {
        self.slots.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_hit_within_ttl_then_expiry() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(30));
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let compute = move || async move { Ok::<_, ()>(calls.fetch_add(1, Ordering::SeqCst) as u32) };

        let first = cache.get_or_try_insert_with("BTC".into(), compute).await.unwrap();
        assert_eq!(first, Cached { value: 0, hit: false });

        tokio::time::advance(Duration::from_secs(10)).await;
        let second = cache.get_or_try_insert_with("BTC".into(), compute).await.unwrap();
        assert_eq!(second, Cached { value: 0, hit: true });

        tokio::time::advance(Duration::from_secs(25)).await;
        let third = cache.get_or_try_insert_with("BTC".into(), compute).await.unwrap();
        assert_eq!(third, Cached { value: 1, hit: false });
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(30));

        let err = cache
            .get_or_try_insert_with("BTC", || async { Err::<u32, _>("upstream down") })
            .await;
        assert_eq!(err, Err("upstream down"));

        let ok = cache
            .get_or_try_insert_with("BTC", || async { Ok::<_, &str>(7) })
            .await
            .unwrap();
        assert!(!ok.hit);
        assert_eq!(ok.value, 7);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(30));
        cache.get_or_try_insert_with("BTC", || async { Ok::<_, ()>(1) }).await.unwrap();
        cache.get_or_try_insert_with("ETH", || async { Ok::<_, ()>(2) }).await.unwrap();

        cache.invalidate(&"BTC");
        let btc = cache.get_or_try_insert_with("BTC", || async { Ok::<_, ()>(3) }).await.unwrap();
        assert_eq!(btc, Cached { value: 3, hit: false });

        let eth = cache.get_or_try_insert_with("ETH", || async { Ok::<_, ()>(4) }).await.unwrap();
        assert!(eth.hit);

        cache.clear();
        let eth = cache.get_or_try_insert_with("ETH", || async { Ok::<_, ()>(5) }).await.unwrap();
        assert_eq!(eth.value, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight_per_key() {
        let cache: Arc<TtlCache<&str, u32>> = Arc::new(TtlCache::new(Duration::from_secs(30)));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_try_insert_with("BTC", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, ()>(42)
                    })
                    .await
                    .unwrap()
                    .value
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
