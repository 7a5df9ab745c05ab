use super::{delta, HistoryEntry, HistoryPoint, HistoryStore, RetentionPolicy};
use crate::types::GexSnapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::trace;

/// Process-local history, pruned by age and by count on every write.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    policy: RetentionPolicy,
    logs: RwLock<HashMap<String, VecDeque<HistoryEntry>>>,
}

impl InMemoryHistoryStore {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            policy,
            logs: RwLock::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    pub fn len(&self, asset: &str) -> usize {
        self.logs.read().get(asset).map_or(0, VecDeque::len)
    }

    fn prune(&self, log: &mut VecDeque<HistoryEntry>, now: DateTime<Utc>) {
        let oldest_kept = now - self.policy.horizon;
        while log.front().is_some_and(|e| e.captured_at < oldest_kept) {
            log.pop_front();
        }
        while log.len() > self.policy.max_entries {
            log.pop_front();
        }
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn record(&self, asset: &str, snapshot: Arc<GexSnapshot>, now: DateTime<Utc>) {
        let entry = HistoryEntry::new(snapshot, now);
        let mut logs = self.logs.write();
        let log = logs.entry(asset.to_string()).or_default();

        // Entries stay sorted even if a slower cycle finishes late
        let at = log.partition_point(|e| e.captured_at <= now);
        log.insert(at, entry);
        self.prune(log, now);

        trace!(asset, retained = log.len(), "history recorded");
    }

    async fn delta(
        &self,
        asset: &str,
        minutes_ago: u32,
        current_net_gex: f64,
        now: DateTime<Utc>,
    ) -> Option<f64> {
        let logs = self.logs.read();
        delta(logs.get(asset)?, minutes_ago, current_net_gex, now)
    }

    async fn points(&self, asset: &str) -> Vec<HistoryPoint> {
        self.logs
            .read()
            .get(asset)
            .map(|log| log.iter().map(HistoryEntry::point).collect())
            .unwrap_or_default()
    }

    async fn latest(&self, asset: &str) -> Option<Arc<GexSnapshot>> {
        self.logs
            .read()
            .get(asset)
            .and_then(|log| log.back())
            .map(|e| Arc::clone(&e.snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{Momentum, LOOKBACK_WINDOWS};
    use crate::types::tests_support::snapshot;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    async fn record(store: &InMemoryHistoryStore, asset: &str, net: f64, at: DateTime<Utc>) {
        store.record(asset, Arc::new(snapshot(asset, net)), at).await;
    }

    #[tokio::test]
    async fn test_cold_start_delta_is_none() {
        let store = InMemoryHistoryStore::default();
        record(&store, "BTC", 10.0, t0()).await;

        assert_eq!(store.delta("BTC", 1, 10.0, t0()).await, None);
        assert_eq!(store.delta("ETH", 1, 10.0, t0()).await, None);

        let momentum = store.momentum("BTC", 10.0, t0()).await;
        assert_eq!(momentum, Momentum::default());
    }

    #[tokio::test]
    async fn test_delta_end_to_end() {
        let store = InMemoryHistoryStore::default();
        let later = t0() + Duration::seconds(90);
        record(&store, "BTC", 10.0, t0()).await;
        record(&store, "BTC", 16.0, later).await;

        assert_eq!(store.delta("BTC", 1, 16.0, later).await, Some(6.0));
        assert_eq!(store.delta("BTC", 5, 16.0, later).await, None);

        let momentum = store.momentum("BTC", 16.0, later).await;
        assert_eq!(momentum.one_min, Some(6.0));
        assert_eq!(momentum.five_min, None);
    }

    #[tokio::test]
    async fn test_windows_are_independent() {
        let store = InMemoryHistoryStore::default();
        let now = t0() + Duration::minutes(31);
        for (minute, net) in [(0, 1.0), (16, 2.0), (21, 3.0), (26, 4.0), (29, 5.0), (31, 9.0)] {
            record(&store, "BTC", net, t0() + Duration::minutes(minute)).await;
        }

        let momentum = store.momentum("BTC", 9.0, now).await;
        assert_eq!(momentum.one_min, Some(4.0));
        assert_eq!(momentum.five_min, Some(5.0));
        assert_eq!(momentum.ten_min, Some(6.0));
        assert_eq!(momentum.fifteen_min, Some(7.0));
        assert_eq!(momentum.thirty_min, Some(8.0));
        assert_eq!(LOOKBACK_WINDOWS.len(), 5);
    }

    #[tokio::test]
    async fn test_retention_horizon_prunes_old_entries() {
        let store = InMemoryHistoryStore::new(RetentionPolicy::new(35, 1000));
        record(&store, "BTC", 1.0, t0()).await;
        record(&store, "BTC", 2.0, t0() + Duration::minutes(20)).await;
        record(&store, "BTC", 3.0, t0() + Duration::minutes(36)).await;

        let points = store.points("BTC").await;
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].net_oi_gex, 2.0);
    }

    #[tokio::test]
    async fn test_count_cap_evicts_oldest() {
        let store = InMemoryHistoryStore::new(RetentionPolicy::new(35, 3));
        for i in 0..5 {
            record(&store, "ETH", i as f64, t0() + Duration::seconds(i * 10)).await;
        }

        assert_eq!(store.len("ETH"), 3);
        let nets: Vec<f64> = store.points("ETH").await.iter().map(|p| p.net_oi_gex).collect();
        assert_eq!(nets, vec![2.0, 3.0, 4.0]);
    }

    #[tokio::test]
    async fn test_count_cap_must_span_longest_window() {
        let now = t0() + Duration::minutes(31);
        let fill = |store: InMemoryHistoryStore| async move {
            for secs in 0..=31 * 60 {
                record(&store, "BTC", secs as f64, t0() + Duration::seconds(secs)).await;
            }
            store.momentum("BTC", 1860.0, now).await
        };

        // One entry per second over 35 minutes
        let momentum = fill(InMemoryHistoryStore::new(RetentionPolicy::new(35, 35 * 60))).await;
        assert_eq!(momentum.fifteen_min, Some(900.0));
        assert_eq!(momentum.thirty_min, Some(1800.0));

        let momentum = fill(InMemoryHistoryStore::new(RetentionPolicy::new(35, 600))).await;
        assert_eq!(momentum.ten_min, None);
        assert_eq!(momentum.thirty_min, None);
    }

    #[tokio::test]
    async fn test_out_of_order_record_stays_sorted() {
        let store = InMemoryHistoryStore::default();
        record(&store, "BTC", 2.0, t0() + Duration::seconds(60)).await;
        record(&store, "BTC", 1.0, t0()).await;

        let points = store.points("BTC").await;
        assert!(points[0].captured_at < points[1].captured_at);
        assert_eq!(store.latest("BTC").await.unwrap().net_gex(), 2.0);
    }

    #[tokio::test]
    async fn test_assets_are_isolated() {
        let store = InMemoryHistoryStore::default();
        record(&store, "BTC", 10.0, t0()).await;
        record(&store, "ETH", 99.0, t0()).await;

        let later = t0() + Duration::minutes(2);
        assert_eq!(store.delta("BTC", 1, 11.0, later).await, Some(1.0));
        assert_eq!(store.delta("ETH", 1, 100.0, later).await, Some(1.0));
        assert!(store.points("SOL").await.is_empty());
        assert!(store.latest("SOL").await.is_none());
    }
}
