use super::{HistoryPoint, Momentum, LOOKBACK_WINDOWS};
use crate::types::GexSnapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Per-asset, time-ordered log of refresh results.
///
/// Storage is best-effort: a store may drop entries at any time as long as
/// its retention still covers the longest lookback window.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn record(&self, asset: &str, snapshot: Arc<GexSnapshot>, now: DateTime<Utc>);

    /// `current_net_gex` minus the net exposure of the latest entry at least
    /// `minutes_ago` old, `None` when there is no such entry.
    async fn delta(
        &self,
        asset: &str,
        minutes_ago: u32,
        current_net_gex: f64,
        now: DateTime<Utc>,
    ) -> Option<f64>;

    /// Retained points, oldest first.
    async fn points(&self, asset: &str) -> Vec<HistoryPoint>;

    async fn latest(&self, asset: &str) -> Option<Arc<GexSnapshot>>;

    /// Deltas for every window in [`LOOKBACK_WINDOWS`], each an independent
    /// query against the same log.
    async fn momentum(&self, asset: &str, current_net_gex: f64, now: DateTime<Utc>) -> Momentum {
        let mut deltas = Vec::with_capacity(LOOKBACK_WINDOWS.len());
        for minutes in LOOKBACK_WINDOWS {
            deltas.push((minutes, self.delta(asset, minutes, current_net_gex, now).await));
        }
        Momentum::from_deltas(deltas)
    }
}
