//! Rolling net-exposure history and lookback deltas

pub mod memory;
pub mod traits;

pub use memory::InMemoryHistoryStore;
pub use traits::HistoryStore;

use crate::types::GexSnapshot;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Lookback windows answered for every report, in minutes.
pub const LOOKBACK_WINDOWS: [u32; 5] = [1, 5, 10, 15, 30];

pub const DEFAULT_RETENTION_MINUTES: u64 = 35;
pub const DEFAULT_MAX_ENTRIES: usize = 600;

/// How long and how many entries are kept per asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub horizon: Duration,
    pub max_entries: usize,
}

impl RetentionPolicy {
    pub fn new(retention_minutes: u64, max_entries: usize) -> Self {
        Self {
            horizon: Duration::minutes(retention_minutes as i64),
            max_entries: max_entries.max(1),
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION_MINUTES, DEFAULT_MAX_ENTRIES)
    }
}

/// One recorded refresh.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub captured_at: DateTime<Utc>,
    pub net_gex: f64,
    pub net_vol_gex: f64,
    pub snapshot: Arc<GexSnapshot>,
}

impl HistoryEntry {
    pub fn new(snapshot: Arc<GexSnapshot>, captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at,
            net_gex: snapshot.open_interest.analysis.net_gex,
            net_vol_gex: snapshot.volume.analysis.net_gex,
            snapshot,
        }
    }

    pub fn point(&self) -> HistoryPoint {
        HistoryPoint {
            captured_at: self.captured_at,
            net_oi_gex: self.net_gex,
            net_vol_gex: self.net_vol_gex,
        }
    }
}

/// Display form of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub captured_at: DateTime<Utc>,
    pub net_oi_gex: f64,
    pub net_vol_gex: f64,
}

/// Change in net exposure over each lookback window. `None` while the
/// history is not yet old enough.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Momentum {
    #[serde(rename = "1min")]
    pub one_min: Option<f64>,
    #[serde(rename = "5min")]
    pub five_min: Option<f64>,
    #[serde(rename = "10min")]
    pub ten_min: Option<f64>,
    #[serde(rename = "15min")]
    pub fifteen_min: Option<f64>,
    #[serde(rename = "30min")]
    pub thirty_min: Option<f64>,
}

impl Momentum {
    /// Build from `(minutes, delta)` pairs; windows not listed stay `None`.
    pub fn from_deltas(deltas: impl IntoIterator<Item = (u32, Option<f64>)>) -> Self {
        let mut momentum = Self::default();
        for (minutes, delta) in deltas {
            match minutes {
                1 => momentum.one_min = delta,
                5 => momentum.five_min = delta,
                10 => momentum.ten_min = delta,
                15 => momentum.fifteen_min = delta,
                30 => momentum.thirty_min = delta,
                _ => {}
            }
        }
        momentum
    }
}

/// Delta against the latest entry at least `minutes_ago` old.
///
/// `entries` must be ascending by `captured_at`.
pub fn delta<'a, I>(entries: I, minutes_ago: u32, current_net_gex: f64, now: DateTime<Utc>) -> Option<f64>
where
    I: IntoIterator<Item = &'a HistoryEntry>,
{
    let cutoff = now - Duration::minutes(i64::from(minutes_ago));
    entries
        .into_iter()
        .take_while(|e| e.captured_at <= cutoff)
        .last()
        .map(|e| current_net_gex - e.net_gex)
}
