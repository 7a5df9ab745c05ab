//! Flat response record for one asset.
//!
//! Every key is always present. Numeric fields that could not be computed
//! are `null`, and a failed cycle carries an `error` message with an empty
//! `data` array.

use crate::history::Momentum;
use crate::types::{GexSnapshot, StrikeActivity, StrikeAggregate};
use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

/// One strike row. `call_gex`/`put_gex` come from the open-interest curve,
/// the `vol_` columns from the volume curve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub strike: f64,
    pub call_gex: f64,
    pub put_gex: f64,
    pub vol_call_gex: f64,
    pub vol_put_gex: f64,
    pub open_interest: f64,
    pub volume: f64,
    pub call_oi: f64,
    pub put_oi: f64,
    pub call_volume: f64,
    pub put_volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GexReport {
    pub currency: String,
    pub data: Vec<ReportRow>,
    pub expiration_date: Option<String>,
    pub spot_price: Option<f64>,

    pub zero_gamma: Option<f64>,
    pub call_wall: Option<f64>,
    pub put_wall: Option<f64>,
    pub total_oi_call_gex: Option<f64>,
    pub total_oi_put_gex: Option<f64>,
    pub net_oi_gex: Option<f64>,

    pub zero_gamma_vol: Option<f64>,
    pub call_wall_vol: Option<f64>,
    pub put_wall_vol: Option<f64>,
    pub total_vol_call_gex: Option<f64>,
    pub total_vol_put_gex: Option<f64>,
    pub net_vol_gex: Option<f64>,

    pub max_change_gex: Momentum,
    pub processed_instruments: Option<usize>,
    pub skipped_instruments: Option<usize>,
    pub last_update_time: DateTime<Utc>,
    pub error: Option<String>,
}

/// Non-finite values serialize as `null`.
fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn blank(strike: f64) -> ReportRow {
    ReportRow {
        strike,
        ..ReportRow::default()
    }
}

fn apply_activity(row: &mut ReportRow, activity: &StrikeActivity) {
    row.open_interest = activity.open_interest();
    row.volume = activity.volume();
    row.call_oi = activity.call_oi;
    row.put_oi = activity.put_oi;
    row.call_volume = activity.call_volume;
    row.put_volume = activity.put_volume;
}

/// Merge both curves and the activity columns into one row per strike.
fn rows(snapshot: &GexSnapshot) -> Vec<ReportRow> {
    let mut rows: BTreeMap<OrderedFloat<f64>, ReportRow> = BTreeMap::new();

    for &StrikeAggregate { strike, call_gex, put_gex } in snapshot.open_interest.curve.points() {
        let row = rows.entry(OrderedFloat(strike)).or_insert_with(|| blank(strike));
        row.call_gex = call_gex;
        row.put_gex = put_gex;
    }
    for &StrikeAggregate { strike, call_gex, put_gex } in snapshot.volume.curve.points() {
        let row = rows.entry(OrderedFloat(strike)).or_insert_with(|| blank(strike));
        row.vol_call_gex = call_gex;
        row.vol_put_gex = put_gex;
    }
    for activity in &snapshot.activity {
        let row = rows
            .entry(OrderedFloat(activity.strike))
            .or_insert_with(|| blank(activity.strike));
        apply_activity(row, activity);
    }

    rows.into_values().collect()
}

impl GexReport {
    pub fn from_snapshot(snapshot: &GexSnapshot, momentum: Momentum) -> Self {
        let oi = &snapshot.open_interest.analysis;
        let vol = &snapshot.volume.analysis;

        Self {
            currency: snapshot.asset.clone(),
            data: rows(snapshot),
            expiration_date: snapshot
                .expiration_date()
                .map(|d| d.format("%Y-%m-%d").to_string()),
            spot_price: finite(snapshot.spot_price),

            zero_gamma: oi.zero_gamma,
            call_wall: oi.call_wall,
            put_wall: oi.put_wall,
            total_oi_call_gex: finite(oi.total_call_gex),
            total_oi_put_gex: finite(oi.total_put_gex),
            net_oi_gex: finite(oi.net_gex),

            zero_gamma_vol: vol.zero_gamma,
            call_wall_vol: vol.call_wall,
            put_wall_vol: vol.put_wall,
            total_vol_call_gex: finite(vol.total_call_gex),
            total_vol_put_gex: finite(vol.total_put_gex),
            net_vol_gex: finite(vol.net_gex),

            max_change_gex: momentum,
            processed_instruments: Some(snapshot.processed),
            skipped_instruments: Some(snapshot.skipped),
            last_update_time: snapshot.computed_at,
            error: None,
        }
    }

    /// Record for a cycle that produced no result.
    pub fn failed(currency: &str, error: &dyn Display, at: DateTime<Utc>) -> Self {
        Self {
            currency: currency.to_string(),
            data: Vec::new(),
            expiration_date: None,
            spot_price: None,
            zero_gamma: None,
            call_wall: None,
            put_wall: None,
            total_oi_call_gex: None,
            total_oi_put_gex: None,
            net_oi_gex: None,
            zero_gamma_vol: None,
            call_wall_vol: None,
            put_wall_vol: None,
            total_vol_call_gex: None,
            total_vol_put_gex: None,
            net_vol_gex: None,
            max_change_gex: Momentum::default(),
            processed_instruments: None,
            skipped_instruments: None,
            last_update_time: at,
            error: Some(error.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
