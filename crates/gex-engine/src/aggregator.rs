//! Strike aggregation
//!
//! Folds already-collected samples into a strike-indexed exposure curve in
//! one deterministic pass. Only a single expiry is aggregated per cycle.

use crate::greeks::SkipReason;
use crate::types::{ExposureCurve, GreeksSample, StrikeActivity, StrikeAggregate, Weighting};
use market_data::{Instrument, OptionType};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Exposure is reported in millions of notional per 1% spot move.
pub const DEFAULT_SCALING_CONSTANT: f64 = 100.0;
const NOTIONAL_DIVISOR: f64 = 1_000_000.0;

/// Which expiry a cycle analyses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirySelection {
    /// Earliest expiration among the supplied instruments
    #[default]
    Nearest,
    /// The k-th distinct expiration, 0 being the nearest
    Nth(usize),
}

/// Pick the expiration timestamp to analyse. Instruments without one are
/// ignored; `None` when no instrument has an expiry.
pub fn select_expiry<'a, I>(instruments: I, selection: ExpirySelection) -> Option<i64>
where
    I: IntoIterator<Item = &'a Instrument>,
{
    let expiries: BTreeSet<i64> = instruments
        .into_iter()
        .filter_map(|i| i.expiration_timestamp)
        .collect();

    let index = match selection {
        ExpirySelection::Nearest => 0,
        ExpirySelection::Nth(k) => k,
    };

    expiries.into_iter().nth(index)
}

/// Result of folding one weighting view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub curve: ExposureCurve,
    pub expiration_timestamp: Option<i64>,
    /// Samples dropped during the fold, with their reasons
    pub skipped: Vec<(String, SkipReason)>,
}

#[derive(Debug, Clone, Copy)]
pub struct StrikeAggregator {
    pub scaling_constant: f64,
    pub expiry_selection: ExpirySelection,
}

impl Default for StrikeAggregator {
    fn default() -> Self {
        Self {
            scaling_constant: DEFAULT_SCALING_CONSTANT,
            expiry_selection: ExpirySelection::Nearest,
        }
    }
}

impl StrikeAggregator {
    pub fn new(scaling_constant: f64, expiry_selection: ExpirySelection) -> Self {
        Self {
            scaling_constant,
            expiry_selection,
        }
    }

    /// Unsigned exposure of one sample:
    /// `gamma * weight * spot² * contract_size * scaling / 1e6`.
    pub fn exposure(&self, sample: &GreeksSample, spot: f64, weighting: Weighting) -> f64 {
        sample.gamma
            * sample.weight(weighting)
            * spot
            * spot
            * sample.instrument.contract_size
            * self.scaling_constant
            / NOTIONAL_DIVISOR
    }

    pub fn select_expiry(&self, samples: &[GreeksSample]) -> Option<i64> {
        select_expiry(samples.iter().map(|s| &s.instrument), self.expiry_selection)
    }

    /// Sum signed exposure per strike for the selected expiry.
    ///
    /// Calls add to `call_gex`, puts subtract from `put_gex`. Every strike of
    /// the selected expiry appears once, with an untouched side at exactly 0.
    /// Samples from other expiries are filtered out, not counted as skipped.
    pub fn aggregate(&self, samples: &[GreeksSample], spot: f64, weighting: Weighting) -> Aggregation {
        let expiry = self.select_expiry(samples);
        let mut skipped = Vec::new();
        let mut by_strike: BTreeMap<OrderedFloat<f64>, (f64, f64)> = BTreeMap::new();

        for sample in samples {
            let name = &sample.instrument.instrument_name;
            let Some(sample_expiry) = sample.instrument.expiration_timestamp else {
                skipped.push((name.clone(), SkipReason::NoExpiry));
                continue;
            };
            if Some(sample_expiry) != expiry {
                continue;
            }

            let strike = sample.instrument.strike;
            let value = self.exposure(sample, spot, weighting);
            if !strike.is_finite() || !value.is_finite() {
                skipped.push((name.clone(), SkipReason::NonFinite));
                continue;
            }

            let entry = by_strike.entry(OrderedFloat(strike)).or_insert((0.0, 0.0));
            match sample.option_type() {
                OptionType::Call => entry.0 += value,
                OptionType::Put => entry.1 -= value,
            }
        }

        let points = by_strike
            .into_iter()
            .map(|(strike, (call_gex, put_gex))| StrikeAggregate::new(strike.0, call_gex, put_gex))
            .collect();

        Aggregation {
            curve: ExposureCurve::from_points(points),
            expiration_timestamp: expiry,
            skipped,
        }
    }

    /// Raw open interest and volume per strike for one expiry.
    pub fn activity(&self, samples: &[GreeksSample], expiry: Option<i64>) -> Vec<StrikeActivity> {
        let mut by_strike: BTreeMap<OrderedFloat<f64>, StrikeActivity> = BTreeMap::new();

        for sample in samples {
            let strike = sample.instrument.strike;
            if expiry.is_none() || sample.instrument.expiration_timestamp != expiry || !strike.is_finite() {
                continue;
            }

            let row = by_strike.entry(OrderedFloat(strike)).or_insert(StrikeActivity {
                strike,
                ..StrikeActivity::default()
            });
            match sample.option_type() {
                OptionType::Call => {
                    row.call_oi += sample.open_interest;
                    row.call_volume += sample.volume;
                }
                OptionType::Put => {
                    row.put_oi += sample.open_interest;
                    row.put_volume += sample.volume;
                }
            }
        }

        by_strike.into_values().collect()
    }
}
