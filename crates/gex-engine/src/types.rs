//! Value types flowing through a refresh cycle

use chrono::{DateTime, NaiveDate, Utc};
use market_data::{Instrument, OptionType};
use serde::{Deserialize, Serialize};

/// Gamma and exposure weights for one instrument.
///
/// Gamma is the unsigned Greek; the put-side sign is applied by the
/// aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct GreeksSample {
    pub instrument: Instrument,
    pub gamma: f64,
    pub open_interest: f64,
    pub volume: f64,
}

impl GreeksSample {
    pub fn new(instrument: Instrument, gamma: f64, open_interest: f64, volume: f64) -> Self {
        Self {
            instrument,
            gamma,
            open_interest,
            volume,
        }
    }

    pub fn weight(&self, weighting: Weighting) -> f64 {
        match weighting {
            Weighting::OpenInterest => self.open_interest,
            Weighting::Volume => self.volume,
        }
    }

    pub fn option_type(&self) -> OptionType {
        self.instrument.option_type
    }
}

/// Which exposure weight a curve is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    OpenInterest,
    Volume,
}

impl Weighting {
    pub fn as_str(&self) -> &'static str {
        match self {
            Weighting::OpenInterest => "open_interest",
            Weighting::Volume => "volume",
        }
    }
}

/// Signed exposure at one strike. `put_gex` is never positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrikeAggregate {
    pub strike: f64,
    pub call_gex: f64,
    pub put_gex: f64,
}

impl StrikeAggregate {
    pub fn new(strike: f64, call_gex: f64, put_gex: f64) -> Self {
        Self {
            strike,
            call_gex,
            put_gex,
        }
    }

    pub fn net_gex(&self) -> f64 {
        self.call_gex + self.put_gex
    }
}

/// Strike-indexed exposure, strictly increasing by strike.
///
/// Only the aggregator builds curves from samples; [`ExposureCurve::from_points`]
/// exists for callers that already hold sorted, unique points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExposureCurve {
    points: Vec<StrikeAggregate>,
}

impl ExposureCurve {
    /// Build a curve from points, sorting by strike and merging duplicates.
    pub fn from_points(mut points: Vec<StrikeAggregate>) -> Self {
        points.sort_by(|a, b| a.strike.total_cmp(&b.strike));

        let mut merged: Vec<StrikeAggregate> = Vec::with_capacity(points.len());
        for point in points {
            match merged.last_mut() {
                Some(last) if last.strike == point.strike => {
                    last.call_gex += point.call_gex;
                    last.put_gex += point.put_gex;
                }
                _ => merged.push(point),
            }
        }

        Self { points: merged }
    }

    pub fn points(&self) -> &[StrikeAggregate] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn strikes(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.strike)
    }

    pub fn net(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(StrikeAggregate::net_gex)
    }

    pub fn get(&self, strike: f64) -> Option<&StrikeAggregate> {
        self.points
            .binary_search_by(|p| p.strike.total_cmp(&strike))
            .ok()
            .map(|i| &self.points[i])
    }
}

/// Raw open interest and volume per strike and side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StrikeActivity {
    pub strike: f64,
    pub call_oi: f64,
    pub put_oi: f64,
    pub call_volume: f64,
    pub put_volume: f64,
}

impl StrikeActivity {
    pub fn open_interest(&self) -> f64 {
        self.call_oi + self.put_oi
    }

    pub fn volume(&self) -> f64 {
        self.call_volume + self.put_volume
    }
}

/// Key levels and totals derived from one curve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveAnalysis {
    pub zero_gamma: Option<f64>,
    pub call_wall: Option<f64>,
    pub put_wall: Option<f64>,
    pub total_call_gex: f64,
    pub total_put_gex: f64,
    pub net_gex: f64,
}

/// A curve and its analysis for one weighting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedView {
    pub curve: ExposureCurve,
    pub analysis: CurveAnalysis,
}

/// Full result of one refresh cycle for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GexSnapshot {
    pub asset: String,
    pub spot_price: f64,
    /// Expiry actually analysed, ms since epoch
    pub expiration_timestamp: Option<i64>,
    pub open_interest: WeightedView,
    pub volume: WeightedView,
    pub activity: Vec<StrikeActivity>,
    pub processed: usize,
    pub skipped: usize,
    pub computed_at: DateTime<Utc>,
}

impl GexSnapshot {
    pub fn expiration_date(&self) -> Option<NaiveDate> {
        self.expiration_timestamp
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.date_naive())
    }

    /// Net exposure tracked by the history (open-interest view).
    pub fn net_gex(&self) -> f64 {
        self.open_interest.analysis.net_gex
    }

    pub fn view(&self, weighting: Weighting) -> &WeightedView {
        match weighting {
            Weighting::OpenInterest => &self.open_interest,
            Weighting::Volume => &self.volume,
        }
    }
}
