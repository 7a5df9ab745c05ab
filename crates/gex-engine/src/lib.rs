//! Gamma exposure engine
//!
//! Turns an option chain snapshot into a strike-indexed gamma exposure
//! profile, locates the zero-gamma crossing and the call/put walls, and
//! tracks how net exposure moves over the last half hour.
//!
//! # Core Components
//!
//! - [`greeks`] - Exchange pass-through and Black-Scholes Greeks models
//! - [`sampler`] - Bounded parallel ticker fan-out
//! - [`aggregator`] - Signed per-strike exposure for one expiry
//! - [`analyzer`] - Walls, zero gamma and totals
//! - [`history`] - Rolling net-exposure log and lookback deltas
//! - [`cache`] - Per-asset TTL memoization
//! - [`pipeline`] - The refresh cycle tying the above together
//! - [`report`] - Flat response record
//!
//! # Key Invariants
//!
//! - Put exposure is stored negative, call exposure positive
//! - Curves are strictly increasing by strike
//! - A missing instrument is skipped and counted, never fatal
//! - Missing crossings, walls and lookbacks are `None`, not errors

pub mod aggregator;
pub mod analyzer;
pub mod cache;
pub mod error;
pub mod greeks;
pub mod history;
pub mod pipeline;
pub mod report;
pub mod sampler;
pub mod types;

pub use aggregator::{select_expiry, Aggregation, ExpirySelection, StrikeAggregator};
pub use analyzer::{analyze, call_wall, put_wall, zero_gamma};
pub use cache::{Cached, TtlCache};
pub use error::GexError;
pub use greeks::{BlackScholesGreeks, ExchangeGreeks, GreeksModel, SkipReason};
pub use history::{HistoryPoint, HistoryStore, InMemoryHistoryStore, Momentum, RetentionPolicy, LOOKBACK_WINDOWS};
pub use pipeline::{greeks_model, GexPipeline, PipelineSettings};
pub use report::{GexReport, ReportRow};
pub use sampler::{collect_samples, SampleBatch, SampleOptions};
pub use types::{
    CurveAnalysis, ExposureCurve, GexSnapshot, GreeksSample, StrikeActivity, StrikeAggregate, WeightedView,
    Weighting,
};

pub type Result<T> = std::result::Result<T, GexError>;
