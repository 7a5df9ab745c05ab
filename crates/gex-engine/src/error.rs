//! GEX engine error types

use market_data::MarketDataError;
use thiserror::Error;

/// Cycle-level failures.
///
/// Per-instrument problems never surface here; they are counted as
/// [`SkipReason`](crate::greeks::SkipReason)s. Degenerate analysis outcomes
/// (no zero-gamma crossing, cold history) are `None`, not errors.
#[derive(Error, Debug)]
pub enum GexError {
    /// Instrument list or spot price could not be fetched
    #[error("Upstream unavailable for {asset}: {source}")]
    UpstreamUnavailable {
        asset: String,
        #[source]
        source: MarketDataError,
    },

    /// Spot price is unusable for exposure scaling
    #[error("Invalid spot price for {asset}: {price}")]
    InvalidSpotPrice { asset: String, price: f64 },

    /// Engine configuration rejected
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GexError {
    pub fn upstream(asset: impl Into<String>, source: MarketDataError) -> Self {
        Self::UpstreamUnavailable {
            asset: asset.into(),
            source,
        }
    }

    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpstreamUnavailable { .. } => "upstream",
            Self::InvalidSpotPrice { .. } => "spot_price",
            Self::Config(_) => "config",
        }
    }
}
