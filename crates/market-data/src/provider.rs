//! Inbound market data interfaces.
//!
//! The GEX engine only depends on these traits; concrete venues
//! ([`DeribitClient`](crate::deribit::DeribitClient)) and the offline
//! [`StaticMarketData`](crate::static_market::StaticMarketData) implement them.

use crate::types::{Instrument, Ticker};
use crate::Result;
use async_trait::async_trait;

/// Supplies the listed option instruments and the underlying spot price.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// All live option instruments for an underlying currency.
    async fn instruments(&self, currency: &str) -> Result<Vec<Instrument>>;

    /// Current spot (mark) price of the underlying.
    async fn spot_price(&self, currency: &str) -> Result<f64>;
}

/// Supplies per-instrument tickers.
///
/// `Ok(None)` is the "no data" signal: the venue knows nothing about the
/// instrument right now. Errors are transport or venue failures.
#[async_trait]
pub trait TickerProvider: Send + Sync {
    async fn ticker(&self, instrument_name: &str) -> Result<Option<Ticker>>;
}
