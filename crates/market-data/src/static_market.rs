//! Static market data provider - returns fixed instruments, tickers and
//! spot prices held in memory. Used for offline runs and tests.

use crate::error::MarketDataError;
use crate::provider::{SnapshotProvider, TickerProvider};
use crate::types::{Instrument, Ticker};
use crate::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct StaticMarketData {
    spot_prices: RwLock<HashMap<String, f64>>,
    instruments: RwLock<HashMap<String, Vec<Instrument>>>,
    tickers: RwLock<HashMap<String, Ticker>>,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_spot_price(&self, currency: &str, price: f64) {
        self.spot_prices
            .write()
            .insert(currency.to_uppercase(), price);
    }

    pub fn set_instruments(&self, currency: &str, instruments: Vec<Instrument>) {
        self.instruments
            .write()
            .insert(currency.to_uppercase(), instruments);
    }

    pub fn set_ticker(&self, instrument_name: &str, ticker: Ticker) {
        self.tickers
            .write()
            .insert(instrument_name.to_string(), ticker);
    }

    pub fn remove_ticker(&self, instrument_name: &str) {
        self.tickers.write().remove(instrument_name);
    }
}

#[async_trait]
impl SnapshotProvider for StaticMarketData {
    async fn instruments(&self, currency: &str) -> Result<Vec<Instrument>> {
        self.instruments
            .read()
            .get(&currency.to_uppercase())
            .cloned()
            .ok_or_else(|| MarketDataError::InvalidSymbol(currency.to_string()))
    }

    async fn spot_price(&self, currency: &str) -> Result<f64> {
        self.spot_prices
            .read()
            .get(&currency.to_uppercase())
            .copied()
            .ok_or_else(|| {
                MarketDataError::DataNotAvailable(format!("no spot price for {}", currency))
            })
    }
}

#[async_trait]
impl TickerProvider for StaticMarketData {
    async fn ticker(&self, instrument_name: &str) -> Result<Option<Ticker>> {
        Ok(self.tickers.read().get(instrument_name).cloned())
    }
}
