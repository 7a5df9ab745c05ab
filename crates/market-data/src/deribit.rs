//! Deribit public REST client.
//!
//! Only the three public endpoints the GEX pipeline needs are covered:
//! instrument listing, per-instrument ticker and the perpetual's mark price
//! used as spot.

use crate::error::MarketDataError;
use crate::provider::{SnapshotProvider, TickerProvider};
use crate::types::{Instrument, Ticker};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_BASE_URL: &str = "https://www.deribit.com/api/v2";

/// Currencies with a `<CUR>-PERPETUAL` contract usable as spot reference.
pub const SPOT_CURRENCIES: &[&str] = &["BTC", "ETH"];

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: Option<T>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawTicker {
    #[serde(default)]
    open_interest: Option<f64>,
    #[serde(default)]
    mark_iv: Option<f64>,
    #[serde(default)]
    mark_price: Option<f64>,
    #[serde(default)]
    stats: Option<RawStats>,
    #[serde(default)]
    greeks: Option<RawGreeks>,
}

#[derive(Debug, Deserialize)]
struct RawStats {
    #[serde(default)]
    volume: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawGreeks {
    #[serde(default)]
    gamma: Option<f64>,
}

impl From<RawTicker> for Ticker {
    fn from(raw: RawTicker) -> Self {
        Ticker {
            open_interest: raw.open_interest.unwrap_or(0.0),
            volume: raw.stats.and_then(|s| s.volume).unwrap_or(0.0),
            mark_iv: raw.mark_iv,
            gamma: raw.greeks.and_then(|g| g.gamma),
        }
    }
}

/// Either the decoded `result` or the venue's error message.
enum Reply<T> {
    Ok(T),
    VenueError(String),
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<Reply<T>> {
    let envelope: Envelope<T> =
        serde_json::from_str(body).map_err(|e| MarketDataError::Decode(e.to_string()))?;

    match (envelope.result, envelope.error) {
        (Some(result), _) => Ok(Reply::Ok(result)),
        (None, Some(err)) => Ok(Reply::VenueError(format!("{} (code {})", err.message, err.code))),
        (None, None) => Err(MarketDataError::Decode(
            "response has neither result nor error".to_string(),
        )),
    }
}

#[derive(Debug, Clone)]
pub struct DeribitClient {
    client: Client,
    base_url: String,
}

impl DeribitClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MarketDataError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<Reply<T>> {
        let url = format!("{}{}", self.base_url, path);
        let body = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await?
            .text()
            .await?;

        decode(&body)
    }

    async fn raw_ticker(&self, instrument_name: &str) -> Result<Reply<RawTicker>> {
        self.get("/public/ticker", &[("instrument_name", instrument_name)])
            .await
    }
}

#[async_trait]
impl SnapshotProvider for DeribitClient {
    #[instrument(skip(self))]
    async fn instruments(&self, currency: &str) -> Result<Vec<Instrument>> {
        let currency = currency.to_uppercase();
        let reply = self
            .get::<Vec<Instrument>>(
                "/public/get_instruments",
                &[
                    ("currency", currency.as_str()),
                    ("kind", "option"),
                    ("expired", "false"),
                ],
            )
            .await?;

        match reply {
            Reply::Ok(instruments) => {
                debug!(count = instruments.len(), "fetched instruments");
                Ok(instruments)
            }
            Reply::VenueError(msg) => Err(MarketDataError::Provider(format!(
                "get_instruments {}: {}",
                currency, msg
            ))),
        }
    }

    #[instrument(skip(self))]
    async fn spot_price(&self, currency: &str) -> Result<f64> {
        let currency = currency.to_uppercase();
        if !SPOT_CURRENCIES.contains(&currency.as_str()) {
            return Err(MarketDataError::InvalidSymbol(format!(
                "spot price not supported for {}",
                currency
            )));
        }

        let perpetual = format!("{}-PERPETUAL", currency);
        match self.raw_ticker(&perpetual).await? {
            Reply::Ok(RawTicker {
                mark_price: Some(price),
                ..
            }) => Ok(price),
            Reply::Ok(_) => Err(MarketDataError::DataNotAvailable(format!(
                "no mark price for {}",
                perpetual
            ))),
            Reply::VenueError(msg) => Err(MarketDataError::Provider(format!(
                "ticker {}: {}",
                perpetual, msg
            ))),
        }
    }
}

#[async_trait]
impl TickerProvider for DeribitClient {
    async fn ticker(&self, instrument_name: &str) -> Result<Option<Ticker>> {
        match self.raw_ticker(instrument_name).await? {
            Reply::Ok(raw) => Ok(Some(raw.into())),
            Reply::VenueError(msg) => {
                debug!(instrument = instrument_name, error = %msg, "no ticker");
                Ok(None)
            }
        }
    }
}
