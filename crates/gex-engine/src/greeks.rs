//! Greeks sources
//!
//! A [`GreeksModel`] turns one instrument and its ticker into a
//! [`GreeksSample`], or says why the instrument cannot contribute. Both
//! models are pure; all I/O happens in the [`sampler`](crate::sampler).

use crate::types::GreeksSample;
use market_data::black_scholes::black_scholes_greeks;
use market_data::{time_to_expiry_years, BSInputs, Instrument, Ticker};
use serde::Serialize;
use std::fmt;

/// Why an instrument was left out of a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The venue had no ticker for the instrument
    NoTicker,
    /// Ticker request failed
    FetchFailed,
    /// Ticker request exceeded the per-task timeout
    Timeout,
    /// Implied volatility missing, zero or negative
    NonPositiveIv,
    /// Exchange Greeks requested but the ticker carries no gamma
    MissingGamma,
    /// Gamma, weights or resulting exposure not finite, or negative
    NonFinite,
    /// Instrument has no expiration timestamp
    NoExpiry,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NoTicker => "no_ticker",
            SkipReason::FetchFailed => "fetch_failed",
            SkipReason::Timeout => "timeout",
            SkipReason::NonPositiveIv => "non_positive_iv",
            SkipReason::MissingGamma => "missing_gamma",
            SkipReason::NonFinite => "non_finite",
            SkipReason::NoExpiry => "no_expiry",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produces the gamma and exposure weights for one instrument.
pub trait GreeksModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn sample(
        &self,
        instrument: &Instrument,
        ticker: &Ticker,
        spot: f64,
        now_ms: i64,
    ) -> Result<GreeksSample, SkipReason>;
}

fn usable_weight(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn finish(instrument: &Instrument, gamma: f64, ticker: &Ticker) -> Result<GreeksSample, SkipReason> {
    if !usable_weight(gamma) || !usable_weight(ticker.open_interest) || !usable_weight(ticker.volume) {
        return Err(SkipReason::NonFinite);
    }

    Ok(GreeksSample::new(
        instrument.clone(),
        gamma,
        ticker.open_interest,
        ticker.volume,
    ))
}

/// Uses the gamma reported by the exchange.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExchangeGreeks;

impl GreeksModel for ExchangeGreeks {
    fn name(&self) -> &'static str {
        "exchange"
    }

    fn sample(
        &self,
        instrument: &Instrument,
        ticker: &Ticker,
        _spot: f64,
        _now_ms: i64,
    ) -> Result<GreeksSample, SkipReason> {
        let gamma = ticker.gamma.ok_or(SkipReason::MissingGamma)?;
        finish(instrument, gamma, ticker)
    }
}

/// Computes gamma from the ticker's mark IV with closed-form Black-Scholes.
///
/// Expired instruments are kept with zero gamma: they count as processed
/// but contribute no exposure.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlackScholesGreeks {
    pub risk_free_rate: f64,
}

impl BlackScholesGreeks {
    pub fn new(risk_free_rate: f64) -> Self {
        Self { risk_free_rate }
    }
}

impl GreeksModel for BlackScholesGreeks {
    fn name(&self) -> &'static str {
        "black_scholes"
    }

    fn sample(
        &self,
        instrument: &Instrument,
        ticker: &Ticker,
        spot: f64,
        now_ms: i64,
    ) -> Result<GreeksSample, SkipReason> {
        let expiry = instrument
            .expiration_timestamp
            .ok_or(SkipReason::NoExpiry)?;

        let iv = match ticker.mark_iv {
            Some(iv) if iv > 0.0 => iv,
            _ => return Err(SkipReason::NonPositiveIv),
        };

        let greeks = black_scholes_greeks(BSInputs {
            spot,
            strike: instrument.strike,
            time: time_to_expiry_years(expiry, now_ms),
            vol: iv / 100.0,
            rate: self.risk_free_rate,
            option_type: instrument.option_type,
        });

        finish(instrument, greeks.gamma, ticker)
    }
}
