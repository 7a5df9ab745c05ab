//! Shared types for Market Data

use serde::{Deserialize, Serialize};

/// Milliseconds in a 365-day year, the day-count used for time to expiry.
pub const MS_PER_YEAR: f64 = 365.0 * 24.0 * 3600.0 * 1000.0;

/// Option type (Call or Put)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn is_call(&self) -> bool {
        matches!(self, OptionType::Call)
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionType::Call => write!(f, "call"),
            OptionType::Put => write!(f, "put"),
        }
    }
}

fn default_contract_size() -> f64 {
    1.0
}

/// An exchange-listed option contract as returned by the instrument listing.
///
/// Immutable reference data; one list is fetched per refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub instrument_name: String,
    pub strike: f64,
    pub option_type: OptionType,
    /// Expiry as milliseconds since the Unix epoch. Instruments without one
    /// are never aggregated.
    #[serde(default)]
    pub expiration_timestamp: Option<i64>,
    #[serde(default = "default_contract_size")]
    pub contract_size: f64,
}

impl Instrument {
    pub fn new(
        instrument_name: impl Into<String>,
        strike: f64,
        option_type: OptionType,
        expiration_timestamp: i64,
    ) -> Self {
        Self {
            instrument_name: instrument_name.into(),
            strike,
            option_type,
            expiration_timestamp: Some(expiration_timestamp),
            contract_size: default_contract_size(),
        }
    }

    pub fn with_contract_size(mut self, contract_size: f64) -> Self {
        self.contract_size = contract_size;
        self
    }
}

/// Per-instrument market snapshot (ticker).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub open_interest: f64,
    /// Traded volume over the exchange's rolling statistics window.
    pub volume: f64,
    /// Mark implied volatility in percent (e.g. 55.0 = 55%).
    pub mark_iv: Option<f64>,
    /// Exchange-reported gamma, when the venue publishes Greeks.
    pub gamma: Option<f64>,
}

/// Inputs for Black-Scholes Greeks
#[derive(Debug, Clone, Copy)]
pub struct BSInputs {
    /// Spot price (index price of underlying)
    pub spot: f64,
    /// Strike price
    pub strike: f64,
    /// Time to expiry (in years)
    pub time: f64,
    /// Implied volatility (as decimal, e.g., 0.5 = 50%)
    pub vol: f64,
    /// Risk-free rate (typically ~0 for crypto)
    pub rate: f64,
    /// Option type
    pub option_type: OptionType,
}

/// Option Greeks
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    /// Delta: ∂V/∂S (rate of change with spot)
    pub delta: f64,
    /// Gamma: ∂²V/∂S² (curvature of delta)
    pub gamma: f64,
    /// Vega: ∂V/∂σ (sensitivity to volatility)
    pub vega: f64,
    /// Theta: ∂V/∂t (time decay)
    pub theta: f64,
}

impl Greeks {
    /// All-zero Greeks, returned for expired or quote-less contracts.
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Time to expiry in years from two millisecond epoch timestamps.
///
/// Negative when the expiry is already in the past.
pub fn time_to_expiry_years(expiration_ms: i64, now_ms: i64) -> f64 {
    (expiration_ms - now_ms) as f64 / MS_PER_YEAR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_contract_size_defaults_to_one() {
        let json = r#"{
            "instrument_name": "BTC-27JUN25-100000-C",
            "strike": 100000.0,
            "option_type": "call",
            "expiration_timestamp": 1751011200000
        }"#;

        let instrument: Instrument = serde_json::from_str(json).unwrap();
        assert_eq!(instrument.contract_size, 1.0);
        assert_eq!(instrument.option_type, OptionType::Call);
        assert_eq!(instrument.expiration_timestamp, Some(1_751_011_200_000));
    }

    #[test]
    fn test_instrument_missing_expiry() {
        let json = r#"{"instrument_name": "X", "strike": 1.0, "option_type": "put"}"#;
        let instrument: Instrument = serde_json::from_str(json).unwrap();
        assert!(instrument.expiration_timestamp.is_none());
    }

    #[test]
    fn test_time_to_expiry_one_year() {
        let now = 1_700_000_000_000;
        let expiry = now + MS_PER_YEAR as i64;
        assert!((time_to_expiry_years(expiry, now) - 1.0).abs() < 1e-12);
        assert!(time_to_expiry_years(now - 1000, now) < 0.0);
    }
}
