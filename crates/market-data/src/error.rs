//! Market data error types

use thiserror::Error;

/// Errors that can occur during market data operations
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// Transport-level failure talking to the venue
    #[error("Connection error: {0}")]
    Connection(String),

    /// The venue answered with an error envelope
    #[error("Provider error: {0}")]
    Provider(String),

    /// Invalid symbol
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Data not available
    #[error("Data not available: {0}")]
    DataNotAvailable(String),

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for MarketDataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}
