//! Market Data for the GEX service
//!
//! This crate provides the option reference data, ticker inputs and the
//! Greeks calculator the exposure engine consumes.
//!
//! # Core Components
//!
//! - [`types`] - Instruments, tickers, Greeks and Black-Scholes inputs
//! - [`black_scholes`] - Closed-form Black-Scholes Greeks
//! - [`provider`] - Snapshot and ticker provider traits
//! - [`deribit`] - Deribit public REST client
//! - [`static_market`] - In-memory provider for offline runs and tests
//!
//! # Key Invariants
//!
//! - Gamma is non-negative for calls and puts; sign conventions belong to
//!   the aggregation step, not to the data source
//! - Expired or zero-vol inputs produce all-zero Greeks, never NaN
//! - A missing ticker is `Ok(None)`, not an error

pub mod black_scholes;
pub mod deribit;
pub mod error;
pub mod provider;
pub mod static_market;
pub mod types;

pub use deribit::DeribitClient;
pub use error::MarketDataError;
pub use provider::{SnapshotProvider, TickerProvider};
pub use static_market::StaticMarketData;
pub use types::{time_to_expiry_years, BSInputs, Greeks, Instrument, OptionType, Ticker};

pub type Result<T> = std::result::Result<T, MarketDataError>;
