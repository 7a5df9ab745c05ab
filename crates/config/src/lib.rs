//! Configuration model for the GEX service.
//!
//! The file is YAML; every section and field has a default so an empty file
//! is a valid configuration. `${VAR}` placeholders are substituted from the
//! environment before parsing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GexConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub history: HistorySection,
    #[serde(default)]
    pub metrics: MetricsSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
    /// pretty | json | compact
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default = "default_cors_origins")]
    pub cors_allow_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_http_port(),
            cors_allow_origins: default_cors_origins(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Deribit,
    Static,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Market snapshot served by the `static` provider
    #[serde(default)]
    pub static_market: Option<StaticMarketConfig>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            static_market: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StaticMarketConfig {
    /// Spot price per asset symbol
    #[serde(default)]
    pub spot_prices: HashMap<String, f64>,
    /// Option contracts (with their ticker values) per asset symbol
    #[serde(default)]
    pub options: HashMap<String, Vec<StaticOptionConfig>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticOptionConfig {
    pub instrument_name: String,
    pub strike: f64,
    /// call | put
    pub option_type: String,
    pub expiration_timestamp: i64,
    #[serde(default = "default_contract_size")]
    pub contract_size: f64,
    #[serde(default)]
    pub open_interest: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub mark_iv: Option<f64>,
    #[serde(default)]
    pub gamma: Option<f64>,
}

/// Where per-instrument gamma comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GreeksSourceKind {
    /// Closed-form Black-Scholes from the ticker's mark IV
    #[default]
    BlackScholes,
    /// Gamma as reported by the exchange
    Exchange,
}

/// Which single expiry a refresh analyses.
///
/// Exposure is only ever computed for one expiry at a time; this names the
/// policy so the choice is explicit rather than implied by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirySelection {
    /// The earliest expiry listed
    #[default]
    Nearest,
    /// The k-th earliest expiry (0 = nearest)
    Nth(usize),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSection {
    #[serde(default = "default_assets")]
    pub assets: Vec<String>,
    #[serde(default)]
    pub greeks_source: GreeksSourceKind,
    #[serde(default)]
    pub risk_free_rate: f64,
    #[serde(default = "default_scaling_constant")]
    pub scaling_constant: f64,
    #[serde(default)]
    pub expiry_selection: ExpirySelection,
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            assets: default_assets(),
            greeks_source: GreeksSourceKind::default(),
            risk_free_rate: 0.0,
            scaling_constant: default_scaling_constant(),
            expiry_selection: ExpirySelection::default(),
            fetch_concurrency: default_fetch_concurrency(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            cache_ttl_seconds: default_cache_ttl_seconds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistorySection {
    #[serde(default = "default_retention_minutes")]
    pub retention_minutes: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            retention_minutes: default_retention_minutes(),
            max_entries: default_max_entries(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}
