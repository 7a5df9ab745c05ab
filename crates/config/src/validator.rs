use crate::*;
use thiserror::Error;

/// Longest momentum lookback window, in minutes.
pub const LONGEST_LOOKBACK_MINUTES: u64 = 30;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("No assets configured")]
    NoAssets,

    #[error("Asset symbol '{0}' is invalid: must be non-empty alphanumeric")]
    InvalidAssetSymbol(String),

    #[error("Duplicate asset '{0}'")]
    DuplicateAsset(String),

    #[error("{field} must be a positive integer")]
    InvalidPositiveInteger { field: String },

    #[error("{field} must be a finite non-negative number, got {value}")]
    InvalidNonNegative { field: String, value: f64 },

    #[error("history.retention_minutes ({0}) must exceed the longest lookback of 30 minutes")]
    RetentionTooShort(u64),

    #[error(
        "history.max_entries ({max_entries}) at one entry per {cache_ttl_seconds}s spans less than history.retention_minutes ({retention_minutes})"
    )]
    HistoryCapTooSmall {
        max_entries: usize,
        cache_ttl_seconds: u64,
        retention_minutes: u64,
    },

    #[error("Invalid log format: {0}. Must be one of: pretty, json, compact")]
    InvalidLogFormat(String),

    #[error("Invalid upstream base_url '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("Static provider selected but upstream.static_market is missing")]
    MissingStaticMarket,

    #[error("Static market has no spot price for asset '{0}'")]
    MissingStaticSpot(String),

    #[error("Static option '{name}': {message}")]
    InvalidStaticOption { name: String, message: String },

    #[error("Metrics port and server port are both {0}")]
    PortConflict(u16),
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DefaultApplied {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub defaults_applied: Vec<DefaultApplied>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_default(&mut self, field: &str, value: &str) {
        self.defaults_applied.push(DefaultApplied {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

pub fn validate_config(config: &GexConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_service(&config.service, &mut report);
    validate_engine(&config.engine, &mut report);
    validate_upstream(&config.upstream, &config.engine, &mut report);
    validate_history(&config.history, &config.engine, &mut report);

    if config.metrics.enabled && config.metrics.port == config.server.port {
        report.add_error(ValidationError::PortConflict(config.server.port));
    }

    report
}

fn validate_service(service: &ServiceConfig, report: &mut ValidationReport) {
    if !["pretty", "json", "compact"].contains(&service.log_format.to_lowercase().as_str()) {
        report.add_error(ValidationError::InvalidLogFormat(service.log_format.clone()));
    }
}

fn validate_engine(engine: &EngineSection, report: &mut ValidationReport) {
    if engine.assets.is_empty() {
        report.add_error(ValidationError::NoAssets);
    }

    let mut seen = std::collections::HashSet::new();
    for asset in &engine.assets {
        if asset.is_empty() || !asset.chars().all(|c| c.is_ascii_alphanumeric()) {
            report.add_error(ValidationError::InvalidAssetSymbol(asset.clone()));
        }
        if !seen.insert(asset.to_uppercase()) {
            report.add_error(ValidationError::DuplicateAsset(asset.clone()));
        }
    }

    if engine.fetch_concurrency == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "engine.fetch_concurrency".to_string(),
        });
    }
    if engine.fetch_timeout_ms == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "engine.fetch_timeout_ms".to_string(),
        });
    }
    if engine.cache_ttl_seconds == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "engine.cache_ttl_seconds".to_string(),
        });
    } else if engine.cache_ttl_seconds > 300 {
        report.add_warning(
            "engine.cache_ttl_seconds",
            "TTL above 5 minutes makes the 1min/5min momentum windows stale",
        );
    }

    if !(engine.scaling_constant.is_finite() && engine.scaling_constant >= 0.0) {
        report.add_error(ValidationError::InvalidNonNegative {
            field: "engine.scaling_constant".to_string(),
            value: engine.scaling_constant,
        });
    }
    if !engine.risk_free_rate.is_finite() {
        report.add_error(ValidationError::InvalidNonNegative {
            field: "engine.risk_free_rate".to_string(),
            value: engine.risk_free_rate,
        });
    }

    if engine.greeks_source == GreeksSourceKind::BlackScholes {
        report.add_default("engine.greeks_source", "black_scholes");
    }
    if engine.expiry_selection == ExpirySelection::Nearest {
        report.add_default("engine.expiry_selection", "nearest");
    }
}

fn validate_upstream(upstream: &UpstreamConfig, engine: &EngineSection, report: &mut ValidationReport) {
    if upstream.request_timeout_ms == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "upstream.request_timeout_ms".to_string(),
        });
    }

    match upstream.provider {
        ProviderKind::Deribit => {
            if let Err(e) = url::Url::parse(&upstream.base_url) {
                report.add_error(ValidationError::InvalidBaseUrl {
                    url: upstream.base_url.clone(),
                    message: e.to_string(),
                });
            }
            if upstream.static_market.is_some() {
                report.add_warning(
                    "upstream.static_market",
                    "ignored because provider is deribit",
                );
            }
        }
        ProviderKind::Static => {
            let Some(market) = &upstream.static_market else {
                report.add_error(ValidationError::MissingStaticMarket);
                return;
            };
            for asset in &engine.assets {
                if !market.spot_prices.contains_key(&asset.to_uppercase()) {
                    report.add_error(ValidationError::MissingStaticSpot(asset.clone()));
                }
            }
            for option in market.options.values().flatten() {
                if !["call", "put"].contains(&option.option_type.to_lowercase().as_str()) {
                    report.add_error(ValidationError::InvalidStaticOption {
                        name: option.instrument_name.clone(),
                        message: format!("option_type '{}' must be call or put", option.option_type),
                    });
                }
                if !(option.strike.is_finite() && option.strike > 0.0) {
                    report.add_error(ValidationError::InvalidStaticOption {
                        name: option.instrument_name.clone(),
                        message: "strike must be positive".to_string(),
                    });
                }
            }
        }
    }
}

/// History is written once per cache miss, so the count cap covers at most
/// `max_entries * cache_ttl_seconds` of wall time.
fn validate_history(history: &HistorySection, engine: &EngineSection, report: &mut ValidationReport) {
    if history.retention_minutes <= LONGEST_LOOKBACK_MINUTES {
        report.add_error(ValidationError::RetentionTooShort(history.retention_minutes));
    }
    if history.max_entries == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "history.max_entries".to_string(),
        });
        return;
    }
    if engine.cache_ttl_seconds == 0 {
        return;
    }

    let spanned_secs = (history.max_entries as u64).saturating_mul(engine.cache_ttl_seconds);
    if spanned_secs < history.retention_minutes.saturating_mul(60) {
        report.add_error(ValidationError::HistoryCapTooSmall {
            max_entries: history.max_entries,
            cache_ttl_seconds: engine.cache_ttl_seconds,
            retention_minutes: history.retention_minutes,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let report = validate_config(&GexConfig::default());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert!(!report.defaults_applied.is_empty());
    }

    #[test]
    fn test_empty_assets_rejected() {
        let mut config = GexConfig::default();
        config.engine.assets.clear();
        let report = validate_config(&config);
        assert!(report.errors.contains(&ValidationError::NoAssets));
    }

    #[test]
    fn test_duplicate_and_bad_assets() {
        let mut config = GexConfig::default();
        config.engine.assets = vec!["BTC".into(), "btc".into(), "ET H".into()];
        let report = validate_config(&config);
        assert!(report.errors.contains(&ValidationError::DuplicateAsset("btc".into())));
        assert!(report.errors.contains(&ValidationError::InvalidAssetSymbol("ET H".into())));
    }

    #[test]
    fn test_retention_must_cover_longest_lookback() {
        let mut config = GexConfig::default();
        config.history.retention_minutes = 30;
        let report = validate_config(&config);
        assert!(report.errors.contains(&ValidationError::RetentionTooShort(30)));
    }

    #[test]
    fn test_count_cap_must_span_retention() {
        let mut config = GexConfig::default();
        config.engine.cache_ttl_seconds = 1;
        config.history.max_entries = 600;
        let report = validate_config(&config);
        assert_eq!(
            report.errors,
            vec![ValidationError::HistoryCapTooSmall {
                max_entries: 600,
                cache_ttl_seconds: 1,
                retention_minutes: 35,
            }]
        );

        config.history.max_entries = 35 * 60;
        assert!(validate_config(&config).is_valid());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = GexConfig::default();
        config.engine.fetch_concurrency = 0;
        assert!(!validate_config(&config).is_valid());
    }

    #[test]
    fn test_static_provider_requires_market() {
        let mut config = GexConfig::default();
        config.upstream.provider = ProviderKind::Static;
        let report = validate_config(&config);
        assert!(report.errors.contains(&ValidationError::MissingStaticMarket));

        let mut market = StaticMarketConfig::default();
        market.spot_prices.insert("BTC".into(), 65000.0);
        config.upstream.static_market = Some(market);
        let report = validate_config(&config);
        assert!(report.errors.contains(&ValidationError::MissingStaticSpot("ETH".into())));
    }

    #[test]
    fn test_bad_base_url() {
        let mut config = GexConfig::default();
        config.upstream.base_url = "not a url".into();
        let report = validate_config(&config);
        assert!(matches!(
            report.errors.as_slice(),
            [ValidationError::InvalidBaseUrl { .. }]
        ));
    }

    #[test]
    fn test_long_ttl_warns() {
        let mut config = GexConfig::default();
        config.engine.cache_ttl_seconds = 600;
        let report = validate_config(&config);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
    }
}
