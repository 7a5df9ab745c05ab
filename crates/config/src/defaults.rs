pub fn default_service_name() -> String {
    "gexd".to_string()
}

pub fn default_log_format() -> String {
    "pretty".to_string()
}

pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_http_port() -> u16 {
    8000
}

pub fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

pub fn default_base_url() -> String {
    "https://www.deribit.com/api/v2".to_string()
}

pub fn default_request_timeout_ms() -> u64 {
    5000
}

pub fn default_contract_size() -> f64 {
    1.0
}

pub fn default_assets() -> Vec<String> {
    vec!["BTC".to_string(), "ETH".to_string()]
}

/// Multiplier in `gamma * weight * spot² * contract_size * k / 1e6`.
pub fn default_scaling_constant() -> f64 {
    100.0
}

pub fn default_fetch_concurrency() -> usize {
    16
}

pub fn default_fetch_timeout_ms() -> u64 {
    3000
}

pub fn default_cache_ttl_seconds() -> u64 {
    30
}

/// Longest momentum lookback (30 min) plus five minutes of slack.
pub fn default_retention_minutes() -> u64 {
    35
}

pub fn default_max_entries() -> usize {
    600
}

pub fn default_metrics_port() -> u16 {
    9090
}
