//! HTTP listener configuration

use crate::error::{Result, ServerError};
use axum::http::HeaderValue;
use std::net::SocketAddr;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

/// Where the API listens and which browser origins may call it.
///
/// # Example
///
/// ```
/// use server::config::ServerConfig;
///
/// let config = ServerConfig::new("127.0.0.1", 8000).with_cors(vec!["https://gex.example".into()]);
/// assert_eq!(config.bind_addr().unwrap().port(), 8000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port to bind to; 0 picks an ephemeral port
    pub port: u16,
    /// Allowed CORS origins; `"*"` allows any
    pub cors_allow_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            cors_allow_origins: vec!["*".to_string()],
        }
    }

    pub fn with_cors(mut self, origins: Vec<String>) -> Self {
        self.cors_allow_origins = origins;
        self
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let address = format!("{}:{}", self.host, self.port);
        address
            .parse()
            .map_err(|_| ServerError::InvalidAddress(address))
    }

    /// CORS policy for the configured origins. Unparseable origins are
    /// dropped with a warning.
    pub fn cors_layer(&self) -> CorsLayer {
        let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);

        if self.cors_allow_origins.iter().any(|o| o == "*") {
            return base.allow_origin(Any);
        }

        let origins: Vec<HeaderValue> = self
            .cors_allow_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(%origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        base.allow_origin(AllowOrigin::list(origins))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert_eq!(config.cors_allow_origins, vec!["*"]);
    }

    #[test]
    fn test_bind_addr() {
        let addr = ServerConfig::new("127.0.0.1", 0).bind_addr().unwrap();
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn test_invalid_host() {
        let err = ServerConfig::new("not a host", 80).bind_addr().unwrap_err();
        assert!(matches!(err, ServerError::InvalidAddress(_)));
    }
}
