//! HTTP boundary for the GEX service
//!
//! Exposes the refresh pipeline over Axum with CORS and request tracing,
//! and coordinates graceful shutdown through `CancellationToken`.
//!
//! # Routes
//!
//! - `GET /` - service banner and configured assets
//! - `GET /health` - liveness
//! - `GET /gex?currency=BTC` - latest exposure report
//! - `GET /gex/history?currency=BTC` - retained net exposure points
//!
//! # Modules
//!
//! - [`config`] - Listener address and CORS origins
//! - [`handlers`] - Route handlers and shared state
//! - [`routes`] - Router assembly
//! - [`http`] - Axum server with graceful shutdown
//! - [`shutdown`] - Signal handling

pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod http;
pub mod routes;
pub mod shutdown;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use handlers::ApiState;
pub use health::{HealthState, HealthStatus};
pub use http::HttpServer;
pub use routes::create_router;
pub use shutdown::ShutdownController;
