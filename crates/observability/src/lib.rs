//! Observability infrastructure for the GEX service
//!
//! This crate provides:
//! - Structured logging via tracing
//! - Prometheus exporter setup
//! - Pipeline metric handles
//!
//! # Quick Start
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! init_logging("gexd", LogFormat::Pretty)?;
//! observability::init_metrics(9090)?;
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{init_metrics, PipelineMetrics};
