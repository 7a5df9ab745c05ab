//! Liveness endpoint state

use axum::{extract::State, response::Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::handlers::ApiState;

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub assets: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct HealthState {
    pub service_name: String,
    pub start_time: Instant,
}

impl HealthState {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// Health check handler for HTTP
pub async fn health_handler(State(state): State<Arc<ApiState>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        service: state.health.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        uptime_seconds: state.health.uptime_seconds(),
        assets: state.assets.clone(),
    })
}
