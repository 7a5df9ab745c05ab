use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use gex_engine::{GexPipeline, GexReport, HistoryPoint};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::health::HealthState;

pub const DEFAULT_CURRENCY: &str = "BTC";

pub struct ApiState {
    pub pipeline: Arc<GexPipeline>,
    pub health: HealthState,
    /// Assets the service answers for, upper-case
    pub assets: Vec<String>,
}

impl ApiState {
    pub fn new(pipeline: Arc<GexPipeline>, service_name: &str, assets: &[String]) -> Self {
        Self {
            pipeline,
            health: HealthState::new(service_name),
            assets: assets.iter().map(|a| a.to_uppercase()).collect(),
        }
    }

    fn resolve(&self, query: &CurrencyQuery) -> Result<String, String> {
        let currency = query
            .currency
            .as_deref()
            .unwrap_or(DEFAULT_CURRENCY)
            .trim()
            .to_uppercase();

        if self.assets.contains(&currency) {
            Ok(currency)
        } else {
            Err(currency)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CurrencyQuery {
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub message: String,
    pub assets: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub currency: String,
    pub points: Vec<HistoryPoint>,
    pub error: Option<String>,
}

fn unsupported(currency: &str) -> String {
    format!("unsupported currency: {}", currency)
}

pub async fn index(State(state): State<Arc<ApiState>>) -> Json<IndexResponse> {
    Json(IndexResponse {
        message: format!("{} GEX API", state.health.service_name),
        assets: state.assets.clone(),
    })
}

/// Latest report for `?currency=` (default BTC). Upstream failures are
/// reported in the body's `error` field with status 200.
pub async fn get_gex(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<CurrencyQuery>,
) -> (StatusCode, Json<GexReport>) {
    match state.resolve(&query) {
        Ok(currency) => {
            let report = state.pipeline.report(&currency).await;
            (StatusCode::OK, Json(report.as_ref().clone()))
        }
        Err(currency) => (
            StatusCode::BAD_REQUEST,
            Json(GexReport::failed(&currency, &unsupported(&currency), Utc::now())),
        ),
    }
}

pub async fn get_history(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<CurrencyQuery>,
) -> (StatusCode, Json<HistoryResponse>) {
    match state.resolve(&query) {
        Ok(currency) => {
            let points = state.pipeline.history(&currency).await;
            (
                StatusCode::OK,
                Json(HistoryResponse {
                    currency,
                    points,
                    error: None,
                }),
            )
        }
        Err(currency) => (
            StatusCode::BAD_REQUEST,
            Json(HistoryResponse {
                error: Some(unsupported(&currency)),
                currency,
                points: Vec::new(),
            }),
        ),
    }
}
