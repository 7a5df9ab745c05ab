use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::*;
use crate::health::health_handler;

pub fn create_router(state: Arc<ApiState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_handler))
        .route("/gex", get(get_gex))
        .route("/gex/history", get(get_history))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
