//! HTTP surface
//!
//! Thin handlers over the reconciliation engine. No payment decision is
//! made here; handlers validate shape, delegate, and format responses.

pub mod callback;
pub mod orders;
pub mod payments;

use crate::health::HealthChecker;
use crate::reconcile::ReconciliationEngine;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReconciliationEngine>,
    pub health: HealthChecker,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/health/ready", get(readiness_handler))
        .route("/health/live", get(liveness_handler))
        .route("/api/payments/initiate", post(payments::initiate))
        .route("/api/payments/status", post(payments::poll_status))
        .route("/api/payments/cancel", post(payments::cancel))
        .route("/api/payments/callback", post(callback::handle_callback))
        .route("/api/orders/place-direct", post(orders::place_direct))
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.health.check_health().await;
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

async fn readiness_handler(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.health.check_health().await;
    if status.is_healthy() {
        (StatusCode::OK, Json(serde_json::json!({"ready": true})))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"ready": false})),
        )
    }
}

async fn liveness_handler() -> impl IntoResponse {
    Json(serde_json::json!({"alive": true}))
}
