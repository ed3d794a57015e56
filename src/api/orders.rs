//! Direct order placement

use crate::api::AppState;
use crate::error::AppError;
use crate::ledger::Order;
use crate::middleware::error::get_request_id_from_headers;
use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct PlaceDirectRequest {
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct PlaceDirectResponse {
    pub success: bool,
    pub order: Order,
}

/// POST /api/orders/place-direct
///
/// Settles an order without a payment leg (cash on delivery and the
/// like). Runs the same fulfillment path as a gateway success.
pub async fn place_direct(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PlaceDirectRequest>,
) -> Result<Json<PlaceDirectResponse>, AppError> {
    let request_id = get_request_id_from_headers(&headers);

    info!(order_id = %request.order_id, "direct placement requested");

    let reconciliation = state
        .engine
        .place_direct(&request.order_id)
        .await
        .map_err(|e| match request_id {
            Some(id) => e.with_request_id(id),
            None => e,
        })?;

    Ok(Json(PlaceDirectResponse {
        success: true,
        order: reconciliation.order().clone(),
    }))
}
