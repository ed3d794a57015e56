//! Payment lifecycle handlers

use crate::api::AppState;
use crate::error::AppError;
use crate::gateway::PayerContact;
use crate::ledger::Order;
use crate::middleware::error::get_request_id_from_headers;
use crate::reconcile::Reconciliation;
use axum::{extract::State, http::HeaderMap, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct InitiatePaymentRequest {
    pub order_id: String,
    /// Overrides the order total when present (e.g. partial payment links).
    pub amount: Option<Decimal>,
    pub user_ref: Option<String>,
    pub user_email: Option<String>,
    pub user_phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InitiatePaymentResponse {
    pub success: bool,
    pub payment_url: String,
    pub merchant_transaction_id: String,
}

/// POST /api/payments/initiate
pub async fn initiate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<InitiatePaymentRequest>,
) -> Result<Json<InitiatePaymentResponse>, AppError> {
    let request_id = get_request_id_from_headers(&headers);

    if request.order_id.trim().is_empty() {
        return Err(attach(AppError::validation("order_id"), request_id));
    }

    info!(order_id = %request.order_id, "payment initiation requested");

    let payer = PayerContact {
        user_ref: request.user_ref,
        email: request.user_email,
        phone: request.user_phone,
    };

    let initiation = state
        .engine
        .initiate(&request.order_id, request.amount, payer)
        .await
        .map_err(|e| attach(e, request_id))?;

    Ok(Json(InitiatePaymentResponse {
        success: true,
        payment_url: initiation.redirect_url,
        merchant_transaction_id: initiation.transaction_id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PaymentStatusRequest {
    pub order_id: String,
    /// Attempt id handed out at initiation; checked against the stored
    /// attempt when present.
    pub merchant_transaction_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub succeeded: bool,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub order: Order,
}

/// POST /api/payments/status
///
/// Queries the gateway for the order's stored payment attempt and applies
/// whatever verdict comes back.
pub async fn poll_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PaymentStatusRequest>,
) -> Result<Json<PaymentStatusResponse>, AppError> {
    let request_id = get_request_id_from_headers(&headers);

    let reconciliation = state
        .engine
        .poll_status(&request.order_id, request.merchant_transaction_id.as_deref())
        .await
        .map_err(|e| attach(e, request_id))?;

    Ok(Json(status_response(reconciliation)))
}

#[derive(Debug, Deserialize)]
pub struct CancelPaymentRequest {
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct CancelPaymentResponse {
    pub success: bool,
    pub status: String,
}

/// POST /api/payments/cancel
pub async fn cancel(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CancelPaymentRequest>,
) -> Result<Json<CancelPaymentResponse>, AppError> {
    let request_id = get_request_id_from_headers(&headers);

    let reconciliation = state
        .engine
        .cancel(&request.order_id)
        .await
        .map_err(|e| attach(e, request_id))?;

    Ok(Json(CancelPaymentResponse {
        success: true,
        status: reconciliation.order().payment_status.clone(),
    }))
}

fn status_response(reconciliation: Reconciliation) -> PaymentStatusResponse {
    match reconciliation {
        Reconciliation::Succeeded(order) | Reconciliation::AlreadySucceeded(order) => {
            PaymentStatusResponse {
                succeeded: true,
                status: "succeeded".to_string(),
                message: None,
                order,
            }
        }
        Reconciliation::StillPending(order) => PaymentStatusResponse {
            succeeded: false,
            status: "pending".to_string(),
            message: Some("payment is pending".to_string()),
            order,
        },
        Reconciliation::Failed(order) => PaymentStatusResponse {
            succeeded: false,
            status: "failed".to_string(),
            message: None,
            order,
        },
    }
}

fn attach(error: AppError, request_id: Option<String>) -> AppError {
    match request_id {
        Some(id) => error.with_request_id(id),
        None => error,
    }
}
