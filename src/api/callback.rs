//! Gateway callback handler
//!
//! The gateway retries callbacks that do not get a 200, so this handler
//! acknowledges everything: malformed bodies, unknown transactions, and
//! internal failures are logged and swallowed. The reconciliation engine
//! makes duplicate delivery harmless, which is what makes the blanket
//! acknowledgement safe.

use crate::api::AppState;
use axum::{extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse, Json};
use tracing::{info, warn};

/// POST /api/payments/callback
pub async fn handle_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let x_verify = headers
        .get("x-verify")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    match state
        .engine
        .process_callback(&body, x_verify.as_deref())
        .await
    {
        Ok(reconciliation) => {
            info!(
                order_id = %reconciliation.order().order_id,
                status = %reconciliation.order().payment_status,
                "callback reconciled"
            );
        }
        Err(e) if e.is_conflict() => {
            // Conflicts are operationally significant (a success arrived
            // for a failed order) but the gateway still gets its ack.
            warn!(error = %e, "callback produced a payment conflict");
        }
        Err(e) => {
            warn!(error = %e, "callback discarded");
        }
    }

    (StatusCode::OK, Json(serde_json::json!({ "success": true })))
}
