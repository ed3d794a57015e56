//! Gateway wire types and amount conversion

use crate::gateway::error::{GatewayError, GatewayResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Contact details forwarded to the gateway's hosted checkout page.
#[derive(Debug, Clone, Default)]
pub struct PayerContact {
    pub user_ref: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Result of a successful payment initiation.
#[derive(Debug, Clone)]
pub struct PaymentInitiation {
    /// Hosted checkout URL the client redirects the payer to.
    pub redirect_url: String,
    /// The merchant transaction id minted for this attempt.
    pub transaction_id: String,
}

/// The gateway's verdict on a payment attempt.
///
/// `Succeeded` and `Failed` carry the raw gateway payload for the audit
/// trail; `Pending` means ask again later.
#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    Succeeded(JsonValue),
    Pending,
    Failed {
        code: String,
        data: Option<JsonValue>,
    },
}

impl PaymentOutcome {
    pub fn from_envelope(code: &str, success: bool, data: Option<JsonValue>) -> Self {
        if success && code == "PAYMENT_SUCCESS" {
            PaymentOutcome::Succeeded(data.unwrap_or(JsonValue::Null))
        } else if code == "PAYMENT_PENDING" {
            PaymentOutcome::Pending
        } else {
            PaymentOutcome::Failed {
                code: code.to_string(),
                data,
            }
        }
    }
}

/// Response envelope shared by the pay and status endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<JsonValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayData {
    pub instrument_response: InstrumentResponse,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentResponse {
    pub redirect_info: RedirectInfo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectInfo {
    pub url: String,
}

/// Convert a decimal currency amount into the gateway's integer minor
/// units (paise). Half-away-from-zero rounding, so 10.005 becomes 1001.
pub fn to_minor_units(amount: Decimal) -> GatewayResult<i64> {
    if amount <= Decimal::ZERO {
        return Err(GatewayError::Validation {
            message: format!("amount must be positive, got {}", amount),
            field: Some("amount".to_string()),
        });
    }

    (amount * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(GatewayError::Validation {
            message: format!("amount {} overflows minor units", amount),
            field: Some("amount".to_string()),
        })
}
