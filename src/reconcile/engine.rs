//! Reconciliation engine
//!
//! The only component allowed to move an order's payment state. Five
//! entry points feed it: payment initiation, status polling, gateway
//! callbacks, cancellation, and direct placement. Every signal, live or
//! stale, funnels through [`ReconciliationEngine::apply_outcome`], which
//! decides against the order's current state and the store's conditional
//! update whether anything happens.
//!
//! Fulfillment is gated strictly behind winning the conditional update:
//! a caller that loses the race re-reads and lands in the no-op branch,
//! so effects run at most once per order no matter how many success
//! signals arrive.

use crate::error::{AppError, AppErrorKind, AppResult, InfrastructureError};
use crate::fulfillment::FulfillmentDispatcher;
use crate::gateway::{ChecksumSigner, PayerContact, PaymentGateway, PaymentInitiation, PaymentOutcome};
use crate::ledger::{Order, OrderStore};
use crate::reconcile::status::PaymentStatus;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

/// Gateway label recorded on orders placed without a payment leg.
pub const DIRECT_ORDER_LABEL: &str = "Direct Order (No Payment)";

/// Result of pushing one payment signal through the engine.
#[derive(Debug)]
pub enum Reconciliation {
    /// This call won the transition to succeeded; fulfillment ran.
    Succeeded(Order),
    /// The order was already succeeded; the signal was a duplicate no-op.
    AlreadySucceeded(Order),
    /// The gateway has not settled yet; nothing changed.
    StillPending(Order),
    /// The order is settled as failed (by this call or an earlier one).
    Failed(Order),
}

impl Reconciliation {
    pub fn order(&self) -> &Order {
        match self {
            Reconciliation::Succeeded(o)
            | Reconciliation::AlreadySucceeded(o)
            | Reconciliation::StillPending(o)
            | Reconciliation::Failed(o) => o,
        }
    }
}

pub struct ReconciliationEngine {
    orders: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
    fulfillment: Arc<FulfillmentDispatcher>,
    /// Set when incoming callback bodies must carry a valid X-VERIFY.
    callback_signer: Option<ChecksumSigner>,
}

impl ReconciliationEngine {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        gateway: Arc<dyn PaymentGateway>,
        fulfillment: Arc<FulfillmentDispatcher>,
        callback_signer: Option<ChecksumSigner>,
    ) -> Self {
        Self {
            orders,
            gateway,
            fulfillment,
            callback_signer,
        }
    }

    fn current_status(order: &Order) -> AppResult<PaymentStatus> {
        PaymentStatus::from_db_status(&order.payment_status).ok_or_else(|| {
            AppError::new(AppErrorKind::Infrastructure(InfrastructureError::Database {
                message: format!(
                    "order {} carries unknown payment status '{}'",
                    order.order_id, order.payment_status
                ),
                is_retryable: false,
            }))
        })
    }

    async fn load_order(&self, order_id: &str) -> AppResult<Order> {
        self.orders
            .find_by_order_id(order_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::order_not_found(order_id))
    }

    /// The single authoritative transition function.
    ///
    /// `attempt_id`, when given, must match the transaction id stored on
    /// the order; a mismatch means the signal belongs to a superseded
    /// payment attempt and is rejected as a conflict.
    pub async fn apply_outcome(
        &self,
        order: Order,
        outcome: PaymentOutcome,
        attempt_id: Option<&str>,
        gateway_label: Option<&str>,
    ) -> AppResult<Reconciliation> {
        if let Some(attempt) = attempt_id {
            if order.gateway_transaction_id.as_deref() != Some(attempt) {
                return Err(AppError::conflict(
                    &order.order_id,
                    format!(
                        "signal for superseded payment attempt '{}' ignored",
                        attempt
                    ),
                ));
            }
        }

        let current = Self::current_status(&order)?;

        match (current, outcome) {
            // Success is absorbing: any further signal, success or failure,
            // is a duplicate and must not re-run effects.
            (PaymentStatus::Succeeded, _) => {
                info!(order_id = %order.order_id, "signal for already-succeeded order ignored");
                Ok(Reconciliation::AlreadySucceeded(order))
            }

            // A success signal arriving after the order settled as failed
            // is an operational contradiction, not something to paper over.
            (PaymentStatus::Failed, PaymentOutcome::Succeeded(_)) => Err(AppError::conflict(
                &order.order_id,
                "success reported for an order already settled as failed",
            )),

            (PaymentStatus::Failed, _) => Ok(Reconciliation::Failed(order)),

            (PaymentStatus::Pending, PaymentOutcome::Pending) => {
                Ok(Reconciliation::StillPending(order))
            }

            (PaymentStatus::Pending, PaymentOutcome::Succeeded(data)) => {
                self.settle_succeeded(order, data, gateway_label).await
            }

            (PaymentStatus::Pending, PaymentOutcome::Failed { code, data }) => {
                self.settle_failed(order, code, data).await
            }
        }
    }

    async fn settle_succeeded(
        &self,
        order: Order,
        payment_data: serde_json::Value,
        gateway_label: Option<&str>,
    ) -> AppResult<Reconciliation> {
        let won = self
            .orders
            .mark_succeeded_if_pending(&order.order_id, gateway_label, payment_data)
            .await
            .map_err(AppError::from)?;

        match won {
            Some(updated) => {
                info!(order_id = %updated.order_id, "payment succeeded, dispatching fulfillment");
                let report = self.fulfillment.dispatch(&updated).await;
                if !report.is_clean() {
                    warn!(
                        order_id = %updated.order_id,
                        "fulfillment completed with partial failures; payment stands"
                    );
                }
                Ok(Reconciliation::Succeeded(updated))
            }
            // Lost the conditional update: another writer settled the order
            // between our read and our write. Re-read and judge again.
            None => {
                let settled = self.load_order(&order.order_id).await?;
                match Self::current_status(&settled)? {
                    PaymentStatus::Succeeded => {
                        info!(
                            order_id = %settled.order_id,
                            "concurrent writer already marked order succeeded"
                        );
                        Ok(Reconciliation::AlreadySucceeded(settled))
                    }
                    PaymentStatus::Failed => Err(AppError::conflict(
                        &settled.order_id,
                        "success reported for an order already settled as failed",
                    )),
                    PaymentStatus::Pending => Err(AppError::new(AppErrorKind::Infrastructure(
                        InfrastructureError::Database {
                            message: format!(
                                "conditional update missed but order {} still pending",
                                settled.order_id
                            ),
                            is_retryable: true,
                        },
                    ))),
                }
            }
        }
    }

    async fn settle_failed(
        &self,
        order: Order,
        code: String,
        data: Option<serde_json::Value>,
    ) -> AppResult<Reconciliation> {
        let failure_data = serde_json::json!({
            "code": code.as_str(),
            "data": data,
            "recorded_at": Utc::now().to_rfc3339(),
        });

        let won = self
            .orders
            .mark_failed_if_pending(&order.order_id, failure_data)
            .await
            .map_err(AppError::from)?;

        match won {
            Some(updated) => {
                info!(order_id = %updated.order_id, code = %code, "payment settled as failed");
                Ok(Reconciliation::Failed(updated))
            }
            None => {
                let settled = self.load_order(&order.order_id).await?;
                match Self::current_status(&settled)? {
                    // A concurrent success wins; this failure signal was stale.
                    PaymentStatus::Succeeded => {
                        info!(
                            order_id = %settled.order_id,
                            "stale failure signal dropped, order already succeeded"
                        );
                        Ok(Reconciliation::AlreadySucceeded(settled))
                    }
                    PaymentStatus::Failed => Ok(Reconciliation::Failed(settled)),
                    PaymentStatus::Pending => Err(AppError::new(AppErrorKind::Infrastructure(
                        InfrastructureError::Database {
                            message: format!(
                                "conditional update missed but order {} still pending",
                                settled.order_id
                            ),
                            is_retryable: true,
                        },
                    ))),
                }
            }
        }
    }

    /// Entry point 1: start a payment attempt with the gateway.
    pub async fn initiate(
        &self,
        order_id: &str,
        amount: Option<Decimal>,
        payer: PayerContact,
    ) -> AppResult<PaymentInitiation> {
        let order = self.load_order(order_id).await?;

        if Self::current_status(&order)?.is_terminal() {
            return Err(AppError::conflict(
                order_id,
                format!(
                    "cannot initiate payment for order in state '{}'",
                    order.payment_status
                ),
            ));
        }

        let amount = amount.unwrap_or(order.total_amount);
        let transaction_id = format!("{}_{}", order_id, Utc::now().timestamp_millis());

        let initiation = self
            .gateway
            .create_payment(order_id, &transaction_id, amount, &payer)
            .await
            .map_err(AppError::from)?;

        // Persist the attempt so later signals can be matched to it. The
        // payment status stays pending until the gateway settles.
        self.orders
            .record_payment_attempt(order_id, &transaction_id, self.gateway.label())
            .await
            .map_err(AppError::from)?;

        info!(
            order_id = %order_id,
            transaction_id = %transaction_id,
            "payment attempt recorded"
        );

        Ok(initiation)
    }

    /// Entry point 2: ask the gateway for the verdict on the order's
    /// stored payment attempt.
    ///
    /// A client may echo back the attempt id it was handed at initiation;
    /// if it no longer matches the attempt stored on the order, the poll
    /// concerns a superseded attempt and is rejected as a conflict.
    pub async fn poll_status(
        &self,
        order_id: &str,
        attempt_id: Option<&str>,
    ) -> AppResult<Reconciliation> {
        let order = self.load_order(order_id).await?;

        if let Some(requested) = attempt_id {
            if order.gateway_transaction_id.as_deref() != Some(requested) {
                return Err(AppError::conflict(
                    order_id,
                    format!(
                        "status requested for superseded payment attempt '{}'",
                        requested
                    ),
                ));
            }
        }

        if Self::current_status(&order)? == PaymentStatus::Succeeded {
            return Ok(Reconciliation::AlreadySucceeded(order));
        }

        let transaction_id = order
            .gateway_transaction_id
            .clone()
            .ok_or_else(|| AppError::validation("gateway_transaction_id"))?;

        let outcome = self
            .gateway
            .query_status(&transaction_id)
            .await
            .map_err(AppError::from)?;

        let label = self.gateway.label();
        self.apply_outcome(order, outcome, Some(&transaction_id), Some(label))
            .await
    }

    /// Entry point 3: absorb a server-to-server callback.
    ///
    /// The embedded verdict is trusted as-is (no re-query); delivery may
    /// arrive late, duplicated, or out of order, and the transition rules
    /// absorb all of that. Errors bubble up for logging, but the HTTP
    /// layer acknowledges the gateway regardless.
    pub async fn process_callback(
        &self,
        raw_body: &str,
        x_verify: Option<&str>,
    ) -> AppResult<Reconciliation> {
        if let Some(signer) = &self.callback_signer {
            let valid = x_verify
                .map(|header| signer.verify_callback(raw_body, header))
                .unwrap_or(false);
            if !valid {
                warn!("callback rejected: X-VERIFY missing or invalid");
                return Err(AppError::new(AppErrorKind::Validation(
                    crate::error::ValidationError::MalformedPayload {
                        reason: "callback checksum verification failed".to_string(),
                    },
                )));
            }
        }

        let envelope: crate::gateway::types::GatewayEnvelope = serde_json::from_str(raw_body)
            .map_err(|e| {
                AppError::new(AppErrorKind::Validation(
                    crate::error::ValidationError::MalformedPayload {
                        reason: format!("unparseable callback body: {}", e),
                    },
                ))
            })?;

        let transaction_id = envelope
            .data
            .as_ref()
            .and_then(|d| d.get("merchantTransactionId"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::validation("merchantTransactionId"))?;

        let order = self
            .orders
            .find_by_transaction_id(&transaction_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| {
                warn!(transaction_id = %transaction_id, "callback for unknown transaction");
                AppError::order_not_found(&transaction_id)
            })?;

        let outcome =
            PaymentOutcome::from_envelope(&envelope.code, envelope.success, envelope.data);

        self.apply_outcome(order, outcome, None, None).await
    }

    /// Entry point 4: buyer-driven cancellation, a synthetic failure.
    pub async fn cancel(&self, order_id: &str) -> AppResult<Reconciliation> {
        let order = self.load_order(order_id).await?;

        // A paid order cannot be un-fulfilled by cancelling it.
        if Self::current_status(&order)? == PaymentStatus::Succeeded {
            return Err(AppError::conflict(
                order_id,
                "cannot cancel an order whose payment already succeeded",
            ));
        }

        self.apply_outcome(
            order,
            PaymentOutcome::Failed {
                code: "USER_CANCELLED".to_string(),
                data: None,
            },
            None,
            None,
        )
        .await
    }

    /// Entry point 5: place an order with no payment leg, a synthetic
    /// success that still runs fulfillment exactly once.
    pub async fn place_direct(&self, order_id: &str) -> AppResult<Reconciliation> {
        let order = self.load_order(order_id).await?;

        self.apply_outcome(
            order,
            PaymentOutcome::Succeeded(serde_json::json!({ "method": "direct" })),
            None,
            Some(DIRECT_ORDER_LABEL),
        )
        .await
    }
}
