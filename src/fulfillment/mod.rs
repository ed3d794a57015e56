//! Fulfillment effects dispatcher
//!
//! Runs exactly once per order, strictly after the reconciliation engine
//! wins the transition to `succeeded`. Effects are best-effort from here
//! on: money has already moved, so a failed stock update or notification
//! is logged and reported, never used to roll the payment back.

use crate::ledger::{Order, ProductStore};
use crate::notify::{EmailSender, PushSender};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct FulfillmentDispatcher {
    products: Arc<dyn ProductStore>,
    email: Arc<dyn EmailSender>,
    push: Arc<dyn PushSender>,
}

/// What actually happened during a dispatch, for logging and diagnostics.
#[derive(Debug, Default)]
pub struct FulfillmentReport {
    pub stock_lines_applied: usize,
    pub stock_failures: Vec<String>,
    pub email_sent: bool,
    pub push_sent: bool,
    pub notification_failures: Vec<String>,
}

impl FulfillmentReport {
    pub fn is_clean(&self) -> bool {
        self.stock_failures.is_empty() && self.notification_failures.is_empty()
    }
}

impl FulfillmentDispatcher {
    pub fn new(
        products: Arc<dyn ProductStore>,
        email: Arc<dyn EmailSender>,
        push: Arc<dyn PushSender>,
    ) -> Self {
        Self {
            products,
            email,
            push,
        }
    }

    pub async fn dispatch(&self, order: &Order) -> FulfillmentReport {
        let mut report = FulfillmentReport::default();

        for line in order.line_items.iter() {
            match self
                .products
                .apply_fulfillment(&line.product_ref, line.quantity)
                .await
            {
                Ok(()) => report.stock_lines_applied += 1,
                Err(e) => {
                    error!(
                        order_id = %order.order_id,
                        product_ref = %line.product_ref,
                        error = %e,
                        "stock update failed during fulfillment"
                    );
                    report.stock_failures.push(format!("{}: {}", line.product_ref, e));
                }
            }
        }

        self.notify(order, &mut report).await;

        if report.is_clean() {
            info!(
                order_id = %order.order_id,
                lines = report.stock_lines_applied,
                "fulfillment dispatched"
            );
        } else {
            warn!(
                order_id = %order.order_id,
                stock_failures = report.stock_failures.len(),
                notification_failures = report.notification_failures.len(),
                "fulfillment dispatched with partial failures"
            );
        }

        report
    }

    async fn notify(&self, order: &Order, report: &mut FulfillmentReport) {
        let subject = format!("Order {} confirmed", order.order_id);
        let body = format!(
            "<p>Your order <strong>{}</strong> has been confirmed. Thank you for shopping with us!</p>",
            order.order_id
        );

        match (&order.buyer_ref, &order.buyer_email, &order.guest_email) {
            // Registered buyer: email and push, joined with all-settled
            // semantics so one failed channel never starves the other.
            (Some(buyer_ref), Some(buyer_email), _) => {
                let push_target = buyer_ref.to_string();
                let push_message = format!("Your order {} is confirmed", order.order_id);

                let email_fut = self.email.send(buyer_email, &subject, &body);
                let push_fut = self.push.send(&push_target, "Order confirmed", &push_message);

                let (email_result, push_result) = tokio::join!(email_fut, push_fut);

                match email_result {
                    Ok(()) => report.email_sent = true,
                    Err(e) => {
                        warn!(order_id = %order.order_id, error = %e, "confirmation email failed");
                        report.notification_failures.push(format!("email: {}", e));
                    }
                }
                match push_result {
                    Ok(()) => report.push_sent = true,
                    Err(e) => {
                        warn!(order_id = %order.order_id, error = %e, "confirmation push failed");
                        report.notification_failures.push(format!("push: {}", e));
                    }
                }
            }
            // Guest checkout: email only.
            (_, _, Some(guest_email)) => match self.email.send(guest_email, &subject, &body).await {
                Ok(()) => report.email_sent = true,
                Err(e) => {
                    warn!(order_id = %order.order_id, error = %e, "guest confirmation email failed");
                    report.notification_failures.push(format!("email: {}", e));
                }
            },
            _ => {
                warn!(
                    order_id = %order.order_id,
                    "no contact details on order; skipping confirmation"
                );
            }
        }
    }
}
