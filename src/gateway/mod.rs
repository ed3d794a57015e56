pub mod checksum;
pub mod client;
pub mod error;
pub mod types;

pub use checksum::ChecksumSigner;
pub use client::PhonePeClient;
pub use error::{GatewayError, GatewayResult};
pub use types::{PayerContact, PaymentInitiation, PaymentOutcome};

use async_trait::async_trait;
use rust_decimal::Decimal;

/// Seam between the reconciliation engine and the payment gateway.
///
/// Implementations must not retry on their own; the engine decides when a
/// signal is worth re-querying.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Register a payment attempt with the gateway and return the hosted
    /// checkout URL for the payer.
    async fn create_payment(
        &self,
        order_id: &str,
        transaction_id: &str,
        amount: Decimal,
        payer: &PayerContact,
    ) -> GatewayResult<PaymentInitiation>;

    /// Ask the gateway for the current verdict on a payment attempt.
    async fn query_status(&self, transaction_id: &str) -> GatewayResult<PaymentOutcome>;

    /// Human-readable gateway name recorded on the order.
    fn label(&self) -> &'static str;
}
