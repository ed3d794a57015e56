//! Hand-rolled test doubles for the reconciliation engine.
//!
//! The in-memory order store reproduces the conditional-update semantics
//! of the Postgres store: terminal transitions only land when the order
//! is still pending at write time.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::types::Json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use storefront_backend::fulfillment::FulfillmentDispatcher;
use storefront_backend::gateway::{
    ChecksumSigner, GatewayError, GatewayResult, PayerContact, PaymentGateway, PaymentInitiation,
    PaymentOutcome,
};
use storefront_backend::ledger::{
    DatabaseError, LedgerResult, LineItem, Order, OrderStore, ProductStore,
};
use storefront_backend::notify::{EmailSender, NotifyError, NotifyResult, PushSender};
use storefront_backend::reconcile::ReconciliationEngine;

pub fn pending_order(order_id: &str) -> Order {
    Order {
        order_id: order_id.to_string(),
        buyer_ref: Some(uuid::Uuid::new_v4()),
        buyer_email: Some("buyer@example.com".to_string()),
        guest_email: None,
        payment_status: "pending".to_string(),
        payment_gateway: None,
        gateway_transaction_id: None,
        gateway_payment_data: None,
        currency: "INR".to_string(),
        total_amount: Decimal::from(100),
        line_items: Json(vec![LineItem {
            product_ref: "sku-1".to_string(),
            quantity: 2,
        }]),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn guest_order(order_id: &str) -> Order {
    let mut order = pending_order(order_id);
    order.buyer_ref = None;
    order.buyer_email = None;
    order.guest_email = Some("guest@example.com".to_string());
    order
}

#[derive(Default)]
pub struct InMemoryOrders {
    orders: Mutex<HashMap<String, Order>>,
}

impl InMemoryOrders {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn insert(&self, order: Order) {
        self.orders
            .lock()
            .await
            .insert(order.order_id.clone(), order);
    }

    pub async fn get(&self, order_id: &str) -> Option<Order> {
        self.orders.lock().await.get(order_id).cloned()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrders {
    async fn find_by_order_id(&self, order_id: &str) -> LedgerResult<Option<Order>> {
        Ok(self.orders.lock().await.get(order_id).cloned())
    }

    async fn find_by_transaction_id(&self, transaction_id: &str) -> LedgerResult<Option<Order>> {
        Ok(self
            .orders
            .lock()
            .await
            .values()
            .find(|o| o.gateway_transaction_id.as_deref() == Some(transaction_id))
            .cloned())
    }

    async fn record_payment_attempt(
        &self,
        order_id: &str,
        transaction_id: &str,
        gateway_label: &str,
    ) -> LedgerResult<Order> {
        let mut orders = self.orders.lock().await;
        let order = orders.get_mut(order_id).ok_or(DatabaseError::NotFound {
            entity: format!("order {}", order_id),
        })?;
        order.gateway_transaction_id = Some(transaction_id.to_string());
        order.payment_gateway = Some(gateway_label.to_string());
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn mark_succeeded_if_pending(
        &self,
        order_id: &str,
        gateway_label: Option<&str>,
        payment_data: JsonValue,
    ) -> LedgerResult<Option<Order>> {
        let mut orders = self.orders.lock().await;
        match orders.get_mut(order_id) {
            Some(order) if order.payment_status == "pending" => {
                order.payment_status = "succeeded".to_string();
                if let Some(label) = gateway_label {
                    order.payment_gateway = Some(label.to_string());
                }
                order.gateway_payment_data = Some(payment_data);
                order.updated_at = Utc::now();
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn mark_failed_if_pending(
        &self,
        order_id: &str,
        failure_data: JsonValue,
    ) -> LedgerResult<Option<Order>> {
        let mut orders = self.orders.lock().await;
        match orders.get_mut(order_id) {
            Some(order) if order.payment_status == "pending" => {
                order.payment_status = "failed".to_string();
                order.gateway_payment_data = Some(failure_data);
                order.updated_at = Utc::now();
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[derive(Default)]
pub struct InMemoryProducts {
    counters: Mutex<HashMap<String, (i32, i32)>>, // (available, sold)
}

impl InMemoryProducts {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn seed(&self, product_ref: &str, available: i32) {
        self.counters
            .lock()
            .await
            .insert(product_ref.to_string(), (available, 0));
    }

    pub async fn sold_count(&self, product_ref: &str) -> i32 {
        self.counters
            .lock()
            .await
            .get(product_ref)
            .map(|(_, sold)| *sold)
            .unwrap_or(0)
    }

    pub async fn available(&self, product_ref: &str) -> i32 {
        self.counters
            .lock()
            .await
            .get(product_ref)
            .map(|(available, _)| *available)
            .unwrap_or(0)
    }
}

#[async_trait]
impl ProductStore for InMemoryProducts {
    async fn apply_fulfillment(&self, product_ref: &str, quantity: i32) -> LedgerResult<()> {
        let mut counters = self.counters.lock().await;
        let entry = counters
            .get_mut(product_ref)
            .ok_or(DatabaseError::NotFound {
                entity: format!("product {}", product_ref),
            })?;
        entry.0 -= quantity;
        entry.1 += quantity;
        Ok(())
    }
}

/// Gateway stub with a scripted status verdict.
pub struct StubGateway {
    outcome: Mutex<PaymentOutcome>,
    fail_create: AtomicBool,
}

impl StubGateway {
    pub fn returning(outcome: PaymentOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(outcome),
            fail_create: AtomicBool::new(false),
        })
    }

    pub async fn set_outcome(&self, outcome: PaymentOutcome) {
        *self.outcome.lock().await = outcome;
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_payment(
        &self,
        _order_id: &str,
        transaction_id: &str,
        _amount: rust_decimal::Decimal,
        _payer: &PayerContact,
    ) -> GatewayResult<PaymentInitiation> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(GatewayError::Network {
                message: "stubbed failure".to_string(),
            });
        }
        Ok(PaymentInitiation {
            redirect_url: format!("https://pay.example.com/{}", transaction_id),
            transaction_id: transaction_id.to_string(),
        })
    }

    async fn query_status(&self, _transaction_id: &str) -> GatewayResult<PaymentOutcome> {
        Ok(self.outcome.lock().await.clone())
    }

    fn label(&self) -> &'static str {
        "PhonePe"
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String)>>, // (recipient, subject)
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, _body_html: &str) -> NotifyResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Network {
                message: "stubbed email failure".to_string(),
            });
        }
        self.sent
            .lock()
            .await
            .push((to.to_string(), subject.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPusher {
    pub sent: Mutex<Vec<String>>, // user_ref
}

impl RecordingPusher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl PushSender for RecordingPusher {
    async fn send(&self, user_ref: &str, _title: &str, _message: &str) -> NotifyResult<()> {
        self.sent.lock().await.push(user_ref.to_string());
        Ok(())
    }
}

pub struct Harness {
    pub engine: Arc<ReconciliationEngine>,
    pub orders: Arc<InMemoryOrders>,
    pub products: Arc<InMemoryProducts>,
    pub gateway: Arc<StubGateway>,
    pub mailer: Arc<RecordingMailer>,
    pub pusher: Arc<RecordingPusher>,
}

pub fn build_engine(gateway_outcome: PaymentOutcome, signer: Option<ChecksumSigner>) -> Harness {
    let orders = InMemoryOrders::new();
    let products = InMemoryProducts::new();
    let gateway = StubGateway::returning(gateway_outcome);
    let mailer = RecordingMailer::new();
    let pusher = RecordingPusher::new();

    let dispatcher = Arc::new(FulfillmentDispatcher::new(
        products.clone(),
        mailer.clone(),
        pusher.clone(),
    ));

    let engine = Arc::new(ReconciliationEngine::new(
        orders.clone(),
        gateway.clone(),
        dispatcher,
        signer,
    ));

    Harness {
        engine,
        orders,
        products,
        gateway,
        mailer,
        pusher,
    }
}
