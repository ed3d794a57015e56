pub mod engine;
pub mod status;

pub use engine::{Reconciliation, ReconciliationEngine, DIRECT_ORDER_LABEL};
pub use status::PaymentStatus;
