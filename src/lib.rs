//! Storefront backend library
//!
//! Order/payment backend with a PhonePe-style gateway integration. The
//! reconciliation engine in [`reconcile`] owns every payment state
//! transition; the HTTP surface in [`api`] and the gateway client in
//! [`gateway`] only feed signals into it.

pub mod api;
pub mod config;
pub mod error;
pub mod fulfillment;
pub mod gateway;
pub mod health;
pub mod ledger;
pub mod logging;
pub mod middleware;
pub mod notify;
pub mod reconcile;
