//! POS payment gateway
//!
//! HTTP surface for the payment rail: drives the encode → transport →
//! decode → record dispatch path and exposes the payment log for post-hoc
//! confirmation and reconciliation triage. Accepts a pre-authorized caller
//! context from the fronting auth layer and never reaches into session
//! state itself.

pub mod config;
pub mod context;
pub mod dispatch;
pub mod errors;
pub mod handlers;
pub mod models;

pub use config::GatewayConfig;
pub use context::{CallerContext, CallerRole};
pub use dispatch::{DispatchRateLimiter, PaymentDispatcher};
pub use errors::{GatewayError, Result};
