//! Payment processing
//!
//! [`gateway`] defines the external-gateway capability and the deterministic
//! stub used outside of tests; [`processor`] applies charges and refunds to
//! orders with idempotency and authorization checks.

pub mod gateway;
pub mod processor;

pub use gateway::{ChargeOutcome, MockGateway, PaymentDetails, PaymentGateway, RefundOutcome};
pub use processor::{PaymentProcessor, PaymentReceipt, PaymentStatusView, RefundReceipt};
