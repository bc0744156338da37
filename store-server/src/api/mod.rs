//! API routing module
//!
//! # Structure
//!
//! - [`health`] - health check
//! - [`orders`] - order placement, listing and status management
//! - [`payments`] - payment processing and refunds
//! - [`products`] - product catalog and admin management

pub mod health;
pub mod orders;
pub mod payments;
pub mod products;

// Re-export common types for handlers
pub use crate::utils::{AppError, AppResult};
