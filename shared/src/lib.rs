//! Shared types for the store server
//!
//! Common types used across the workspace: unified error codes,
//! API response structures, domain models, and small utilities.

pub mod error;
pub mod extract;
pub mod models;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use models::{Caller, Order, OrderStatus, PaymentStatus, Product};
