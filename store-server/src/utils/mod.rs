//! Utility module
//!
//! # Contents
//!
//! - Error and response types re-exported from `shared::error`
//! - [`logger`] - logging setup

pub mod logger;

pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
