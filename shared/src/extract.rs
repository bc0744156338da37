//! Caller Extractor
//!
//! Resolves the request [`Caller`] from trusted headers set by the front
//! proxy, which terminates authentication and forwards identity downstream.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::{AppError, ErrorCode};
use crate::models::Caller;

/// Header naming the caller's role (`customer` or `admin`)
pub const CALLER_ROLE_HEADER: &str = "x-caller-role";
/// Header carrying the customer id; required for the customer role
pub const CALLER_ID_HEADER: &str = "x-caller-id";

/// Caller Extractor
///
/// Use this extractor in handlers to resolve the authenticated caller.
/// A missing role header defaults to `customer`.
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Check if already extracted (from middleware)
        if let Some(caller) = parts.extensions.get::<Caller>() {
            return Ok(caller.clone());
        }

        let role = parts
            .headers
            .get(CALLER_ROLE_HEADER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("customer");

        let caller = match role {
            "admin" => Caller::Admin,
            "customer" => {
                let id = parts
                    .headers
                    .get(CALLER_ID_HEADER)
                    .and_then(|h| h.to_str().ok())
                    .filter(|id| !id.is_empty());
                match id {
                    Some(id) => Caller::customer(id),
                    None => {
                        tracing::warn!(uri = %parts.uri, "Request without caller id");
                        return Err(AppError::not_authenticated());
                    }
                }
            }
            other => {
                tracing::warn!(uri = %parts.uri, role = %other, "Unknown caller role");
                return Err(AppError::new(ErrorCode::InvalidRole)
                    .with_detail("role", serde_json::json!(other)));
            }
        };

        // Store in extensions for potential reuse
        parts.extensions.insert(caller.clone());

        Ok(caller)
    }
}
