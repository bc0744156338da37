//! Payment API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use validator::Validate;

use shared::models::Caller;

use crate::core::ServerState;
use crate::payments::{PaymentDetails, PaymentReceipt, PaymentStatusView, RefundReceipt};
use crate::utils::AppResult;

/// Charge request
#[derive(Debug, Deserialize, Validate)]
pub struct ProcessRequest {
    #[validate(length(min = 1, message = "order_id is required"))]
    pub order_id: String,
    #[validate(length(min = 1, message = "payment_method is required"))]
    pub payment_method: String,
    #[serde(default)]
    pub payment_details: PaymentDetails,
}

/// Refund request body
#[derive(Debug, Default, Deserialize)]
pub struct RefundRequest {
    pub reason: Option<String>,
}

/// Charge an order's total through the gateway
pub async fn process(
    State(state): State<ServerState>,
    caller: Caller,
    Json(payload): Json<ProcessRequest>,
) -> AppResult<Json<PaymentReceipt>> {
    payload.validate()?;
    let receipt = state
        .payments
        .apply_payment(
            &caller,
            &payload.order_id,
            &payload.payment_method,
            &payload.payment_details,
        )
        .await?;
    Ok(Json(receipt))
}

/// Payment status of an order
pub async fn status(
    State(state): State<ServerState>,
    caller: Caller,
    Path(order_id): Path<String>,
) -> AppResult<Json<PaymentStatusView>> {
    let view = state.payments.payment_status(&caller, &order_id)?;
    Ok(Json(view))
}

/// Refund a paid order (admin)
pub async fn refund(
    State(state): State<ServerState>,
    caller: Caller,
    Path(order_id): Path<String>,
    payload: Option<Json<RefundRequest>>,
) -> AppResult<Json<RefundReceipt>> {
    let reason = payload.and_then(|Json(body)| body.reason);
    let receipt = state.payments.refund(&caller, &order_id, reason).await?;
    Ok(Json(receipt))
}
