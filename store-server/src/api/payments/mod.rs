//! Payment API Module
//!
//! Charging orders, querying payment status and issuing refunds.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Payment router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/payments", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // Charge an order (owner)
        .route("/process", post(handler::process))
        // Payment status of an order (owner or admin)
        .route("/status/{order_id}", get(handler::status))
        // Refund a paid order (admin)
        .route("/refund/{order_id}", post(handler::refund))
}
