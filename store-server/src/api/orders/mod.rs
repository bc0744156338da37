//! Order API Module
//!
//! Placement, per-customer listing, admin listing and status management.

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // Place an order (customer)
        .route("/", post(handler::place))
        // Admin listing with status filter and pagination
        .route("/", get(handler::list))
        // Orders of the calling customer
        .route("/mine", get(handler::list_mine))
        // Order detail (owner or admin)
        .route("/{id}", get(handler::get_by_id))
        // Status transition (admin)
        .route("/{id}/status", put(handler::update_status))
}
