//! Product API Module
//!
//! Public catalog reads plus admin-only product management.

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

/// Product router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/products", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // Catalog listing (active products; admins may include inactive)
        .route("/", get(handler::list))
        // Create a product (admin)
        .route("/", post(handler::create))
        // Product detail
        .route("/{id}", get(handler::get_by_id))
        // Partial update (admin)
        .route("/{id}", put(handler::update))
}
