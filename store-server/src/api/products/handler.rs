//! Product API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use shared::models::{Caller, NewProduct, Product, ProductPatch};

use crate::core::ServerState;
use crate::orders::StorageError;
use crate::utils::{AppError, AppResult, ErrorCode};

/// Query params for the catalog listing
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Include inactive products (admin only)
    #[serde(default)]
    pub include_inactive: bool,
}

fn check_price(price: Decimal) -> AppResult<()> {
    if price < Decimal::ZERO {
        return Err(AppError::with_message(
            ErrorCode::ProductInvalidPrice,
            "price must not be negative",
        ));
    }
    Ok(())
}

/// List catalog products
///
/// Customers only see active products; admins may pass
/// `?include_inactive=true` to see everything.
pub async fn list(
    State(state): State<ServerState>,
    caller: Caller,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let mut products = state
        .storage
        .list_products()
        .map_err(|e| AppError::database(e.to_string()))?;

    if !(query.include_inactive && caller.is_admin()) {
        products.retain(|p| p.is_active);
    }
    products.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(Json(products))
}

/// Get product by id
///
/// Inactive products are hidden from customers.
pub async fn get_by_id(
    State(state): State<ServerState>,
    caller: Caller,
    Path(id): Path<String>,
) -> AppResult<Json<Product>> {
    let product = state
        .storage
        .get_product(&id)
        .map_err(|e| AppError::database(e.to_string()))?
        .filter(|p| p.is_active || caller.is_admin())
        .ok_or_else(|| AppError::product_not_found(&id))?;
    Ok(Json(product))
}

/// Create a product (admin)
pub async fn create(
    State(state): State<ServerState>,
    caller: Caller,
    Json(payload): Json<NewProduct>,
) -> AppResult<Json<Product>> {
    if !caller.is_admin() {
        return Err(AppError::admin_required());
    }
    payload.validate()?;
    check_price(payload.price)?;

    let product = Product::new(Uuid::new_v4().to_string(), payload);
    state
        .storage
        .put_product(&product)
        .map_err(|e| AppError::database(e.to_string()))?;

    tracing::info!(product_id = %product.id, name = %product.name, "Product created");
    Ok(Json(product))
}

/// Partially update a product (admin)
pub async fn update(
    State(state): State<ServerState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(payload): Json<ProductPatch>,
) -> AppResult<Json<Product>> {
    if !caller.is_admin() {
        return Err(AppError::admin_required());
    }
    payload.validate()?;
    if let Some(price) = payload.price {
        check_price(price)?;
    }

    // Patched inside a single write transaction so a concurrent
    // reservation's stock decrement cannot be overwritten
    let product = state
        .storage
        .update_product(&id, payload)
        .map_err(|e| match e {
            StorageError::ProductNotFound(id) => AppError::product_not_found(id),
            other => AppError::database(other.to_string()),
        })?;

    tracing::info!(product_id = %product.id, "Product updated");
    Ok(Json(product))
}
