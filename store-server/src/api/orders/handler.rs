//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use validator::Validate;

use shared::models::{Caller, Order, OrderStatus};

use crate::core::ServerState;
use crate::orders::{OrderPage, PlaceOrder, StatusUpdate};
use crate::utils::{AppError, AppResult};

/// Query params for the admin order listing
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Optional status filter
    pub status: Option<OrderStatus>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

/// Place a new order for the calling customer
pub async fn place(
    State(state): State<ServerState>,
    caller: Caller,
    Json(payload): Json<PlaceOrder>,
) -> AppResult<Json<Order>> {
    payload.validate()?;
    let customer_id = caller
        .customer_id()
        .ok_or_else(|| AppError::invalid_request("orders are placed by customer accounts"))?
        .to_string();
    let order = state.engine.place_order(&customer_id, payload)?;
    Ok(Json(order))
}

/// List all orders (admin, paginated, optional status filter)
pub async fn list(
    State(state): State<ServerState>,
    caller: Caller,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<OrderPage>> {
    let page = state
        .engine
        .list_orders(&caller, query.status, query.page, query.page_size)?;
    Ok(Json(page))
}

/// List the calling customer's orders, newest first
pub async fn list_mine(
    State(state): State<ServerState>,
    caller: Caller,
) -> AppResult<Json<Vec<Order>>> {
    let orders = state.engine.list_orders_for_customer(&caller)?;
    Ok(Json(orders))
}

/// Get order by id (owner or admin)
pub async fn get_by_id(
    State(state): State<ServerState>,
    caller: Caller,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let order = state.engine.get_order(&caller, &id)?;
    Ok(Json(order))
}

/// Transition an order's status (admin)
pub async fn update_status(
    State(state): State<ServerState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(payload): Json<StatusUpdate>,
) -> AppResult<Json<Order>> {
    let order = state.engine.update_status(&caller, &id, payload)?;
    Ok(Json(order))
}
