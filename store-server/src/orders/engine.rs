//! Order lifecycle engine
//!
//! Owns order placement (validate, reserve incrementally, snapshot, persist),
//! the operator-driven status state machine, and the read/query surface.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Address, Caller, CartItem, Order, OrderLine, OrderStatus, PaymentStatus};
use shared::util::{now_millis, round_money};

use crate::inventory::InventoryLedger;
use crate::orders::storage::{EngineStorage, StorageError};

/// Request to place an order
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct PlaceOrder {
    #[validate(length(min = 1, message = "order must contain at least one item"))]
    #[validate(nested)]
    pub items: Vec<CartItem>,
    #[validate(nested)]
    pub shipping_address: Address,
    /// Defaults to the shipping address when omitted
    #[validate(nested)]
    pub billing_address: Option<Address>,
}

/// Operator request to advance an order's status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<String>,
}

/// One page of the admin order listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u32,
}

fn db_err(e: StorageError) -> AppError {
    AppError::database(e.to_string())
}

/// Order lifecycle engine
#[derive(Clone)]
pub struct OrderEngine {
    storage: EngineStorage,
    ledger: InventoryLedger,
}

impl OrderEngine {
    pub fn new(storage: EngineStorage, ledger: InventoryLedger) -> Self {
        Self { storage, ledger }
    }

    /// Place an order for a customer.
    ///
    /// Items are reserved incrementally in cart order; if any reservation
    /// fails, every prior reservation of this request is released and the
    /// error is returned, leaving all stock as it was. On success the order
    /// is persisted as `pending`/`pending` with per-line name and price
    /// snapshots.
    pub fn place_order(&self, customer_id: &str, request: PlaceOrder) -> AppResult<Order> {
        if request.items.is_empty() {
            return Err(AppError::new(ErrorCode::OrderEmpty));
        }

        let mut reserved: Vec<(String, u32)> = Vec::with_capacity(request.items.len());
        let mut lines: Vec<OrderLine> = Vec::with_capacity(request.items.len());

        for item in &request.items {
            match self.ledger.reserve(&item.product_id, item.quantity) {
                Ok(snapshot) => {
                    lines.push(OrderLine::new(
                        &item.product_id,
                        &snapshot.name,
                        snapshot.price,
                        item.quantity,
                    ));
                    reserved.push((item.product_id.clone(), item.quantity));
                }
                Err(err) => {
                    self.rollback_reservations(&reserved);
                    return Err(err);
                }
            }
        }

        let total = round_money(lines.iter().map(|l| l.line_total).sum::<Decimal>());

        let count = match self.storage.next_order_count() {
            Ok(count) => count,
            Err(e) => {
                self.rollback_reservations(&reserved);
                return Err(db_err(e));
            }
        };
        let order_number = format!(
            "ORD-{}-{:05}",
            chrono::Utc::now().format("%Y%m%d"),
            count
        );

        let now = now_millis();
        let billing_address = request
            .billing_address
            .unwrap_or_else(|| request.shipping_address.clone());
        let order = Order {
            id: Uuid::new_v4().to_string(),
            order_number,
            customer_id: customer_id.to_string(),
            lines,
            total,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            shipping_address: request.shipping_address,
            billing_address,
            tracking_number: None,
            estimated_delivery: None,
            payments: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.storage.insert_order(&order) {
            self.rollback_reservations(&reserved);
            return Err(db_err(e));
        }

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            customer_id = %customer_id,
            total = %order.total,
            "Order placed"
        );
        Ok(order)
    }

    fn rollback_reservations(&self, reserved: &[(String, u32)]) {
        for (product_id, quantity) in reserved {
            if let Err(e) = self.ledger.release(product_id, *quantity) {
                tracing::error!(
                    product_id = %product_id,
                    quantity = quantity,
                    error = %e,
                    "Failed to release reserved stock during rollback"
                );
            }
        }
    }

    /// Fetch an order; visible to its owner and to admins
    pub fn get_order(&self, caller: &Caller, order_id: &str) -> AppResult<Order> {
        let order = self
            .storage
            .get_order(order_id)
            .map_err(db_err)?
            .ok_or_else(|| AppError::order_not_found(order_id))?;

        if !caller.can_view(&order.customer_id) {
            return Err(AppError::new(ErrorCode::NotOrderOwner));
        }
        Ok(order)
    }

    /// Admin listing, optionally filtered by status, newest first
    pub fn list_orders(
        &self,
        caller: &Caller,
        status: Option<OrderStatus>,
        page: u32,
        page_size: u32,
    ) -> AppResult<OrderPage> {
        if !caller.is_admin() {
            return Err(AppError::admin_required());
        }

        let mut orders = self.storage.list_orders().map_err(db_err)?;
        if let Some(status) = status {
            orders.retain(|o| o.status == status);
        }
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let page = page.max(1);
        let page_size = page_size.clamp(1, 100);
        let total = orders.len() as u64;
        let total_pages = (total as u32).div_ceil(page_size).max(1);

        // Offset in u64: page and page_size are caller-supplied and their
        // product can exceed u32
        let start = (page as u64 - 1).saturating_mul(page_size as u64);
        let orders = if start >= orders.len() as u64 {
            Vec::new()
        } else {
            orders
                .into_iter()
                .skip(start as usize)
                .take(page_size as usize)
                .collect()
        };

        Ok(OrderPage {
            orders,
            page,
            page_size,
            total,
            total_pages,
        })
    }

    /// A customer's own orders, newest first
    pub fn list_orders_for_customer(&self, caller: &Caller) -> AppResult<Vec<Order>> {
        let customer_id = caller
            .customer_id()
            .ok_or_else(|| AppError::invalid_request("caller has no customer account"))?;

        let mut orders = self
            .storage
            .list_orders_for_customer(customer_id)
            .map_err(db_err)?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Set an order's status (admin only).
    ///
    /// The operator picks the next status explicitly; the engine only
    /// refuses to move an order out of a terminal state. Optional tracking
    /// metadata is stored verbatim.
    pub fn update_status(
        &self,
        caller: &Caller,
        order_id: &str,
        update: StatusUpdate,
    ) -> AppResult<Order> {
        if !caller.is_admin() {
            return Err(AppError::admin_required());
        }

        let txn = self.storage.begin_write().map_err(db_err)?;
        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)
            .map_err(db_err)?
            .ok_or_else(|| AppError::order_not_found(order_id))?;

        if !order.status.can_transition_to(update.status) {
            return Err(AppError::new(ErrorCode::OrderTerminal)
                .with_detail("status", order.status.name())
                .with_detail("requested", update.status.name()));
        }

        let previous = order.status;
        order.status = update.status;
        if let Some(tracking) = update.tracking_number {
            order.tracking_number = Some(tracking);
        }
        if let Some(estimate) = update.estimated_delivery {
            order.estimated_delivery = Some(estimate);
        }
        order.updated_at = now_millis();

        self.storage.put_order_txn(&txn, &order).map_err(db_err)?;
        txn.commit().map_err(|e| AppError::database(e.to_string()))?;

        tracing::info!(
            order_id = %order.id,
            from = %previous,
            to = %order.status,
            "Order status updated"
        );
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{NewProduct, Product};

    fn address() -> Address {
        Address {
            street: "1 Main St".into(),
            city: "Springfield".into(),
            postal_code: "12345".into(),
            country: "US".into(),
        }
    }

    fn engine_with_catalog(stock: &[(&str, Decimal, u32)]) -> (OrderEngine, EngineStorage) {
        let storage = EngineStorage::open_in_memory().unwrap();
        for (id, price, qty) in stock {
            let product = Product::new(
                *id,
                NewProduct {
                    name: format!("Product {}", id),
                    description: None,
                    price: *price,
                    stock: *qty,
                    category: None,
                    is_active: None,
                },
            );
            storage.put_product(&product).unwrap();
        }
        let ledger = InventoryLedger::new(storage.clone());
        (OrderEngine::new(storage.clone(), ledger), storage)
    }

    fn cart(items: &[(&str, u32)]) -> PlaceOrder {
        PlaceOrder {
            items: items
                .iter()
                .map(|(id, qty)| CartItem {
                    product_id: id.to_string(),
                    quantity: *qty,
                })
                .collect(),
            shipping_address: address(),
            billing_address: None,
        }
    }

    #[test]
    fn test_place_order_totals_and_stock() {
        let (engine, storage) = engine_with_catalog(&[
            ("a", Decimal::new(1000, 2), 5),
            ("b", Decimal::new(500, 2), 5),
        ]);

        let order = engine
            .place_order("alice", cart(&[("a", 2), ("b", 1)]))
            .unwrap();

        assert_eq!(order.total, Decimal::new(2500, 2));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.billing_address, order.shipping_address);

        assert_eq!(storage.get_product("a").unwrap().unwrap().stock, 3);
        assert_eq!(storage.get_product("b").unwrap().unwrap().stock, 4);
    }

    #[test]
    fn test_place_order_insufficient_rolls_back_everything() {
        let (engine, storage) = engine_with_catalog(&[
            ("a", Decimal::new(1000, 2), 5),
            ("b", Decimal::new(500, 2), 0),
        ]);

        let err = engine
            .place_order("alice", cart(&[("a", 2), ("b", 1)]))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        // First item's reservation was released
        assert_eq!(storage.get_product("a").unwrap().unwrap().stock, 5);
        assert_eq!(storage.get_product("b").unwrap().unwrap().stock, 0);
        assert!(storage.list_orders().unwrap().is_empty());
    }

    #[test]
    fn test_place_order_empty_cart() {
        let (engine, _) = engine_with_catalog(&[]);
        let err = engine.place_order("alice", cart(&[])).unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderEmpty);
    }

    #[test]
    fn test_snapshot_immune_to_price_change() {
        let (engine, storage) = engine_with_catalog(&[("a", Decimal::new(1000, 2), 5)]);

        let order = engine.place_order("alice", cart(&[("a", 1)])).unwrap();
        assert_eq!(order.total, Decimal::new(1000, 2));

        // Price change after placement must not affect the stored order
        let mut product = storage.get_product("a").unwrap().unwrap();
        product.price = Decimal::new(99900, 2);
        storage.put_product(&product).unwrap();

        let reloaded = engine.get_order(&Caller::Admin, &order.id).unwrap();
        assert_eq!(reloaded.total, Decimal::new(1000, 2));
        assert_eq!(reloaded.lines[0].unit_price, Decimal::new(1000, 2));
    }

    #[test]
    fn test_get_order_permissions() {
        let (engine, _) = engine_with_catalog(&[("a", Decimal::new(1000, 2), 5)]);
        let order = engine.place_order("alice", cart(&[("a", 1)])).unwrap();

        assert!(engine.get_order(&Caller::customer("alice"), &order.id).is_ok());
        assert!(engine.get_order(&Caller::Admin, &order.id).is_ok());

        let err = engine
            .get_order(&Caller::customer("bob"), &order.id)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotOrderOwner);

        let err = engine.get_order(&Caller::Admin, "missing").unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderNotFound);
    }

    #[test]
    fn test_list_orders_admin_only() {
        let (engine, _) = engine_with_catalog(&[("a", Decimal::new(1000, 2), 5)]);
        engine.place_order("alice", cart(&[("a", 1)])).unwrap();

        let err = engine
            .list_orders(&Caller::customer("alice"), None, 1, 20)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::AdminRequired);

        let page = engine.list_orders(&Caller::Admin, None, 1, 20).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.orders.len(), 1);
    }

    #[test]
    fn test_list_orders_status_filter_and_pagination() {
        let (engine, _) = engine_with_catalog(&[("a", Decimal::new(100, 2), 100)]);
        for _ in 0..5 {
            engine.place_order("alice", cart(&[("a", 1)])).unwrap();
        }

        let page = engine.list_orders(&Caller::Admin, None, 1, 2).unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.orders.len(), 2);

        let last = engine.list_orders(&Caller::Admin, None, 3, 2).unwrap();
        assert_eq!(last.orders.len(), 1);

        let shipped = engine
            .list_orders(&Caller::Admin, Some(OrderStatus::Shipped), 1, 20)
            .unwrap();
        assert_eq!(shipped.total, 0);
        assert!(shipped.orders.is_empty());
    }

    #[test]
    fn test_list_orders_page_far_beyond_end() {
        let (engine, _) = engine_with_catalog(&[("a", Decimal::new(100, 2), 100)]);
        for _ in 0..3 {
            engine.place_order("alice", cart(&[("a", 1)])).unwrap();
        }

        // Extreme page numbers must yield an empty page, never panic
        let page = engine
            .list_orders(&Caller::Admin, None, u32::MAX, 100)
            .unwrap();
        assert!(page.orders.is_empty());
        assert_eq!(page.total, 3);

        let page = engine
            .list_orders(&Caller::Admin, None, u32::MAX, u32::MAX)
            .unwrap();
        assert!(page.orders.is_empty());
    }

    #[test]
    fn test_list_orders_for_customer() {
        let (engine, _) = engine_with_catalog(&[("a", Decimal::new(100, 2), 100)]);
        engine.place_order("alice", cart(&[("a", 1)])).unwrap();
        engine.place_order("bob", cart(&[("a", 1)])).unwrap();

        let mine = engine
            .list_orders_for_customer(&Caller::customer("alice"))
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].customer_id, "alice");

        let err = engine.list_orders_for_customer(&Caller::Admin).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequest);
    }

    fn update(status: OrderStatus) -> StatusUpdate {
        StatusUpdate {
            status,
            tracking_number: None,
            estimated_delivery: None,
        }
    }

    #[test]
    fn test_update_status_forward_chain() {
        let (engine, _) = engine_with_catalog(&[("a", Decimal::new(100, 2), 5)]);
        let order = engine.place_order("alice", cart(&[("a", 1)])).unwrap();
        let admin = Caller::Admin;

        let order = engine
            .update_status(&admin, &order.id, update(OrderStatus::Processing))
            .unwrap();
        assert_eq!(order.status, OrderStatus::Processing);

        let order = engine
            .update_status(
                &admin,
                &order.id,
                StatusUpdate {
                    status: OrderStatus::Shipped,
                    tracking_number: Some("TRACK-1".into()),
                    estimated_delivery: Some("2026-09-01".into()),
                },
            )
            .unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.tracking_number.as_deref(), Some("TRACK-1"));

        let order = engine
            .update_status(&admin, &order.id, update(OrderStatus::Delivered))
            .unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);

        // Terminal now
        let err = engine
            .update_status(&admin, &order.id, update(OrderStatus::Cancelled))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderTerminal);
    }

    #[test]
    fn test_update_status_operator_driven() {
        let (engine, _) = engine_with_catalog(&[("a", Decimal::new(100, 2), 5)]);
        let order = engine.place_order("alice", cart(&[("a", 1)])).unwrap();

        let err = engine
            .update_status(
                &Caller::customer("alice"),
                &order.id,
                update(OrderStatus::Processing),
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::AdminRequired);

        // The operator may jump straight to delivered; the order is then final
        let order = engine
            .update_status(&Caller::Admin, &order.id, update(OrderStatus::Delivered))
            .unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);

        let err = engine
            .update_status(&Caller::Admin, &order.id, update(OrderStatus::Shipped))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderTerminal);
    }
}
