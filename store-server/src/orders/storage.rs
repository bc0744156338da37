//! redb-based storage layer for products and orders
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `products` | `product_id` | `Product` | Catalog and live stock |
//! | `orders` | `order_id` | `Order` | Orders with payment history |
//! | `customer_orders` | `(customer_id, order_id)` | `()` | Customer order index |
//! | `counters` | name | `u64` | Order number counter |
//!
//! # Concurrency
//!
//! redb allows a single write transaction at a time; every stock mutation
//! happens inside one, so concurrent checkouts serialize on the conditional
//! decrement and can never jointly oversell a product.
//!
//! # Durability
//!
//! redb commits are durable as soon as `commit()` returns (copy-on-write
//! with atomic pointer swap), so the database file is always consistent.

use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use shared::models::{Order, Product, ProductPatch};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for products: key = product_id, value = JSON-serialized Product
const PRODUCTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("products");

/// Table for orders: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Table indexing orders by customer: key = (customer_id, order_id), value = empty
const CUSTOMER_ORDERS_TABLE: TableDefinition<(&str, &str), ()> =
    TableDefinition::new("customer_orders");

/// Table for counters: key = counter name, value = u64
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

const ORDER_COUNT_KEY: &str = "order_count";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Insufficient stock for product {product_id}: available {available}")]
    InsufficientStock { product_id: String, available: u32 },

    #[error("Order not found: {0}")]
    OrderNotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Product and order storage backed by redb
#[derive(Clone)]
pub struct EngineStorage {
    db: Arc<Database>,
}

impl EngineStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    fn init_tables(&self) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(CUSTOMER_ORDERS_TABLE)?;

            let mut counters = write_txn.open_table(COUNTERS_TABLE)?;
            if counters.get(ORDER_COUNT_KEY)?.is_none() {
                counters.insert(ORDER_COUNT_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Order Counter (for order number) ==========

    /// Get and increment the order count atomically.
    /// Returns the NEW count after increment.
    pub fn next_order_count(&self) -> StorageResult<u64> {
        let txn = self.db.begin_write()?;
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        let current = table.get(ORDER_COUNT_KEY)?.map(|g| g.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(ORDER_COUNT_KEY, next)?;
        drop(table);
        txn.commit()?;
        Ok(next)
    }

    // ========== Product Operations ==========

    /// Insert or replace a product
    pub fn put_product(&self, product: &Product) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PRODUCTS_TABLE)?;
            let value = serde_json::to_vec(product)?;
            table.insert(product.id.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Apply a partial update to a product.
    ///
    /// Loads, patches and writes inside one write transaction so the edit
    /// cannot overwrite a stock decrement committed by a concurrent
    /// reservation.
    pub fn update_product(&self, id: &str, patch: ProductPatch) -> StorageResult<Product> {
        let txn = self.db.begin_write()?;
        let updated = {
            let mut table = txn.open_table(PRODUCTS_TABLE)?;
            let mut product: Product = match table.get(id)? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => return Err(StorageError::ProductNotFound(id.to_string())),
            };
            product.apply(patch);
            let value = serde_json::to_vec(&product)?;
            table.insert(id, value.as_slice())?;
            product
        };
        txn.commit()?;
        Ok(updated)
    }

    /// Get a product by id
    pub fn get_product(&self, id: &str) -> StorageResult<Option<Product>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// List all products
    pub fn list_products(&self) -> StorageResult<Vec<Product>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;

        let mut products = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            products.push(serde_json::from_slice(value.value())?);
        }
        Ok(products)
    }

    /// Atomically decrement a product's stock by `quantity`.
    ///
    /// Fails without mutating anything if the product is missing, inactive,
    /// or the remaining stock does not cover the quantity. Returns the
    /// product as it was before the decrement (the price/name snapshot
    /// source for order lines).
    pub fn reserve_stock(&self, product_id: &str, quantity: u32) -> StorageResult<Product> {
        let txn = self.db.begin_write()?;
        let snapshot = {
            let mut table = txn.open_table(PRODUCTS_TABLE)?;
            let product: Product = match table.get(product_id)? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => return Err(StorageError::ProductNotFound(product_id.to_string())),
            };
            if !product.is_active {
                return Err(StorageError::ProductNotFound(product_id.to_string()));
            }
            if product.stock < quantity {
                return Err(StorageError::InsufficientStock {
                    product_id: product_id.to_string(),
                    available: product.stock,
                });
            }

            let mut updated = product.clone();
            updated.stock -= quantity;
            updated.updated_at = shared::util::now_millis();
            let value = serde_json::to_vec(&updated)?;
            table.insert(product_id, value.as_slice())?;
            product
        };
        txn.commit()?;
        Ok(snapshot)
    }

    /// Return previously reserved stock to a product (compensation path)
    pub fn release_stock(&self, product_id: &str, quantity: u32) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PRODUCTS_TABLE)?;
            let mut product: Product = match table.get(product_id)? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => return Err(StorageError::ProductNotFound(product_id.to_string())),
            };
            product.stock = product.stock.saturating_add(quantity);
            product.updated_at = shared::util::now_millis();
            let value = serde_json::to_vec(&product)?;
            table.insert(product_id, value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    // ========== Order Operations ==========

    /// Insert a new order and index it by customer
    pub fn insert_order(&self, order: &Order) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut orders = txn.open_table(ORDERS_TABLE)?;
            let value = serde_json::to_vec(order)?;
            orders.insert(order.id.as_str(), value.as_slice())?;

            let mut index = txn.open_table(CUSTOMER_ORDERS_TABLE)?;
            index.insert((order.customer_id.as_str(), order.id.as_str()), ())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Get an order by id
    pub fn get_order(&self, id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get an order by id inside a write transaction
    pub fn get_order_txn(&self, txn: &WriteTransaction, id: &str) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Write an order back inside a write transaction
    pub fn put_order_txn(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// List all orders
    pub fn list_orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            orders.push(serde_json::from_slice(value.value())?);
        }
        Ok(orders)
    }

    /// List all orders belonging to a customer
    pub fn list_orders_for_customer(&self, customer_id: &str) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(CUSTOMER_ORDERS_TABLE)?;
        let orders_table = read_txn.open_table(ORDERS_TABLE)?;

        let range_start = (customer_id, "");
        let range_end = (customer_id, "\u{10FFFF}");

        let mut orders = Vec::new();
        for result in index.range(range_start..=range_end)? {
            let (key, _value) = result?;
            let (_customer, order_id) = key.value();
            if let Some(value) = orders_table.get(order_id)? {
                orders.push(serde_json::from_slice(value.value())?);
            }
        }
        Ok(orders)
    }
}
