//! Atomic stock reservation over the storage layer

use shared::error::{AppError, AppResult};
use shared::models::Product;

use crate::orders::storage::{EngineStorage, StorageError};

/// Inventory ledger
///
/// `reserve` performs a conditional decrement inside a single write
/// transaction; two concurrent reservations can therefore never jointly
/// take more stock than exists. `release` is the compensating increment,
/// used only to undo reservations of a failed multi-item checkout.
/// Neither operation retries on shortfall; the caller sees the error
/// immediately.
#[derive(Clone)]
pub struct InventoryLedger {
    storage: EngineStorage,
}

impl InventoryLedger {
    pub fn new(storage: EngineStorage) -> Self {
        Self { storage }
    }

    /// Reserve `quantity` units of a product.
    ///
    /// Returns the product snapshot as of the reservation (the name/price
    /// source for the order line). Fails with `ProductNotFound` for missing
    /// or inactive products, `InsufficientStock` when the remaining stock
    /// does not cover the quantity.
    pub fn reserve(&self, product_id: &str, quantity: u32) -> AppResult<Product> {
        if quantity == 0 {
            return Err(AppError::validation("quantity must be at least 1"));
        }

        match self.storage.reserve_stock(product_id, quantity) {
            Ok(snapshot) => {
                tracing::debug!(
                    product_id = %product_id,
                    quantity = quantity,
                    remaining = snapshot.stock - quantity,
                    "Reserved stock"
                );
                Ok(snapshot)
            }
            Err(StorageError::ProductNotFound(id)) => Err(AppError::product_not_found(id)),
            Err(StorageError::InsufficientStock {
                product_id,
                available,
            }) => Err(AppError::insufficient_stock(product_id, quantity, available)),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    /// Return `quantity` units to a product (compensation path only)
    pub fn release(&self, product_id: &str, quantity: u32) -> AppResult<()> {
        match self.storage.release_stock(product_id, quantity) {
            Ok(()) => {
                tracing::debug!(
                    product_id = %product_id,
                    quantity = quantity,
                    "Released stock"
                );
                Ok(())
            }
            Err(StorageError::ProductNotFound(id)) => Err(AppError::product_not_found(id)),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::error::ErrorCode;
    use shared::models::NewProduct;

    fn ledger_with_product(stock: u32) -> (InventoryLedger, EngineStorage) {
        let storage = EngineStorage::open_in_memory().unwrap();
        let product = Product::new(
            "p1",
            NewProduct {
                name: "Widget".into(),
                description: None,
                price: Decimal::new(1000, 2),
                stock,
                category: None,
                is_active: None,
            },
        );
        storage.put_product(&product).unwrap();
        (InventoryLedger::new(storage.clone()), storage)
    }

    #[test]
    fn test_reserve_success() {
        let (ledger, storage) = ledger_with_product(5);
        let snapshot = ledger.reserve("p1", 2).unwrap();
        assert_eq!(snapshot.name, "Widget");
        assert_eq!(storage.get_product("p1").unwrap().unwrap().stock, 3);
    }

    #[test]
    fn test_reserve_insufficient_reports_available() {
        let (ledger, storage) = ledger_with_product(1);
        let err = ledger.reserve("p1", 3).unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        let details = err.details.unwrap();
        assert_eq!(details.get("available").unwrap(), 1);
        assert_eq!(details.get("requested").unwrap(), 3);
        // No partial decrement
        assert_eq!(storage.get_product("p1").unwrap().unwrap().stock, 1);
    }

    #[test]
    fn test_reserve_unknown_product() {
        let (ledger, _) = ledger_with_product(5);
        let err = ledger.reserve("nope", 1).unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductNotFound);
    }

    #[test]
    fn test_reserve_zero_quantity_rejected() {
        let (ledger, _) = ledger_with_product(5);
        let err = ledger.reserve("p1", 0).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn test_release_restores_stock() {
        let (ledger, storage) = ledger_with_product(5);
        ledger.reserve("p1", 4).unwrap();
        ledger.release("p1", 4).unwrap();
        assert_eq!(storage.get_product("p1").unwrap().unwrap().stock, 5);
    }

    #[test]
    fn test_concurrent_reserves_never_oversell() {
        let (ledger, storage) = ledger_with_product(10);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let ledger = ledger.clone();
            handles.push(std::thread::spawn(move || ledger.reserve("p1", 1).is_ok()));
        }

        let succeeded = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(succeeded, 10);
        assert_eq!(storage.get_product("p1").unwrap().unwrap().stock, 0);
    }
}
