//! Concurrent reservation behavior: stock never oversells or goes negative.

use std::sync::Arc;
use std::thread;

use rust_decimal::Decimal;
use tempfile::TempDir;

use shared::models::{Address, CartItem, NewProduct, Product};
use store_server::payments::MockGateway;
use store_server::{Config, EngineStorage, InventoryLedger, PlaceOrder, ServerState};

fn seed(storage: &EngineStorage, id: &str, stock: u32) {
    let product = Product::new(
        id,
        NewProduct {
            name: format!("Product {}", id),
            description: None,
            price: Decimal::new(500, 2),
            stock,
            category: None,
            is_active: None,
        },
    );
    storage.put_product(&product).unwrap();
}

#[test]
fn test_concurrent_reservations_never_oversell() {
    let dir = TempDir::new().unwrap();
    let storage = EngineStorage::open(dir.path().join("store.redb")).unwrap();
    seed(&storage, "hot", 10);
    let ledger = Arc::new(InventoryLedger::new(storage.clone()));

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || ledger.reserve("hot", 1).is_ok())
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(successes, 10);
    assert_eq!(storage.get_product("hot").unwrap().unwrap().stock, 0);
}

#[test]
fn test_concurrent_orders_never_oversell() {
    let dir = TempDir::new().unwrap();
    let storage = EngineStorage::open(dir.path().join("store.redb")).unwrap();
    seed(&storage, "hot", 5);
    let state = ServerState::with_gateway(
        Config::with_overrides(dir.path().to_string_lossy(), 0),
        storage.clone(),
        Arc::new(MockGateway),
    );

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let engine = state.engine.clone();
            thread::spawn(move || {
                engine
                    .place_order(
                        &format!("customer-{}", i),
                        PlaceOrder {
                            items: vec![CartItem {
                                product_id: "hot".into(),
                                quantity: 1,
                            }],
                            shipping_address: Address {
                                street: "1 Main St".into(),
                                city: "Springfield".into(),
                                postal_code: "12345".into(),
                                country: "US".into(),
                            },
                            billing_address: None,
                        },
                    )
                    .is_ok()
            })
        })
        .collect();

    let placed = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(placed, 5);
    assert_eq!(storage.get_product("hot").unwrap().unwrap().stock, 0);
    assert_eq!(storage.list_orders().unwrap().len(), 5);
}

#[test]
fn test_release_after_failed_batch_restores_exact_quantity() {
    let dir = TempDir::new().unwrap();
    let storage = EngineStorage::open(dir.path().join("store.redb")).unwrap();
    seed(&storage, "a", 6);
    let ledger = InventoryLedger::new(storage.clone());

    ledger.reserve("a", 4).unwrap();
    ledger.release("a", 4).unwrap();

    assert_eq!(storage.get_product("a").unwrap().unwrap().stock, 6);
}
