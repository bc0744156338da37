use std::sync::Arc;
use std::time::Duration;

use crate::core::Config;
use crate::inventory::InventoryLedger;
use crate::orders::{EngineStorage, OrderEngine};
use crate::payments::{MockGateway, PaymentGateway, PaymentProcessor};

/// Shared application state
///
/// Holds the storage handle and the two domain services. Cloning is cheap;
/// everything inside is either `Arc`-backed or a thin handle.
///
/// | Field | Type | Description |
/// |-------|------|-------------|
/// | config | Config | Immutable configuration |
/// | storage | EngineStorage | redb persistence handle |
/// | ledger | InventoryLedger | Atomic stock reserve/release |
/// | engine | OrderEngine | Order placement and lifecycle |
/// | payments | PaymentProcessor | Charges and refunds |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub storage: EngineStorage,
    pub ledger: InventoryLedger,
    pub engine: OrderEngine,
    pub payments: PaymentProcessor,
}

impl ServerState {
    /// Initialize server state
    ///
    /// Opens (or creates) the database under `work_dir/database/store.redb`
    /// and wires the services together with the stub payment gateway.
    pub fn initialize(config: &Config) -> anyhow::Result<Self> {
        let db_dir = config.database_dir();
        std::fs::create_dir_all(&db_dir)?;
        let storage = EngineStorage::open(db_dir.join("store.redb"))?;
        Ok(Self::with_gateway(
            config.clone(),
            storage,
            Arc::new(MockGateway),
        ))
    }

    /// Build state around an existing storage handle and gateway
    ///
    /// Used by [`initialize`](Self::initialize) and by tests that inject a
    /// scripted gateway or an in-memory database.
    pub fn with_gateway(
        config: Config,
        storage: EngineStorage,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let ledger = InventoryLedger::new(storage.clone());
        let engine = OrderEngine::new(storage.clone(), ledger.clone());
        let payments = PaymentProcessor::new(
            storage.clone(),
            gateway,
            Duration::from_millis(config.gateway_timeout_ms),
        );
        Self {
            config,
            storage,
            ledger,
            engine,
            payments,
        }
    }
}
