//! Store Server - order and payment transaction engine
//!
//! # Architecture overview
//!
//! - **Inventory** (`inventory`): atomic stock reservation ledger
//! - **Orders** (`orders`): placement, status state machine, redb storage
//! - **Payments** (`payments`): gateway capability, charges and refunds
//! - **HTTP API** (`api`): RESTful routes over the engine
//!
//! # Module structure
//!
//! ```text
//! store-server/src/
//! ├── core/          # Configuration, state, server startup
//! ├── inventory/     # Stock reserve/release ledger
//! ├── orders/        # Order engine and persistence
//! ├── payments/      # Gateway trait, processor
//! ├── api/           # HTTP routes and handlers
//! └── utils/         # Logging and shared re-exports
//! ```

pub mod api;
pub mod core;
pub mod inventory;
pub mod orders;
pub mod payments;
pub mod utils;

// Re-export public types
pub use core::{Config, Server, ServerState};
pub use inventory::InventoryLedger;
pub use orders::{EngineStorage, OrderEngine, OrderPage, PlaceOrder, StatusUpdate};
pub use payments::{MockGateway, PaymentGateway, PaymentProcessor};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// Prepare the process environment: dotenv, work directory, logging
pub fn setup_environment() -> std::io::Result<Config> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    std::fs::create_dir_all(&config.work_dir)?;

    let log_level = if config.is_production() { "info" } else { "debug" };
    init_logger_with_file(Some(log_level), config.log_dir.as_deref());

    Ok(config)
}
