//! Order lifecycle
//!
//! [`storage`] is the redb persistence layer; [`engine`] owns order
//! placement, the status state machine, and the read/query surface.

pub mod engine;
pub mod storage;

pub use engine::{OrderEngine, OrderPage, PlaceOrder, StatusUpdate};
pub use storage::{EngineStorage, StorageError, StorageResult};
