//! Storage boundary for parts, BOM rows and low-stock alert state.
//!
//! Services depend only on the traits in this module; the in-memory stores back
//! tests and local runs, the Postgres stores back deployments.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;
pub mod transaction;

pub use in_memory::{InMemoryAlertStateStore, InMemoryBomStore, InMemoryInventoryStore};
pub use postgres::{PostgresAlertStateStore, PostgresBomStore, PostgresInventoryStore, migrate};
pub use r#trait::{
    AlertStateStore, BomKey, BomStore, DEFAULT_MAX_TRANSACTION_ITEMS, InventoryStore, Precondition,
    StoreError,
};
pub use transaction::{Condition, ConditionalUpdate, StockChange, Transaction};
