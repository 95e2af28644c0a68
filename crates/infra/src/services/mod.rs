//! Inventory operations: part maintenance, BOM replacement and assembly builds.
//!
//! Services are generic over the store traits so the same code runs against
//! the in-memory and Postgres backends.

pub mod bom_manager;
pub mod build_engine;
pub mod error;
pub mod parts;

pub use bom_manager::BomManager;
pub use build_engine::{BuildEngine, build_transaction};
pub use error::InventoryError;
pub use parts::PartService;
