//! Inventory domain module.
//!
//! This crate contains business rules for parts, bills of materials and
//! low-stock detection, implemented purely as deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod bom;
pub mod build;
pub mod low_stock;
pub mod part;

pub use bom::{BomEntry, BomLine, BomLineInput, validate_components};
pub use build::{Requirement, Shortfall, explode, find_shortfalls};
pub use low_stock::{LOW_STOCK_ALERT_SUBJECT, LOW_STOCK_STATE_KEY, LowStockSet, LowStockState};
pub use part::{NewPart, Part, PartPatch, QuantityUpdate};
