//! `partforge-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! the shared error model, the part-code identifier, and the coercion helpers
//! used to turn loosely-typed request values into validated integers.

pub mod coerce;
pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::PartCode;
