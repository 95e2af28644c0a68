use thiserror::Error;

use partforge_core::{DomainError, PartCode};
use partforge_inventory::Shortfall;

use crate::store::StoreError;

/// Failure of a part, BOM or build operation.
///
/// Every variant carries a stable machine-readable `code()`; none of them is
/// retried internally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// Malformed input, naming the offending field.
    #[error("invalid `{field}`: {reason}")]
    Validation { field: String, reason: String },

    #[error("no bill of materials defined for {parent_code}")]
    NoBomDefined { parent_code: PartCode },

    #[error(
        "build needs {actual} item updates but a transaction allows at most {limit}; split the build into smaller batches"
    )]
    TransactionTooLarge { limit: usize, actual: usize },

    #[error("insufficient stock for {} component(s)", missing.len())]
    InsufficientStock { missing: Vec<Shortfall> },

    /// Stock changed between the pre-check and commit; retry the whole build.
    #[error("stock for {parent_code} changed concurrently; retry the build")]
    BuildConflict { parent_code: PartCode },

    /// A stock guard on a part update failed at commit time.
    #[error("stock for {code} changed concurrently; retry the update")]
    UpdateConflict { code: PartCode },

    #[error("{entity} {code} not found")]
    NotFound { entity: &'static str, code: String },

    #[error("part {code} already exists")]
    AlreadyExists { code: PartCode },

    #[error(transparent)]
    Store(StoreError),
}

impl InventoryError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn part_not_found(code: &PartCode) -> Self {
        Self::NotFound {
            entity: "part",
            code: code.to_string(),
        }
    }

    /// Stable error code exposed to callers.
    pub fn code(&self) -> &'static str {
        match self {
            InventoryError::Validation { .. } => "VALIDATION_ERROR",
            InventoryError::NoBomDefined { .. } => "NO_BOM_DEFINED",
            InventoryError::TransactionTooLarge { .. } => "TRANSACTION_TOO_LARGE",
            InventoryError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            InventoryError::BuildConflict { .. } => "BUILD_CONFLICT",
            InventoryError::UpdateConflict { .. } => "UPDATE_CONFLICT",
            InventoryError::NotFound { .. } => "NOT_FOUND",
            InventoryError::AlreadyExists { .. } => "ALREADY_EXISTS",
            InventoryError::Store(_) => "STORE_ERROR",
        }
    }
}

impl From<DomainError> for InventoryError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation { field, reason } => InventoryError::Validation { field, reason },
        }
    }
}

impl From<StoreError> for InventoryError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::TransactionTooLarge { limit, actual } => {
                InventoryError::TransactionTooLarge { limit, actual }
            }
            StoreError::QuantityOverflow(code) => {
                InventoryError::validation("quantity", format!("would overflow the stock of part {code}"))
            }
            other => InventoryError::Store(other),
        }
    }
}
