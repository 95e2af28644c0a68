use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use partforge_core::PartCode;
use partforge_inventory::{BomEntry, LowStockState, Part};

use super::transaction::Transaction;

/// Default ceiling on the number of rows one atomic transaction may touch.
pub const DEFAULT_MAX_TRANSACTION_ITEMS: usize = 25;

/// Store operation error.
///
/// These are **infrastructure errors**; services translate them into the
/// inventory error categories callers see.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A single-row write precondition failed (e.g. the key already exists).
    #[error("conditional check failed: {0}")]
    ConditionFailed(String),

    /// A transaction precondition failed at commit time; nothing was applied.
    #[error("transaction cancelled: {0}")]
    TransactionCanceled(String),

    /// The transaction touches more rows than the store commits atomically.
    #[error("transaction has {actual} items, limit is {limit}")]
    TransactionTooLarge { limit: usize, actual: usize },

    /// Applying a change would push a quantity past `i64::MAX`.
    #[error("quantity overflow for part {0}")]
    QuantityOverflow(String),

    /// The transaction itself is malformed (e.g. the same key twice).
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Precondition for a single-row put.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Precondition {
    None,
    MustNotExist,
}

/// Durable keyed storage of parts.
///
/// Implementations must:
/// - evaluate every `Transaction` condition at commit time
/// - apply all updates of a transaction or none of them
/// - never store a negative quantity
/// - reject transactions larger than `max_transaction_items()`
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Maximum rows one transaction may touch.
    fn max_transaction_items(&self) -> usize;

    async fn get(&self, code: &PartCode) -> Result<Option<Part>, StoreError>;

    async fn put(&self, part: Part, precondition: Precondition) -> Result<(), StoreError>;

    /// Every stored part, in no particular order.
    async fn scan(&self) -> Result<Vec<Part>, StoreError>;

    /// Commit all updates atomically, returning each row's post-image in update order.
    async fn transact(&self, tx: Transaction) -> Result<Vec<Part>, StoreError>;
}

/// Key of a stored BOM row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BomKey {
    pub parent_code: PartCode,
    pub component_code: PartCode,
}

impl From<&BomEntry> for BomKey {
    fn from(entry: &BomEntry) -> Self {
        Self {
            parent_code: entry.parent_code.clone(),
            component_code: entry.component_code.clone(),
        }
    }
}

/// Durable storage of (parent, component) BOM rows.
#[async_trait]
pub trait BomStore: Send + Sync {
    /// Every row whose parent is `parent_code`; empty for unknown parents.
    async fn query(&self, parent_code: &PartCode) -> Result<Vec<BomEntry>, StoreError>;

    /// Apply deletes, then inserts.
    ///
    /// Backends without a batched-atomic primitive may expose the intermediate
    /// state to concurrent readers.
    async fn batch_write(&self, deletes: Vec<BomKey>, inserts: Vec<BomEntry>) -> Result<(), StoreError>;
}

/// Single-record storage of the last low-stock signature.
#[async_trait]
pub trait AlertStateStore: Send + Sync {
    async fn get(&self) -> Result<Option<LowStockState>, StoreError>;

    /// Write `state` only if the stored signature still equals `expected`
    /// (`None`: no record exists). Returns whether the write happened.
    async fn compare_and_set(
        &self,
        expected: Option<&str>,
        state: LowStockState,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    fn max_transaction_items(&self) -> usize {
        (**self).max_transaction_items()
    }

    async fn get(&self, code: &PartCode) -> Result<Option<Part>, StoreError> {
        (**self).get(code).await
    }

    async fn put(&self, part: Part, precondition: Precondition) -> Result<(), StoreError> {
        (**self).put(part, precondition).await
    }

    async fn scan(&self) -> Result<Vec<Part>, StoreError> {
        (**self).scan().await
    }

    async fn transact(&self, tx: Transaction) -> Result<Vec<Part>, StoreError> {
        (**self).transact(tx).await
    }
}

#[async_trait]
impl<S> BomStore for Arc<S>
where
    S: BomStore + ?Sized,
{
    async fn query(&self, parent_code: &PartCode) -> Result<Vec<BomEntry>, StoreError> {
        (**self).query(parent_code).await
    }

    async fn batch_write(&self, deletes: Vec<BomKey>, inserts: Vec<BomEntry>) -> Result<(), StoreError> {
        (**self).batch_write(deletes, inserts).await
    }
}

#[async_trait]
impl<S> AlertStateStore for Arc<S>
where
    S: AlertStateStore + ?Sized,
{
    async fn get(&self) -> Result<Option<LowStockState>, StoreError> {
        (**self).get().await
    }

    async fn compare_and_set(
        &self,
        expected: Option<&str>,
        state: LowStockState,
    ) -> Result<bool, StoreError> {
        (**self).compare_and_set(expected, state).await
    }
}
