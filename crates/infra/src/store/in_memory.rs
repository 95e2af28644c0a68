use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use partforge_core::PartCode;
use partforge_inventory::{BomEntry, LowStockState, Part};

use super::r#trait::{
    AlertStateStore, BomKey, BomStore, DEFAULT_MAX_TRANSACTION_ITEMS, InventoryStore, Precondition,
    StoreError,
};
use super::transaction::Transaction;

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

/// In-memory part store.
///
/// Intended for tests/dev. A single write lock serializes transactions, so
/// conditions are evaluated and applied without interleaving.
#[derive(Debug)]
pub struct InMemoryInventoryStore {
    parts: RwLock<BTreeMap<PartCode, Part>>,
    max_transaction_items: usize,
}

impl Default for InMemoryInventoryStore {
    fn default() -> Self {
        Self::with_max_transaction_items(DEFAULT_MAX_TRANSACTION_ITEMS)
    }
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_transaction_items(max_transaction_items: usize) -> Self {
        Self {
            parts: RwLock::new(BTreeMap::new()),
            max_transaction_items,
        }
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    fn max_transaction_items(&self) -> usize {
        self.max_transaction_items
    }

    async fn get(&self, code: &PartCode) -> Result<Option<Part>, StoreError> {
        let parts = self.parts.read().map_err(|_| poisoned())?;
        Ok(parts.get(code).cloned())
    }

    async fn put(&self, part: Part, precondition: Precondition) -> Result<(), StoreError> {
        if part.quantity < 0 || part.min_quantity < 0 {
            return Err(StoreError::ConditionFailed(format!(
                "negative quantity for part {}",
                part.code
            )));
        }

        let mut parts = self.parts.write().map_err(|_| poisoned())?;
        if precondition == Precondition::MustNotExist && parts.contains_key(&part.code) {
            return Err(StoreError::ConditionFailed(format!(
                "part {} already exists",
                part.code
            )));
        }
        parts.insert(part.code.clone(), part);
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<Part>, StoreError> {
        let parts = self.parts.read().map_err(|_| poisoned())?;
        Ok(parts.values().cloned().collect())
    }

    async fn transact(&self, tx: Transaction) -> Result<Vec<Part>, StoreError> {
        if tx.len() > self.max_transaction_items {
            return Err(StoreError::TransactionTooLarge {
                limit: self.max_transaction_items,
                actual: tx.len(),
            });
        }
        if tx.is_empty() {
            return Err(StoreError::InvalidTransaction("no updates".to_string()));
        }
        if let Some(code) = tx.duplicate_key() {
            return Err(StoreError::InvalidTransaction(format!(
                "part {code} appears more than once"
            )));
        }

        let mut parts = self.parts.write().map_err(|_| poisoned())?;

        // Evaluate every condition first; nothing is written unless all hold.
        let mut staged = Vec::with_capacity(tx.len());
        for update in tx.updates() {
            let current = parts.get(&update.code).ok_or_else(|| {
                StoreError::TransactionCanceled(format!("part {} does not exist", update.code))
            })?;

            if !update.condition.holds(current.quantity) {
                return Err(StoreError::TransactionCanceled(format!(
                    "condition {:?} failed for part {} (quantity {})",
                    update.condition, update.code, current.quantity
                )));
            }

            let quantity = match update.change {
                Some(change) => change
                    .apply(current.quantity)
                    .ok_or_else(|| StoreError::QuantityOverflow(update.code.to_string()))?,
                None => current.quantity,
            };
            if quantity < 0 {
                return Err(StoreError::TransactionCanceled(format!(
                    "part {} would go negative ({quantity})",
                    update.code
                )));
            }

            let mut next = current.clone();
            next.quantity = quantity;
            if let Some(min) = update.min_quantity {
                next.min_quantity = min;
            }
            staged.push(next);
        }

        let now = Utc::now();
        for part in &mut staged {
            part.updated_at = now;
            parts.insert(part.code.clone(), part.clone());
        }

        Ok(staged)
    }
}

/// In-memory BOM store keyed by (parent, component).
#[derive(Debug, Default)]
pub struct InMemoryBomStore {
    rows: RwLock<BTreeMap<BomKey, BomEntry>>,
}

impl InMemoryBomStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BomStore for InMemoryBomStore {
    async fn query(&self, parent_code: &PartCode) -> Result<Vec<BomEntry>, StoreError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .filter(|e| &e.parent_code == parent_code)
            .cloned()
            .collect())
    }

    async fn batch_write(&self, deletes: Vec<BomKey>, inserts: Vec<BomEntry>) -> Result<(), StoreError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        for key in &deletes {
            rows.remove(key);
        }
        for entry in inserts {
            rows.insert(BomKey::from(&entry), entry);
        }
        Ok(())
    }
}

/// In-memory single-record alert state.
#[derive(Debug, Default)]
pub struct InMemoryAlertStateStore {
    state: RwLock<Option<LowStockState>>,
}

impl InMemoryAlertStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertStateStore for InMemoryAlertStateStore {
    async fn get(&self) -> Result<Option<LowStockState>, StoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.clone())
    }

    async fn compare_and_set(
        &self,
        expected: Option<&str>,
        next: LowStockState,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        let current = state.as_ref().map(|s| s.signature.as_str());
        if current != expected {
            return Ok(false);
        }
        *state = Some(next);
        Ok(true)
    }
}
