//! Multi-row conditional update, submitted to the store as one atomic unit.
//!
//! A `Transaction` is plain data: an ordered list of per-row updates, each with
//! its own precondition. Stores commit every update or none of them; a failed
//! precondition on any row cancels the whole transaction.

use std::collections::HashSet;

use partforge_core::PartCode;

/// Change applied to a row's `quantity`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StockChange {
    /// Add a (possibly negative) delta.
    Add(i64),
    /// Overwrite with an absolute value.
    Set(i64),
}

impl StockChange {
    pub fn apply(self, current: i64) -> Option<i64> {
        match self {
            StockChange::Add(delta) => current.checked_add(delta),
            StockChange::Set(value) => Some(value),
        }
    }
}

/// Precondition evaluated at commit time.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Condition {
    /// The row must exist.
    Exists,
    /// The row must exist and hold at least this quantity.
    AtLeast(i64),
}

impl Condition {
    pub fn holds(self, current_quantity: i64) -> bool {
        match self {
            Condition::Exists => true,
            Condition::AtLeast(min) => current_quantity >= min,
        }
    }
}

/// One row of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalUpdate {
    pub code: PartCode,
    pub change: Option<StockChange>,
    pub min_quantity: Option<i64>,
    pub condition: Condition,
}

impl ConditionalUpdate {
    /// Increase stock of an existing row.
    pub fn add(code: PartCode, delta: i64) -> Self {
        Self {
            code,
            change: Some(StockChange::Add(delta)),
            min_quantity: None,
            condition: Condition::Exists,
        }
    }

    /// Remove `need` units, only if at least `need` are on hand at commit time.
    pub fn consume(code: PartCode, need: i64) -> Self {
        Self {
            code,
            change: Some(StockChange::Add(-need)),
            min_quantity: None,
            condition: Condition::AtLeast(need),
        }
    }

    /// Update an existing row without touching its quantity.
    pub fn touch(code: PartCode) -> Self {
        Self {
            code,
            change: None,
            min_quantity: None,
            condition: Condition::Exists,
        }
    }

    pub fn with_change(mut self, change: StockChange) -> Self {
        self.change = Some(change);
        self
    }

    pub fn with_min_quantity(mut self, min_quantity: i64) -> Self {
        self.min_quantity = Some(min_quantity);
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }
}

/// Ordered set of conditional updates committed all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    updates: Vec<ConditionalUpdate>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, update: ConditionalUpdate) {
        self.updates.push(update);
    }

    pub fn with(mut self, update: ConditionalUpdate) -> Self {
        self.push(update);
        self
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn updates(&self) -> &[ConditionalUpdate] {
        &self.updates
    }

    /// First code that appears in more than one update, if any.
    pub fn duplicate_key(&self) -> Option<&PartCode> {
        let mut seen = HashSet::with_capacity(self.updates.len());
        self.updates
            .iter()
            .map(|u| &u.code)
            .find(|code| !seen.insert(*code))
    }
}
