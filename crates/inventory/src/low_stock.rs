//! Low-stock detection: the below-minimum set, its signature, and the alert report.
//!
//! The signature is the lexicographically sorted, comma-joined list of part
//! codes currently below their minimum. Comparing it against the previously
//! persisted signature is the only trigger for a notification, so it must not
//! depend on the order in which parts were scanned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::part::Part;

/// Fixed key of the persisted low-stock state record.
pub const LOW_STOCK_STATE_KEY: &str = "low_stock";

/// Subject line used for low-stock notifications.
pub const LOW_STOCK_ALERT_SUBJECT: &str = "Low Stock Alert";

/// Persisted result of the most recent scan that changed the low-stock set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockState {
    pub signature: String,
    pub updated_at: DateTime<Utc>,
}

/// Parts currently below their minimum quantity, sorted by code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LowStockSet {
    items: Vec<Part>,
}

impl LowStockSet {
    pub fn from_parts<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = Part>,
    {
        let mut items: Vec<Part> = parts.into_iter().filter(Part::is_below_min).collect();
        items.sort_by(|a, b| a.code.cmp(&b.code));
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Deterministic summary of the set; empty when nothing is low.
    pub fn signature(&self) -> String {
        self.items
            .iter()
            .map(|p| p.code.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Human-readable multi-line report, one line per low item.
    pub fn report(&self, as_of: DateTime<Utc>) -> String {
        let mut lines = Vec::with_capacity(self.items.len() + 2);
        lines.push(format!(
            "Low-stock items as of {} ({} items):",
            as_of.format("%Y-%m-%dT%H:%M:%SZ"),
            self.items.len()
        ));
        lines.push(String::new());
        for p in &self.items {
            lines.push(format!(
                "- {:15} {:30} qty={}  min={}",
                p.code.as_str(),
                p.name,
                p.quantity,
                p.min_quantity
            ));
        }
        lines.join("\n")
    }
}
