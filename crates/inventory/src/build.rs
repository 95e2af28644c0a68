//! Single-level BOM explosion and stock sufficiency checks for builds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use partforge_core::{DomainError, DomainResult, PartCode};

use crate::bom::BomEntry;

/// Stock a build consumes from one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub component_code: PartCode,
    pub units_per_parent: i64,
    pub need: i64,
}

/// A component that cannot cover its requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub code: PartCode,
    pub need: i64,
    pub have: i64,
    /// The BOM references a part that was never created.
    pub unknown_part: bool,
}

/// Explode `entries` for a build of `quantity` units.
///
/// Returns one requirement per distinct component, sorted by component code.
/// Rows naming the same component are merged. Overflowing multiplication is
/// reported against `quantity`.
pub fn explode(entries: &[BomEntry], quantity: i64) -> DomainResult<Vec<Requirement>> {
    let overflow = || DomainError::validation("quantity", "is too large for the bill of materials");

    let mut merged: BTreeMap<&PartCode, (i64, i64)> = BTreeMap::new();
    for entry in entries {
        let need = quantity
            .checked_mul(entry.units_per_parent)
            .ok_or_else(overflow)?;
        let slot = merged.entry(&entry.component_code).or_insert((0, 0));
        slot.0 = slot.0.checked_add(entry.units_per_parent).ok_or_else(overflow)?;
        slot.1 = slot.1.checked_add(need).ok_or_else(overflow)?;
    }

    Ok(merged
        .into_iter()
        .map(|(code, (units_per_parent, need))| Requirement {
            component_code: code.clone(),
            units_per_parent,
            need,
        })
        .collect())
}

/// Compare requirements against current stock.
///
/// `stock` yields the on-hand quantity of a component, or `None` when the part
/// does not exist (treated as zero on hand and flagged).
pub fn find_shortfalls<F>(requirements: &[Requirement], stock: F) -> Vec<Shortfall>
where
    F: Fn(&PartCode) -> Option<i64>,
{
    requirements
        .iter()
        .filter_map(|req| {
            let on_hand = stock(&req.component_code);
            let have = on_hand.unwrap_or(0);
            (have < req.need).then(|| Shortfall {
                code: req.component_code.clone(),
                need: req.need,
                have,
                unknown_part: on_hand.is_none(),
            })
        })
        .collect()
}
