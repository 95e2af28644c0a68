use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use partforge_core::{DomainError, DomainResult, PartCode, coerce};

/// A stocked inventory item.
///
/// `quantity` never goes below zero once stored; that is enforced by the
/// store's conditional writes, not by this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub code: PartCode,
    pub name: String,
    pub quantity: i64,
    pub min_quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Part {
    pub fn is_below_min(&self) -> bool {
        self.quantity < self.min_quantity
    }
}

/// Validated part creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPart {
    code: PartCode,
    name: String,
    quantity: i64,
    min_quantity: i64,
}

impl NewPart {
    /// Missing quantities default to zero; present ones must be non-negative.
    pub fn new(
        code: PartCode,
        name: impl Into<String>,
        quantity: Option<i64>,
        min_quantity: Option<i64>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name", "must be a non-empty string"));
        }
        let quantity = coerce::non_negative("quantity", quantity.unwrap_or(0))?;
        let min_quantity = coerce::non_negative("min_quantity", min_quantity.unwrap_or(0))?;

        Ok(Self {
            code,
            name: name.trim().to_string(),
            quantity,
            min_quantity,
        })
    }

    pub fn code(&self) -> &PartCode {
        &self.code
    }

    pub fn into_part(self, now: DateTime<Utc>) -> Part {
        Part {
            code: self.code,
            name: self.name,
            quantity: self.quantity,
            min_quantity: self.min_quantity,
            created_at: now,
            updated_at: now,
        }
    }
}

/// How a patch changes the stocked quantity.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum QuantityUpdate {
    /// Relative correction; may be negative.
    Delta(i64),
    /// Absolute recount; never negative.
    Absolute(i64),
}

/// Validated partial update of a part.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PartPatch {
    pub quantity: Option<QuantityUpdate>,
    pub min_quantity: Option<i64>,
}

impl PartPatch {
    pub fn new(
        quantity_delta: Option<i64>,
        quantity: Option<i64>,
        min_quantity: Option<i64>,
    ) -> DomainResult<Self> {
        let quantity = match (quantity_delta, quantity) {
            (Some(_), Some(_)) => {
                return Err(DomainError::validation(
                    "quantity",
                    "cannot be combined with quantity_delta",
                ));
            }
            (Some(0), None) => {
                return Err(DomainError::validation("quantity_delta", "cannot be zero"));
            }
            (Some(delta), None) => Some(QuantityUpdate::Delta(delta)),
            (None, Some(q)) => Some(QuantityUpdate::Absolute(coerce::non_negative("quantity", q)?)),
            (None, None) => None,
        };

        let min_quantity = min_quantity
            .map(|m| coerce::non_negative("min_quantity", m))
            .transpose()?;

        if quantity.is_none() && min_quantity.is_none() {
            return Err(DomainError::validation(
                "body",
                "one of quantity_delta, quantity or min_quantity is required",
            ));
        }

        Ok(Self {
            quantity,
            min_quantity,
        })
    }

    /// Stock that must be on hand for the patch to keep quantity non-negative.
    pub fn required_stock(&self) -> i64 {
        match self.quantity {
            Some(QuantityUpdate::Delta(d)) if d < 0 => d.saturating_neg(),
            _ => 0,
        }
    }
}
