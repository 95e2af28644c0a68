use chrono::Utc;
use tracing::{info, instrument, warn};

use partforge_core::PartCode;
use partforge_inventory::{NewPart, Part, PartPatch, QuantityUpdate, Shortfall};

use crate::store::{ConditionalUpdate, InventoryStore, Precondition, StockChange, StoreError, Transaction};

use super::error::InventoryError;

/// Create, read, list and adjust parts.
pub struct PartService<I> {
    inventory: I,
}

impl<I> PartService<I>
where
    I: InventoryStore,
{
    pub fn new(inventory: I) -> Self {
        Self { inventory }
    }

    /// Store a new part; fails if the code is already taken.
    #[instrument(skip(self, new_part), fields(code = %new_part.code()))]
    pub async fn create(&self, new_part: NewPart) -> Result<Part, InventoryError> {
        let part = new_part.into_part(Utc::now());
        match self.inventory.put(part.clone(), Precondition::MustNotExist).await {
            Ok(()) => {
                info!(code = %part.code, quantity = part.quantity, "part created");
                Ok(part)
            }
            Err(StoreError::ConditionFailed(_)) => Err(InventoryError::AlreadyExists { code: part.code }),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, code: &PartCode) -> Result<Part, InventoryError> {
        self.inventory
            .get(code)
            .await?
            .ok_or_else(|| InventoryError::part_not_found(code))
    }

    /// All parts sorted by code, optionally filtered on the below-minimum predicate.
    pub async fn list(&self, below_min: Option<bool>) -> Result<Vec<Part>, InventoryError> {
        let mut parts = self.inventory.scan().await?;
        if let Some(wanted) = below_min {
            parts.retain(|p| p.is_below_min() == wanted);
        }
        parts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(parts)
    }

    /// Apply a stock correction and/or a new minimum as one guarded write.
    #[instrument(skip(self, patch), fields(code = %code))]
    pub async fn update(&self, code: &PartCode, patch: PartPatch) -> Result<Part, InventoryError> {
        let current = self.get(code).await?;

        let need = patch.required_stock();
        if current.quantity < need {
            return Err(InventoryError::InsufficientStock {
                missing: vec![Shortfall {
                    code: code.clone(),
                    need,
                    have: current.quantity,
                    unknown_part: false,
                }],
            });
        }

        if let Some(QuantityUpdate::Delta(delta)) = patch.quantity {
            if current.quantity.checked_add(delta).is_none() {
                return Err(InventoryError::validation(
                    "quantity_delta",
                    format!("would overflow the stock of part {code}"),
                ));
            }
        }

        let mut update = match patch.quantity {
            Some(QuantityUpdate::Delta(delta)) if delta < 0 => ConditionalUpdate::consume(code.clone(), need),
            Some(QuantityUpdate::Delta(delta)) => ConditionalUpdate::add(code.clone(), delta),
            Some(QuantityUpdate::Absolute(value)) => {
                ConditionalUpdate::touch(code.clone()).with_change(StockChange::Set(value))
            }
            None => ConditionalUpdate::touch(code.clone()),
        };
        if let Some(min) = patch.min_quantity {
            update = update.with_min_quantity(min);
        }

        match self.inventory.transact(Transaction::new().with(update)).await {
            Ok(mut post) => post
                .pop()
                .ok_or_else(|| InventoryError::Store(StoreError::Backend("empty transaction result".into()))),
            Err(StoreError::TransactionCanceled(reason)) => {
                warn!(code = %code, %reason, "part update cancelled at commit");
                Err(InventoryError::UpdateConflict { code: code.clone() })
            }
            Err(e) => Err(e.into()),
        }
    }
}
