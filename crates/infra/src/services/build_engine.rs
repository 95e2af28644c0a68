//! Transactional assembly builds.
//!
//! A build explodes the parent's bill of materials one level deep, pre-checks
//! stock, then commits a single `Transaction`: the parent gains `quantity`
//! units and each component loses `need` units guarded by `AtLeast(need)`.
//! The pre-check is advisory; the commit-time guard is what keeps stock
//! non-negative when builds race.

use tracing::{info, instrument, warn};

use partforge_core::PartCode;
use partforge_inventory::{Part, Requirement, explode, find_shortfalls};

use crate::store::{BomStore, ConditionalUpdate, InventoryStore, StoreError, Transaction};

use super::error::InventoryError;

/// Transaction for building `quantity` units of `parent_code` from `requirements`.
pub fn build_transaction(parent_code: &PartCode, quantity: i64, requirements: &[Requirement]) -> Transaction {
    let mut tx = Transaction::new().with(ConditionalUpdate::add(parent_code.clone(), quantity));
    for req in requirements {
        tx.push(ConditionalUpdate::consume(req.component_code.clone(), req.need));
    }
    tx
}

pub struct BuildEngine<I, B> {
    inventory: I,
    boms: B,
}

impl<I, B> BuildEngine<I, B>
where
    I: InventoryStore,
    B: BomStore,
{
    pub fn new(inventory: I, boms: B) -> Self {
        Self { inventory, boms }
    }

    /// Build `quantity` units of `parent_code`, returning the parent's post-build snapshot.
    #[instrument(skip(self), fields(parent_code = %parent_code))]
    pub async fn build(&self, parent_code: &PartCode, quantity: i64) -> Result<Part, InventoryError> {
        if quantity <= 0 {
            return Err(InventoryError::validation("quantity", "must be a positive integer"));
        }

        let bom = self.boms.query(parent_code).await?;
        if bom.is_empty() {
            return Err(InventoryError::NoBomDefined {
                parent_code: parent_code.clone(),
            });
        }

        let requirements = explode(&bom, quantity)?;
        let limit = self.inventory.max_transaction_items();
        let actual = requirements.len() + 1;
        if actual > limit {
            return Err(InventoryError::TransactionTooLarge { limit, actual });
        }

        let Some(parent) = self.inventory.get(parent_code).await? else {
            return Err(InventoryError::part_not_found(parent_code));
        };
        if parent.quantity.checked_add(quantity).is_none() {
            return Err(InventoryError::validation(
                "quantity",
                format!("would overflow the stock of part {parent_code}"),
            ));
        }

        let mut on_hand = Vec::with_capacity(requirements.len());
        for req in &requirements {
            let part = self.inventory.get(&req.component_code).await?;
            on_hand.push((req.component_code.clone(), part.map(|p| p.quantity)));
        }
        let missing = find_shortfalls(&requirements, |code| {
            on_hand
                .iter()
                .find(|(c, _)| c == code)
                .and_then(|(_, q)| *q)
        });
        if !missing.is_empty() {
            return Err(InventoryError::InsufficientStock { missing });
        }

        let tx = build_transaction(parent_code, quantity, &requirements);
        match self.inventory.transact(tx).await {
            Ok(post_images) => {
                let parent = post_images
                    .into_iter()
                    .find(|p| &p.code == parent_code)
                    .ok_or_else(|| {
                        InventoryError::Store(StoreError::Backend(format!(
                            "transaction result is missing parent {parent_code}"
                        )))
                    })?;
                info!(
                    parent_code = %parent_code,
                    quantity,
                    components = requirements.len(),
                    new_quantity = parent.quantity,
                    "assembly built"
                );
                Ok(parent)
            }
            Err(StoreError::TransactionCanceled(reason)) => {
                warn!(parent_code = %parent_code, %reason, "build cancelled at commit");
                Err(InventoryError::BuildConflict {
                    parent_code: parent_code.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}
