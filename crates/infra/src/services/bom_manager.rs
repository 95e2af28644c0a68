use tracing::{info, instrument};

use partforge_core::PartCode;
use partforge_inventory::{BomEntry, BomLineInput, validate_components};

use crate::store::{BomKey, BomStore};

use super::error::InventoryError;

/// Owns the full component list of each parent.
pub struct BomManager<B> {
    boms: B,
}

impl<B> BomManager<B>
where
    B: BomStore,
{
    pub fn new(boms: B) -> Self {
        Self { boms }
    }

    /// Replace every component of `parent_code` with `components`.
    ///
    /// The whole list is validated before anything is written. Concurrent
    /// replaces of the same parent are last-writer-wins. Returns the number of
    /// components stored.
    #[instrument(skip(self, components), fields(parent_code = %parent_code, components = components.len()))]
    pub async fn replace_bom(
        &self,
        parent_code: &PartCode,
        components: &[BomLineInput],
    ) -> Result<usize, InventoryError> {
        let lines = validate_components(parent_code, components)?;

        let existing = self.boms.query(parent_code).await?;
        let deletes: Vec<BomKey> = existing.iter().map(BomKey::from).collect();
        let inserts: Vec<BomEntry> = lines.into_iter().map(|l| l.into_entry(parent_code)).collect();
        let count = inserts.len();

        self.boms.batch_write(deletes, inserts).await?;

        info!(parent_code = %parent_code, count, replaced = existing.len(), "bill of materials replaced");
        Ok(count)
    }

    /// Current components of `parent_code`, sorted by component code.
    pub async fn get_bom(&self, parent_code: &PartCode) -> Result<Vec<BomEntry>, InventoryError> {
        let mut entries = self.boms.query(parent_code).await?;
        entries.sort_by(|a, b| a.component_code.cmp(&b.component_code));
        Ok(entries)
    }
}
