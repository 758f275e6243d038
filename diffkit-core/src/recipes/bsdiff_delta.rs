use std::sync::Arc;

use tracing::debug;

use crate::core::item_definition::ItemDefinition;
use crate::core::kitchen::Kitchen;
use crate::core::prepared_item::PreparedItem;
use crate::core::recipe::{Recipe, check_not_self_referential};
use crate::error::{DiffError, Result};
use crate::io::reader::Reader;

/// Reconstructs `result` by applying a bsdiff binary patch against `basis`.
#[derive(Debug)]
pub struct BsdiffDeltaRecipe {
    pub result: ItemDefinition,
    pub basis: ItemDefinition,
    pub patch: ItemDefinition,
    ingredients: [ItemDefinition; 2],
}

impl BsdiffDeltaRecipe {
    pub fn new(result: ItemDefinition, basis: ItemDefinition, patch: ItemDefinition) -> Result<Self> {
        check_not_self_referential("bsdiff_delta", &result, &[basis.clone(), patch.clone()])?;
        let ingredients = [basis.clone(), patch.clone()];
        Ok(Self {
            result,
            basis,
            patch,
            ingredients,
        })
    }
}

impl Recipe for BsdiffDeltaRecipe {
    fn name(&self) -> &str {
        "bsdiff_delta"
    }

    fn result(&self) -> &ItemDefinition {
        &self.result
    }

    fn ingredients(&self) -> &[ItemDefinition] {
        &self.ingredients
    }

    fn prepare(&self, kitchen: &Kitchen) -> Result<Arc<PreparedItem>> {
        let basis = kitchen.fetch_ready(&self.basis)?;
        let patch = kitchen.fetch_ready(&self.patch)?;

        let basis_reader = basis.open()?;
        let mut basis_bytes = vec![0u8; basis_reader.size() as usize];
        basis_reader.read_at(0, &mut basis_bytes)?;

        let patch_reader = patch.open()?;
        let mut patch_bytes = vec![0u8; patch_reader.size() as usize];
        patch_reader.read_at(0, &mut patch_bytes)?;

        let mut out = Vec::with_capacity(self.result.length as usize);
        bsdiff::patch(&basis_bytes, &mut patch_bytes.as_slice(), &mut out)
            .map_err(|e| DiffError::BsdiffApplyFailed(e.to_string()))?;

        if out.len() as u64 != self.result.length {
            return Err(DiffError::ReaderReadFailure {
                expected: self.result.length,
                actual: out.len() as u64,
            });
        }

        debug!(result = %self.result, patch_len = patch_bytes.len(), "bsdiff_delta applied");
        Ok(PreparedItem::from_bytes(self.result.clone(), out))
    }
}
