use std::sync::Arc;

use tracing::debug;

use crate::codec::zstdc;
use crate::core::item_definition::ItemDefinition;
use crate::core::kitchen::Kitchen;
use crate::core::prepared_item::PreparedItem;
use crate::core::recipe::{Recipe, check_not_self_referential};
use crate::error::Result;
use crate::io::reader::Reader;

/// Decompresses a zstd stream that was encoded with a `ref_prefix` basis, so
/// matches can point back into bytes (`basis`) that are never themselves
/// emitted in the delta — the long-distance-match counterpart to a plain
/// `zstd_decompression`.
#[derive(Debug)]
pub struct ZstdDeltaRecipe {
    pub result: ItemDefinition,
    pub basis: ItemDefinition,
    pub delta: ItemDefinition,
    ingredients: [ItemDefinition; 2],
}

impl ZstdDeltaRecipe {
    pub fn new(result: ItemDefinition, basis: ItemDefinition, delta: ItemDefinition) -> Result<Self> {
        check_not_self_referential("zstd_delta", &result, &[basis.clone(), delta.clone()])?;
        let ingredients = [basis.clone(), delta.clone()];
        Ok(Self {
            result,
            basis,
            delta,
            ingredients,
        })
    }
}

impl Recipe for ZstdDeltaRecipe {
    fn name(&self) -> &str {
        "zstd_delta"
    }

    fn result(&self) -> &ItemDefinition {
        &self.result
    }

    fn ingredients(&self) -> &[ItemDefinition] {
        &self.ingredients
    }

    fn prepare(&self, kitchen: &Kitchen) -> Result<Arc<PreparedItem>> {
        let basis = kitchen.fetch_ready(&self.basis)?;
        let delta = kitchen.fetch_ready(&self.delta)?;

        let basis_reader = basis.open()?;
        let mut basis_bytes = vec![0u8; basis_reader.size() as usize];
        basis_reader.read_at(0, &mut basis_bytes)?;

        let delta_reader = delta.open()?;
        let mut delta_bytes = vec![0u8; delta_reader.size() as usize];
        delta_reader.read_at(0, &mut delta_bytes)?;

        let raw = zstdc::decompress(&delta_bytes, Some(&basis_bytes), self.result.length)?;
        debug!(result = %self.result, basis_len = basis_bytes.len(), delta_len = delta_bytes.len(), "zstd_delta applied");
        Ok(PreparedItem::from_bytes(self.result.clone(), raw))
    }
}
