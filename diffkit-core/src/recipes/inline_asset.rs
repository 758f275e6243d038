use std::sync::Arc;

use crate::core::item_definition::ItemDefinition;
use crate::core::kitchen::Kitchen;
use crate::core::prepared_item::PreparedItem;
use crate::core::recipe::Recipe;
use crate::error::{DiffError, Result};

/// Produces bytes embedded directly in the archive (small fixed content
/// that compresses worse than it costs to reference elsewhere).
#[derive(Debug)]
pub struct InlineAssetRecipe {
    pub result: ItemDefinition,
    pub bytes: Arc<Vec<u8>>,
}

impl InlineAssetRecipe {
    pub fn new(result: ItemDefinition, bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() as u64 != result.length {
            return Err(DiffError::InlineAssetByteCountMismatch {
                expected: result.length,
                actual: bytes.len() as u64,
            });
        }
        Ok(Self {
            result,
            bytes: Arc::new(bytes),
        })
    }
}

impl Recipe for InlineAssetRecipe {
    fn name(&self) -> &str {
        "inline_asset"
    }

    fn result(&self) -> &ItemDefinition {
        &self.result
    }

    fn ingredients(&self) -> &[ItemDefinition] {
        &[]
    }

    fn prepare(&self, _kitchen: &Kitchen) -> Result<Arc<PreparedItem>> {
        Ok(PreparedItem::from_bytes(
            self.result.clone(),
            self.bytes.as_ref().clone(),
        ))
    }
}
