use std::sync::Arc;

use crate::core::item_definition::ItemDefinition;
use crate::core::kitchen::Kitchen;
use crate::core::prepared_item::PreparedItem;
use crate::core::recipe::{Recipe, check_not_self_referential};
use crate::error::Result;
use crate::io::reader::ReaderFactory;
use crate::io::slice::SliceReaderFactory;

/// Produces a region of the archive's single "remainder" blob — the
/// leftover uncompressed payload bytes that didn't fit any other recipe
/// type, stored once and sliced by every `remainder_chunk` that needs part
/// of it.
#[derive(Debug)]
pub struct RemainderChunkRecipe {
    pub result: ItemDefinition,
    pub remainder: ItemDefinition,
    pub offset: u64,
    pub length: u64,
}

impl RemainderChunkRecipe {
    pub fn new(result: ItemDefinition, remainder: ItemDefinition, offset: u64, length: u64) -> Result<Self> {
        check_not_self_referential("remainder_chunk", &result, std::slice::from_ref(&remainder))?;
        Ok(Self {
            result,
            remainder,
            offset,
            length,
        })
    }
}

impl Recipe for RemainderChunkRecipe {
    fn name(&self) -> &str {
        "remainder_chunk"
    }

    fn result(&self) -> &ItemDefinition {
        &self.result
    }

    fn ingredients(&self) -> &[ItemDefinition] {
        std::slice::from_ref(&self.remainder)
    }

    fn prepare(&self, kitchen: &Kitchen) -> Result<Arc<PreparedItem>> {
        let remainder = kitchen.fetch_ready(&self.remainder)?;
        let factory: Arc<dyn ReaderFactory> = Arc::new(SliceReaderFactory::new(
            remainder.source.clone(),
            self.offset,
            self.length,
        ));
        Ok(Arc::new(PreparedItem::new(self.result.clone(), factory)))
    }
}
