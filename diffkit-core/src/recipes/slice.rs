use std::sync::Arc;

use crate::core::item_definition::ItemDefinition;
use crate::core::kitchen::Kitchen;
use crate::core::prepared_item::PreparedItem;
use crate::core::recipe::{Recipe, check_not_self_referential};
use crate::error::Result;
use crate::io::reader::{MemoryReaderFactory, ReaderFactory};
use crate::io::slice::SliceReaderFactory;

/// Produces a bounded byte range `[offset, offset+length)` out of a single
/// ingredient item already available in the kitchen.
#[derive(Debug)]
pub struct SliceRecipe {
    pub result: ItemDefinition,
    pub parent: ItemDefinition,
    pub offset: u64,
    pub length: u64,
}

impl SliceRecipe {
    pub fn new(result: ItemDefinition, parent: ItemDefinition, offset: u64, length: u64) -> Result<Self> {
        check_not_self_referential("slice", &result, std::slice::from_ref(&parent))?;
        Ok(Self {
            result,
            parent,
            offset,
            length,
        })
    }
}

impl Recipe for SliceRecipe {
    fn name(&self) -> &str {
        "slice"
    }

    fn result(&self) -> &ItemDefinition {
        &self.result
    }

    fn ingredients(&self) -> &[ItemDefinition] {
        std::slice::from_ref(&self.parent)
    }

    fn declare_slices(&self, kitchen: &Kitchen) -> Result<()> {
        if let Some(parent) = kitchen.fetch_ready_or_none(&self.parent)? {
            if !parent.source.supports_random_access() {
                if let Some(sequential) = parent.source.as_sequential() {
                    let hash = self.result.hashes.first().cloned();
                    kitchen.request_slice(&self.parent, sequential, self.offset, self.length, hash)?;
                }
            }
        }
        Ok(())
    }

    fn prepare(&self, kitchen: &Kitchen) -> Result<Arc<PreparedItem>> {
        let parent = kitchen.fetch_ready(&self.parent)?;
        if !parent.source.supports_random_access() {
            let bytes = kitchen.fetch_slice(&self.parent, self.offset, self.length)?;
            let factory: Arc<dyn ReaderFactory> = MemoryReaderFactory::new((*bytes).clone());
            return Ok(Arc::new(PreparedItem::new(self.result.clone(), factory)));
        }
        let factory: Arc<dyn ReaderFactory> =
            Arc::new(SliceReaderFactory::new(parent.source.clone(), self.offset, self.length));
        Ok(Arc::new(PreparedItem::new(self.result.clone(), factory)))
    }
}
