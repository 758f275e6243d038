use std::sync::Arc;

use crate::core::item_definition::ItemDefinition;
use crate::core::kitchen::Kitchen;
use crate::core::prepared_item::PreparedItem;
use crate::core::recipe::{Recipe, check_not_self_referential};
use crate::error::Result;
use crate::io::reader::{MemoryReaderFactory, ReaderFactory};
use crate::io::slice::SliceReaderFactory;

/// Produces a region of an externally supplied source item (the `--source`
/// file an apply session is given), the workhorse recipe for an unchanged
/// region carried forward from source to target.
#[derive(Debug)]
pub struct CopySourceRecipe {
    pub result: ItemDefinition,
    pub source: ItemDefinition,
    pub offset: u64,
    pub length: u64,
}

impl CopySourceRecipe {
    pub fn new(result: ItemDefinition, source: ItemDefinition, offset: u64, length: u64) -> Result<Self> {
        check_not_self_referential("copy_source", &result, std::slice::from_ref(&source))?;
        Ok(Self {
            result,
            source,
            offset,
            length,
        })
    }
}

impl Recipe for CopySourceRecipe {
    fn name(&self) -> &str {
        "copy_source"
    }

    fn result(&self) -> &ItemDefinition {
        &self.result
    }

    fn ingredients(&self) -> &[ItemDefinition] {
        std::slice::from_ref(&self.source)
    }

    fn declare_slices(&self, kitchen: &Kitchen) -> Result<()> {
        if let Some(source) = kitchen.fetch_ready_or_none(&self.source)? {
            if !source.source.supports_random_access() {
                if let Some(sequential) = source.source.as_sequential() {
                    let hash = self.result.hashes.first().cloned();
                    kitchen.request_slice(&self.source, sequential, self.offset, self.length, hash)?;
                }
            }
        }
        Ok(())
    }

    fn prepare(&self, kitchen: &Kitchen) -> Result<Arc<PreparedItem>> {
        let source = kitchen.fetch_ready(&self.source)?;
        if !source.source.supports_random_access() {
            let bytes = kitchen.fetch_slice(&self.source, self.offset, self.length)?;
            let factory: Arc<dyn ReaderFactory> = MemoryReaderFactory::new((*bytes).clone());
            return Ok(Arc::new(PreparedItem::new(self.result.clone(), factory)));
        }
        let factory: Arc<dyn ReaderFactory> =
            Arc::new(SliceReaderFactory::new(source.source.clone(), self.offset, self.length));
        Ok(Arc::new(PreparedItem::new(self.result.clone(), factory)))
    }
}
