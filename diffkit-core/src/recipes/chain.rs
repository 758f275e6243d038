use std::sync::Arc;

use crate::core::item_definition::ItemDefinition;
use crate::core::kitchen::Kitchen;
use crate::core::prepared_item::PreparedItem;
use crate::core::recipe::{Recipe, check_not_self_referential};
use crate::error::Result;
use crate::io::chain::ChainReaderFactory;
use crate::io::reader::ReaderFactory;

/// Concatenates its ingredients, in order, into one logical byte-stream.
#[derive(Debug)]
pub struct ChainRecipe {
    pub result: ItemDefinition,
    pub parts: Vec<ItemDefinition>,
}

impl ChainRecipe {
    pub fn new(result: ItemDefinition, parts: Vec<ItemDefinition>) -> Result<Self> {
        check_not_self_referential("chain", &result, &parts)?;
        Ok(Self { result, parts })
    }
}

impl Recipe for ChainRecipe {
    fn name(&self) -> &str {
        "chain"
    }

    fn result(&self) -> &ItemDefinition {
        &self.result
    }

    fn ingredients(&self) -> &[ItemDefinition] {
        &self.parts
    }

    fn prepare(&self, kitchen: &Kitchen) -> Result<Arc<PreparedItem>> {
        let mut segments = Vec::with_capacity(self.parts.len());
        for part in &self.parts {
            let prepared = kitchen.fetch_ready(part)?;
            segments.push(prepared.source.clone());
        }
        let factory: Arc<dyn ReaderFactory> = Arc::new(ChainReaderFactory::new(segments));
        Ok(Arc::new(PreparedItem::new(self.result.clone(), factory)))
    }
}
