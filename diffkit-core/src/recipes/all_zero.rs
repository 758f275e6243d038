use std::sync::Arc;

use crate::core::item_definition::ItemDefinition;
use crate::core::kitchen::Kitchen;
use crate::core::prepared_item::PreparedItem;
use crate::core::recipe::Recipe;
use crate::error::Result;

/// Produces `result.length` zero bytes without reading anything — used for
/// sparse regions of a target that never held meaningful data.
#[derive(Debug)]
pub struct AllZeroRecipe {
    pub result: ItemDefinition,
}

impl AllZeroRecipe {
    pub fn new(result: ItemDefinition) -> Self {
        Self { result }
    }
}

impl Recipe for AllZeroRecipe {
    fn name(&self) -> &str {
        "all_zero"
    }

    fn result(&self) -> &ItemDefinition {
        &self.result
    }

    fn ingredients(&self) -> &[ItemDefinition] {
        &[]
    }

    fn prepare(&self, _kitchen: &Kitchen) -> Result<Arc<PreparedItem>> {
        let bytes = vec![0u8; self.result.length as usize];
        Ok(PreparedItem::from_bytes(self.result.clone(), bytes))
    }
}
