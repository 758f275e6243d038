use std::sync::Arc;

use crate::core::cookbook::Cookbook;
use crate::core::item_definition::ItemDefinition;

/// A loaded diff archive: the recipe catalog that can produce its target
/// item, the target item itself, and the set of items the caller must
/// supply (typically a `--source` file) before the archive can be applied.
#[derive(Debug)]
pub struct Archive {
    pub target: ItemDefinition,
    pub required_sources: Vec<ItemDefinition>,
    pub cookbook: Arc<Cookbook>,
}

impl Archive {
    pub fn new(target: ItemDefinition, required_sources: Vec<ItemDefinition>, cookbook: Cookbook) -> Self {
        Self {
            target,
            required_sources,
            cookbook: Arc::new(cookbook),
        }
    }
}
