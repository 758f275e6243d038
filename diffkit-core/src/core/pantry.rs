use std::sync::Arc;

use crate::core::item_definition::ItemDefinition;
use crate::core::item_lookup::ItemIndex;
use crate::core::prepared_item::PreparedItem;
use crate::error::Result;

/// Indexes every item already available for use as a recipe ingredient:
/// items supplied up front (a `--source` file, an inline asset already
/// decoded) as well as items the kitchen has prepared during this session.
#[derive(Debug, Default)]
pub struct Pantry {
    index: ItemIndex<Arc<PreparedItem>>,
}

impl Pantry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stock(&mut self, item: Arc<PreparedItem>) {
        self.index.insert(item.definition.clone(), item);
    }

    pub fn find(&self, item: &ItemDefinition) -> Result<Option<Arc<PreparedItem>>> {
        Ok(self.index.find(item)?.cloned())
    }

    pub fn contains(&self, item: &ItemDefinition) -> Result<bool> {
        Ok(self.find(item)?.is_some())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn all_items(&self) -> impl Iterator<Item = &Arc<PreparedItem>> {
        self.index.entries().iter().map(|(_, v)| v)
    }
}
