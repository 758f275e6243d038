use std::sync::Arc;

use crate::core::item_definition::ItemDefinition;
use crate::core::item_lookup::ItemIndex;
use crate::core::recipe::Recipe;
use crate::error::Result;

/// Indexes every recipe known to an archive by the item it produces. Several
/// recipes may share a result item; the kitchen tries them in registration
/// order until one succeeds.
#[derive(Debug, Default)]
pub struct Cookbook {
    index: ItemIndex<Vec<Arc<dyn Recipe>>>,
}

impl Cookbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups `recipes` by result item (preserving registration order within
    /// each group) and builds the lookup index in one pass.
    pub fn from_recipes(recipes: Vec<Arc<dyn Recipe>>) -> Result<Self> {
        let mut groups: Vec<(ItemDefinition, Vec<Arc<dyn Recipe>>)> = Vec::new();
        for recipe in recipes {
            let result = recipe.result().clone();
            let mut placed = false;
            for (item, group) in groups.iter_mut() {
                if item.match_against(&result)? == crate::core::item_definition::MatchResult::Match {
                    group.push(recipe.clone());
                    placed = true;
                    break;
                }
            }
            if !placed {
                groups.push((result, vec![recipe]));
            }
        }
        let mut index = ItemIndex::new();
        for (item, group) in groups {
            index.insert(item, group);
        }
        Ok(Self { index })
    }

    /// All recipes registered that produce an item matching `item`, in
    /// registration order.
    pub fn recipes_for(&self, item: &ItemDefinition) -> Result<Vec<Arc<dyn Recipe>>> {
        Ok(self.index.find(item)?.cloned().unwrap_or_default())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Every (result item, candidate recipes) group, in registration order —
    /// used by diagnostic surfaces like the CLI's `list` command.
    pub fn groups(&self) -> &[(ItemDefinition, Vec<Arc<dyn Recipe>>)] {
        self.index.entries()
    }
}
