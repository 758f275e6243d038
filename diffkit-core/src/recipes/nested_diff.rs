use std::sync::Arc;

use crate::core::item_definition::ItemDefinition;
use crate::core::kitchen::Kitchen;
use crate::core::prepared_item::PreparedItem;
use crate::core::recipe::{Recipe, check_not_self_referential};
use crate::error::Result;
use crate::format::{legacy, standard};
use crate::io::reader::Reader;

/// Produces `result` by treating its ingredient as a complete sub-archive:
/// parses it and resolves its own target item through a fresh kitchen that
/// is seeded with everything the outer kitchen already knows (so the
/// nested archive's `copy_source` recipes can still reach the outer
/// session's source file).
#[derive(Debug)]
pub struct NestedDiffRecipe {
    pub result: ItemDefinition,
    pub nested_bytes: ItemDefinition,
}

impl NestedDiffRecipe {
    pub fn new(result: ItemDefinition, nested_bytes: ItemDefinition) -> Result<Self> {
        check_not_self_referential("nested_diff", &result, std::slice::from_ref(&nested_bytes))?;
        Ok(Self { result, nested_bytes })
    }
}

impl Recipe for NestedDiffRecipe {
    fn name(&self) -> &str {
        "nested_diff"
    }

    fn result(&self) -> &ItemDefinition {
        &self.result
    }

    fn ingredients(&self) -> &[ItemDefinition] {
        std::slice::from_ref(&self.nested_bytes)
    }

    fn prepare(&self, kitchen: &Kitchen) -> Result<Arc<PreparedItem>> {
        let nested_bytes_item = kitchen.fetch_ready(&self.nested_bytes)?;
        let reader = nested_bytes_item.open()?;
        let mut buf = vec![0u8; reader.size() as usize];
        reader.read_at(0, &mut buf)?;

        let (archive, mut pantry) = if standard::is_this_format(&buf) {
            standard::read_archive(&mut buf.as_slice())?
        } else {
            legacy::read_archive(&mut buf.as_slice())?
        };

        for item in kitchen.known_items_snapshot().all_items() {
            pantry.stock(Arc::clone(item));
        }

        let nested_kitchen = Kitchen::new(vec![Arc::clone(&archive.cookbook)], pantry);
        let target = archive.target.clone();
        nested_kitchen.request_item(&target)
    }
}
