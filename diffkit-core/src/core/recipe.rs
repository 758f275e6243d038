use std::fmt::Debug;
use std::sync::Arc;

use crate::core::item_definition::ItemDefinition;
use crate::core::kitchen::Kitchen;
use crate::core::prepared_item::PreparedItem;
use crate::error::Result;

/// A declarative, byte-producing instruction: given its ingredients already
/// prepared by the kitchen, produce the bytes of `result()`.
pub trait Recipe: Send + Sync + Debug {
    /// Stable recipe name as it appears in an archive's recipe catalog,
    /// e.g. `"zstd_delta"`.
    fn name(&self) -> &str;

    /// The item this recipe produces when prepared.
    fn result(&self) -> &ItemDefinition;

    /// Other items that must be ready in the kitchen's pantry before
    /// `prepare` can run.
    fn ingredients(&self) -> &[ItemDefinition];

    /// Produces the result item's bytes, looking up each ingredient's
    /// prepared bytes through `kitchen`. Called with the kitchen's
    /// coordination mutex *not* held, so recipes may themselves request
    /// nested kitchen resolution (e.g. `nested_diff`) without deadlocking.
    fn prepare(&self, kitchen: &Kitchen) -> Result<Arc<PreparedItem>>;

    /// Called during a `select_only` pass instead of `prepare`: registers
    /// any byte ranges this recipe will need out of a sequential-only
    /// ingredient with the kitchen's slicer, so `resume_slicing` has
    /// something to extract before a later `prepare` pass calls
    /// `fetch_slice`. Recipes whose ingredients are always random-access
    /// (the common case) leave this as a no-op.
    fn declare_slices(&self, _kitchen: &Kitchen) -> Result<()> {
        Ok(())
    }
}

/// Validates the "no self-reference" invariant shared by every recipe: the
/// result item must not equal any ingredient.
pub fn check_not_self_referential(name: &str, result: &ItemDefinition, ingredients: &[ItemDefinition]) -> Result<()> {
    for ing in ingredients {
        if result.match_against(ing)? == crate::core::item_definition::MatchResult::Match {
            return Err(crate::error::DiffError::RecipeSelfReferential(name.to_string()));
        }
    }
    Ok(())
}
