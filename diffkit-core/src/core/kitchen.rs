use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use crate::core::cookbook::Cookbook;
use crate::core::item_definition::ItemDefinition;
use crate::core::pantry::Pantry;
use crate::core::prepared_item::PreparedItem;
use crate::core::recipe::Recipe;
use crate::core::slicer::Slicer;
use crate::error::{DiffError, Result};
use crate::hash::Hash;
use crate::io::reader::VerifyingReaderFactory;
use crate::io::sequential::SequentialReaderFactory;

struct PlanNode {
    item: ItemDefinition,
    recipe: Arc<dyn Recipe>,
}

struct KitchenInner {
    ready: Pantry,
    supplied: Pantry,
    cookbooks: Vec<Arc<Cookbook>>,
}

/// The apply-time dependency resolution engine. Given one or more cookbooks
/// (from possibly-nested archives) and a pantry of items the caller already
/// has, `request_item` produces an item's bytes by recursively preparing
/// whatever recipe chain gets there.
///
/// The coordination mutex is held only while walking the dependency graph
/// (`select`) and while recording a freshly-prepared item into the ready
/// pantry; it is released for the whole duration of `Recipe::prepare`, so a
/// `nested_diff` recipe may resolve its own sub-archive's kitchen without
/// any risk of re-entering this kitchen's lock.
pub struct Kitchen {
    inner: Mutex<KitchenInner>,
    /// One slicer per parent item that has ever had a slice requested
    /// against it, created lazily the first time `copy_source`/`slice`
    /// finds a sequential-only ingredient.
    slicers: Mutex<HashMap<ItemDefinition, Arc<Slicer>>>,
}

impl Kitchen {
    pub fn new(cookbooks: Vec<Arc<Cookbook>>, supplied: Pantry) -> Self {
        Self {
            inner: Mutex::new(KitchenInner {
                ready: Pantry::new(),
                supplied,
                cookbooks,
            }),
            slicers: Mutex::new(HashMap::new()),
        }
    }

    /// Registers that `length` bytes at `offset` of `parent_item` (a
    /// sequential-only ingredient) will be needed, spawning that parent's
    /// slicer on first use. Called by `copy_source`/`slice` instead of
    /// slicing the parent's reader directly when it can't random-access.
    pub fn request_slice(
        &self,
        parent_item: &ItemDefinition,
        sequential: Arc<dyn SequentialReaderFactory>,
        offset: u64,
        length: u64,
        hash: Option<Hash>,
    ) -> Result<()> {
        let slicer = {
            let mut slicers = self.slicers.lock().unwrap();
            Arc::clone(
                slicers
                    .entry(parent_item.clone())
                    .or_insert_with(|| Slicer::new(sequential)),
            )
        };
        slicer.request_slice(offset, length, hash)
    }

    /// Blocks until the slice previously registered via `request_slice` has
    /// been produced, fetching it from its parent's slicer.
    pub fn fetch_slice(&self, parent_item: &ItemDefinition, offset: u64, length: u64) -> Result<Arc<Vec<u8>>> {
        let slicer = {
            let slicers = self.slicers.lock().unwrap();
            slicers.get(parent_item).cloned().ok_or_else(|| {
                DiffError::KitchenItemNotReady(format!("no slicer registered for {parent_item}"))
            })?
        };
        slicer.fetch_slice(offset, length)
    }

    /// Starts (or resumes, if paused) every registered slicer's worker
    /// thread. Does not block for extraction to finish — `fetch_slice`
    /// (via a recipe's `prepare`) is what blocks on a given slice becoming
    /// available. Safe to call with no slicers registered (a no-op).
    pub fn resume_slicing(&self) -> Result<()> {
        let slicers: Vec<Arc<Slicer>> = self.slicers.lock().unwrap().values().cloned().collect();
        for slicer in slicers {
            slicer.resume_slicing()?;
        }
        Ok(())
    }

    /// Cancels every registered slicer and joins its worker thread.
    pub fn cancel_slicing(&self) {
        let slicers: Vec<Arc<Slicer>> = self.slicers.lock().unwrap().values().cloned().collect();
        for slicer in slicers {
            slicer.cancel_slicing();
        }
    }

    pub fn supply(&self, item: Arc<PreparedItem>) {
        let mut inner = self.inner.lock().unwrap();
        inner.supplied.stock(item);
    }

    /// Fetches an item this kitchen has already prepared or that was
    /// supplied up front. Called by recipes during `prepare` to read their
    /// ingredients' bytes — never triggers further resolution.
    pub fn fetch_ready(&self, item: &ItemDefinition) -> Result<Arc<PreparedItem>> {
        let inner = self.inner.lock().unwrap();
        if let Some(found) = inner.ready.find(item)? {
            return Ok(found);
        }
        if let Some(found) = inner.supplied.find(item)? {
            return Ok(found);
        }
        Err(DiffError::KitchenItemNotReady(item.to_string()))
    }

    /// Alias for `fetch_ready` under the name the apply-session façade uses.
    pub fn fetch_item(&self, item: &ItemDefinition) -> Result<Arc<PreparedItem>> {
        self.fetch_ready(item)
    }

    /// Builds a preparation plan for each of `items` and runs it. In
    /// `select_only` mode, recipes are never invoked — only the dependency
    /// graph is walked, which is enough for `copy_source`/`slice` to
    /// register every slice they'll need against a sequential-only source
    /// before `resume_slicing` starts the workers. Returns `true` iff every
    /// item fully resolved; a failure on one item doesn't stop the rest.
    pub fn process_requested_items(&self, items: &[ItemDefinition], select_only: bool) -> Result<bool> {
        let mut all_ok = true;
        for item in items {
            if let Err(e) = self.process_one(item, select_only) {
                if select_only {
                    return Err(e);
                }
                all_ok = false;
                trace!(item = %item, error = %e, "item did not resolve");
            }
        }
        Ok(all_ok)
    }

    fn process_one(&self, item: &ItemDefinition, select_only: bool) -> Result<()> {
        if self.fetch_ready_or_none(item)?.is_some() {
            return Ok(());
        }

        let plan = {
            let inner = self.inner.lock().unwrap();
            let mut already_using = HashSet::new();
            let mut planned = HashSet::new();
            let mut plan = Vec::new();
            select(&inner, item, &mut already_using, &mut planned, &mut plan)?;
            plan
        };

        for node in plan {
            if self.fetch_ready_or_none(&node.item)?.is_some() {
                continue;
            }
            if select_only {
                node.recipe.declare_slices(self)?;
                continue;
            }
            trace!(recipe = node.recipe.name(), "preparing plan step");
            let prepared = node.recipe.prepare(self)?;
            let prepared = verify_on_read(prepared);
            let mut inner = self.inner.lock().unwrap();
            inner.ready.stock(prepared);
        }
        Ok(())
    }

    /// Resolves and prepares `item`, returning its bytes. Runs a select
    /// phase (builds a post-order preparation plan under the lock) followed
    /// by a prepare phase (invokes each recipe with the lock released).
    pub fn request_item(&self, item: &ItemDefinition) -> Result<Arc<PreparedItem>> {
        if let Some(found) = self.fetch_ready_or_none(item)? {
            return Ok(found);
        }

        let plan = {
            let inner = self.inner.lock().unwrap();
            let mut already_using = HashSet::new();
            let mut planned = HashSet::new();
            let mut plan = Vec::new();
            select(&inner, item, &mut already_using, &mut planned, &mut plan)?;
            plan
        };

        debug!(steps = plan.len(), "kitchen prepare plan built");

        for node in plan {
            if self.fetch_ready_or_none(&node.item)?.is_some() {
                continue;
            }
            trace!(recipe = node.recipe.name(), "preparing plan step");
            let prepared = node.recipe.prepare(self)?;
            let prepared = verify_on_read(prepared);
            let mut inner = self.inner.lock().unwrap();
            inner.ready.stock(prepared);
        }

        self.fetch_ready(item)
    }

    /// Snapshots every item this kitchen currently knows about (supplied up
    /// front or already prepared) into a fresh pantry — used to seed a
    /// nested archive's own kitchen so its `copy_source` recipes can still
    /// reach the outer session's source file.
    pub fn known_items_snapshot(&self) -> Pantry {
        let inner = self.inner.lock().unwrap();
        let mut pantry = Pantry::new();
        for item in inner.supplied.all_items().chain(inner.ready.all_items()) {
            pantry.stock(Arc::clone(item));
        }
        pantry
    }

    pub(crate) fn fetch_ready_or_none(&self, item: &ItemDefinition) -> Result<Option<Arc<PreparedItem>>> {
        let inner = self.inner.lock().unwrap();
        if let Some(found) = inner.ready.find(item)? {
            return Ok(Some(found));
        }
        inner.supplied.find(item)
    }
}

/// Wraps a freshly prepared item's source so that whoever reads it through
/// to the end — a dependent recipe, or the apply session's writer — gets
/// its bytes verified against the item's declared hashes before they're
/// usable. Items with no declared hash (the `create` session's synthetic
/// prefix/middle/suffix wrappers) pass through unwrapped: there is nothing
/// to verify against.
fn verify_on_read(prepared: Arc<PreparedItem>) -> Arc<PreparedItem> {
    if prepared.definition.hashes.is_empty() {
        return prepared;
    }
    let verifying = VerifyingReaderFactory::new(Arc::clone(&prepared.source), prepared.definition.hashes.clone());
    Arc::new(PreparedItem::new(prepared.definition.clone(), verifying))
}

fn select(
    inner: &KitchenInner,
    item: &ItemDefinition,
    already_using: &mut HashSet<ItemDefinition>,
    planned: &mut HashSet<ItemDefinition>,
    plan: &mut Vec<PlanNode>,
) -> Result<()> {
    if inner.ready.contains(item)? || inner.supplied.contains(item)? {
        return Ok(());
    }
    if planned.contains(item) {
        return Ok(());
    }
    if already_using.contains(item) {
        return Err(DiffError::DependencyCycle(item.to_string()));
    }

    let mut candidates = Vec::new();
    for cookbook in &inner.cookbooks {
        candidates.extend(cookbook.recipes_for(item)?);
    }
    if candidates.is_empty() {
        return Err(DiffError::DependencyUnreachable(item.to_string()));
    }

    already_using.insert(item.clone());

    let mut last_err = None;
    for recipe in candidates {
        let snapshot = plan.len();
        let mut failed = None;
        for ingredient in recipe.ingredients() {
            if let Err(e) = select(inner, ingredient, already_using, planned, plan) {
                failed = Some(e);
                break;
            }
        }
        match failed {
            None => {
                plan.push(PlanNode {
                    item: item.clone(),
                    recipe,
                });
                planned.insert(item.clone());
                already_using.remove(item);
                return Ok(());
            }
            Some(e) => {
                for node in plan.drain(snapshot..) {
                    planned.remove(&node.item);
                }
                last_err = Some(e);
            }
        }
    }

    already_using.remove(item);
    Err(last_err.unwrap_or_else(|| DiffError::DependencyUnreachable(item.to_string())))
}
