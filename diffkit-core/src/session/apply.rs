use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::core::archive::Archive;
use crate::core::cookbook::Cookbook;
use crate::core::item_definition::ItemDefinition;
use crate::core::kitchen::Kitchen;
use crate::core::pantry::Pantry;
use crate::core::prepared_item::PreparedItem;
use crate::error::{DiffError, Result};
use crate::format::{legacy, standard};
use crate::hash::{Algorithm, hash_reader};
use crate::io::reader::{FileReaderFactory, Reader, ReaderFactory};
use crate::io::writer::{FileWriter, Writer};

#[derive(Debug, Clone)]
pub struct ApplySessionOptions {
    pub block_size: usize,
}

impl Default for ApplySessionOptions {
    fn default() -> Self {
        Self { block_size: 1024 * 1024 }
    }
}

/// Drives the apply side: load one or more archives (outermost first),
/// supply a source file, then reconstruct the target.
///
/// The low-level surface (`add_archive`/`add_file_to_pantry`/`request_item`/
/// `process_requested_items`/`resume_slicing`/`cancel_slicing`/
/// `extract_item_to_path`) lets a caller that is reconstructing from a
/// sequential-only source (a piped `--source`) run the two-phase flow that
/// requires: a select-only pass over every item it wants, then
/// `resume_slicing` to start the slicer workers, then a second pass that
/// actually prepares and writes each item. `apply` is a convenience wrapper
/// over that surface for the common case of a single target and a
/// random-access source.
pub struct ApplySession {
    options: ApplySessionOptions,
    pantry: Pantry,
    cookbooks: Vec<Arc<Cookbook>>,
    target: Option<ItemDefinition>,
    requested: Vec<ItemDefinition>,
    kitchen: Option<Arc<Kitchen>>,
    /// Every loaded archive, kept alive for the session's lifetime since
    /// their cookbooks reference items whose readers may still be open.
    archives: Vec<Archive>,
    pub errors: Vec<(String, String)>,
}

impl ApplySession {
    pub fn new(options: ApplySessionOptions) -> Self {
        Self {
            options,
            pantry: Pantry::new(),
            cookbooks: Vec::new(),
            target: None,
            requested: Vec::new(),
            kitchen: None,
            archives: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn add_source(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let factory = FileReaderFactory::open_path(&path)?;
        let reader = factory.open()?;
        let mut buf = vec![0u8; reader.size() as usize];
        reader.read_at(0, &mut buf)?;
        let hashes = hash_reader(buf.as_slice(), &Algorithm::ALL)?;
        let mut item = ItemDefinition::new(factory.size());
        item.hashes = hashes;
        info!(path = %path.as_ref().display(), item = %item, "supplied source item");
        self.add_file_to_pantry(item, factory);
        Ok(())
    }

    /// Stocks an already-identified item (with a reader factory over its
    /// bytes) into the pantry directly, for a caller that has computed the
    /// item's hashes itself rather than going through `add_source`.
    pub fn add_file_to_pantry(&mut self, item: ItemDefinition, factory: Arc<dyn ReaderFactory>) {
        self.pantry.stock(Arc::new(PreparedItem::new(item, factory)));
        self.kitchen = None;
    }

    /// Loads an archive's cookbook and required-source catalog. The first
    /// archive loaded becomes the default target for `apply`; subsequent
    /// archives (nested diffs) just contribute more recipes.
    pub fn add_archive(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = std::fs::read(path.as_ref()).map_err(DiffError::Io)?;
        let (archive, remainder_pantry) = if standard::is_this_format(&bytes) {
            standard::read_archive(&mut bytes.as_slice())?
        } else if legacy::is_this_format(&bytes) {
            legacy::read_archive(&mut bytes.as_slice())?
        } else {
            return Err(DiffError::MagicMismatch {
                expected: standard::MAGIC,
                found: bytes.get(..4).map(|s| [s[0], s[1], s[2], s[3]]).unwrap_or([0; 4]),
            });
        };
        for item in remainder_pantry.all_items() {
            self.pantry.stock(Arc::clone(item));
        }
        if self.target.is_none() {
            self.target = Some(archive.target.clone());
        }
        self.cookbooks.push(Arc::clone(&archive.cookbook));
        self.archives.push(archive);
        self.kitchen = None;
        Ok(())
    }

    /// Older name for [`Self::add_archive`], kept so existing callers don't
    /// have to change.
    pub fn load_archive(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.add_archive(path)
    }

    /// Queues `item` to be resolved by the next `process_requested_items`
    /// call.
    pub fn request_item(&mut self, item: ItemDefinition) {
        self.requested.push(item);
    }

    pub fn clear_requested_items(&mut self) {
        self.requested.clear();
    }

    fn kitchen(&mut self) -> Arc<Kitchen> {
        if self.kitchen.is_none() {
            let mut pantry = Pantry::new();
            for item in self.pantry.all_items() {
                pantry.stock(Arc::clone(item));
            }
            self.kitchen = Some(Arc::new(Kitchen::new(self.cookbooks.clone(), pantry)));
        }
        Arc::clone(self.kitchen.as_ref().unwrap())
    }

    /// Resolves every item queued by `request_item`. With `select_only`,
    /// only walks each item's dependency graph — enough to register every
    /// slice needed out of a sequential-only source, without invoking any
    /// recipe — so the usual flow for such a source is a `select_only` pass,
    /// `resume_slicing`, then a full pass. Returns whether every item
    /// resolved (always `true` in `select_only` mode, since it returns the
    /// first error instead of continuing past it).
    pub fn process_requested_items(&mut self, select_only: bool) -> Result<bool> {
        let kitchen = self.kitchen();
        kitchen.process_requested_items(&self.requested, select_only)
    }

    /// Starts every slicer that `process_requested_items(true)` registered
    /// slices against. Extraction happens on each slicer's own worker
    /// thread; a following `process_requested_items(false)` blocks on
    /// `fetch_slice` for whatever hasn't been produced yet.
    pub fn resume_slicing(&mut self) -> Result<()> {
        self.kitchen().resume_slicing()
    }

    pub fn cancel_slicing(&mut self) {
        if let Some(kitchen) = &self.kitchen {
            kitchen.cancel_slicing();
        }
    }

    /// Fetches `item`'s prepared bytes and streams them to `out_path`,
    /// verifying against its declared hash before the file is renamed into
    /// place (see `apply`'s doc comment on the tmp-file/rename sequencing).
    pub fn extract_item_to_path(&mut self, item: &ItemDefinition, out_path: impl AsRef<Path>) -> Result<()> {
        let kitchen = self.kitchen();
        let prepared = match kitchen.fetch_item(item) {
            Ok(p) => p,
            Err(e) => {
                self.errors.push((e.code().to_string(), e.to_string()));
                return Err(e);
            }
        };
        self.write_prepared(&prepared, out_path.as_ref())
    }

    /// Resolves the loaded archive's target and streams it to `out_path`.
    pub fn apply(&mut self, out_path: impl AsRef<Path>) -> Result<()> {
        let target = self
            .target
            .clone()
            .ok_or_else(|| DiffError::Format("no archive loaded".to_string()))?;

        let kitchen = self.kitchen();
        let prepared = match kitchen.request_item(&target) {
            Ok(p) => p,
            Err(e) => {
                self.errors.push((e.code().to_string(), e.to_string()));
                return Err(e);
            }
        };
        self.write_prepared(&prepared, out_path.as_ref())
    }

    fn write_prepared(&mut self, prepared: &Arc<PreparedItem>, out_path: &Path) -> Result<()> {
        // Written to a side path first and renamed into place only once
        // every byte has been read and verified, so a hash-verification
        // failure midway through a large target never leaves a partial
        // file at `out_path`.
        let tmp_path = sibling_tmp_path(out_path);
        let result = self.write_target(prepared, &tmp_path);
        match result {
            Ok(()) => {
                std::fs::rename(&tmp_path, out_path).map_err(DiffError::Io)?;
                info!(bytes = prepared.size(), path = %out_path.display(), "apply complete");
                Ok(())
            }
            Err(e) => {
                let _ = std::fs::remove_file(&tmp_path);
                self.errors.push((e.code().to_string(), e.to_string()));
                Err(e)
            }
        }
    }

    fn write_target(&self, prepared: &Arc<PreparedItem>, tmp_path: &Path) -> Result<()> {
        let out_file = std::fs::File::create(tmp_path).map_err(DiffError::Io)?;
        let writer = FileWriter(out_file);
        writer.set_len(prepared.size())?;
        let reader = prepared.open()?;
        let mut offset = 0u64;
        let mut buf = vec![0u8; self.options.block_size];
        while offset < prepared.size() {
            let want = (prepared.size() - offset).min(buf.len() as u64) as usize;
            reader.read_at(offset, &mut buf[..want])?;
            writer.write_at(offset, &buf[..want])?;
            offset += want as u64;
        }
        Ok(())
    }
}

fn sibling_tmp_path(out_path: &Path) -> PathBuf {
    let mut name = out_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "diffkit-output".into());
    name.push(".diffkit-tmp");
    out_path.with_file_name(name)
}
