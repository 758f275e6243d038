use std::path::{Path, PathBuf};
use std::sync::Arc;

use diffkit_core::core::item_definition::ItemDefinition;
use diffkit_core::core::kitchen::Kitchen;
use diffkit_core::core::pantry::Pantry;
use diffkit_core::core::prepared_item::PreparedItem;
use diffkit_core::core::recipe::Recipe;
use diffkit_core::format::{legacy, standard};
use diffkit_core::hash::{Algorithm, hash_reader};
use diffkit_core::io::reader::{FileReaderFactory, Reader, ReaderFactory};
use diffkit_core::session::{ApplySession, ApplySessionOptions, CreateSession, CreateSessionOptions};
use diffkit_core::{DiffError, Result};

pub fn apply(archives: &[PathBuf], source: &Option<PathBuf>, target: &Path) -> Result<()> {
    let mut session = ApplySession::new(ApplySessionOptions::default());
    if let Some(source) = source {
        session.add_source(source)?;
    }
    for archive in archives {
        session.load_archive(archive)?;
    }
    let result = session.apply(target);
    for (code, message) in &session.errors {
        eprintln!("error[{code}]: {message}");
    }
    result
}

pub fn create(source: &Path, target: &Path, out: &Path, zstd_level: i32) -> Result<()> {
    let session = CreateSession::new(CreateSessionOptions {
        zstd_level,
        ..CreateSessionOptions::default()
    });
    let spec = session.build(source, target)?;
    diffkit_core::session::create::write_diff(&spec, out)
}

pub fn list(archive: &Path) -> Result<()> {
    let bytes = std::fs::read(archive).map_err(DiffError::Io)?;
    let (archive, _pantry) = load_any(&bytes)?;
    println!("target: {}", archive.target);
    println!("required sources: {}", archive.required_sources.len());
    for (item, recipes) in archive.cookbook.groups() {
        let names: Vec<&str> = recipes.iter().map(|r| r.name()).collect();
        println!("  {item} <- [{}]", names.join(", "));
    }
    Ok(())
}

pub fn verify(archive_path: &Path, source: &Option<PathBuf>) -> Result<()> {
    let bytes = std::fs::read(archive_path).map_err(DiffError::Io)?;
    let (archive, remainder_pantry) = load_any(&bytes)?;

    let mut pantry = Pantry::new();
    for item in remainder_pantry.all_items() {
        pantry.stock(std::sync::Arc::clone(item));
    }
    if let Some(source) = source {
        pantry.stock(supplied_source_item(source)?);
    }

    let kitchen = Kitchen::new(vec![archive.cookbook], pantry);
    let prepared = kitchen.request_item(&archive.target)?;

    if let Some(expected) = archive.target.hash(Algorithm::Sha256) {
        let reader = prepared.open()?;
        let mut buf = vec![0u8; reader.size() as usize];
        reader.read_at(0, &mut buf)?;
        let actual = diffkit_core::hash::hash_reader(buf.as_slice(), &[Algorithm::Sha256])?;
        if actual[0].bytes != expected.bytes {
            return Err(DiffError::VerifyHashFailure(format!(
                "target hash mismatch: expected {} actual {}",
                expected.to_hex(),
                actual[0].to_hex()
            )));
        }
    }
    println!("ok: {}", archive.target);
    Ok(())
}

/// Builds a prepared pantry item for a `--source` file, hashed with every
/// supported algorithm so `copy_source` ingredients can match against it.
fn supplied_source_item(path: &Path) -> Result<Arc<PreparedItem>> {
    let factory = FileReaderFactory::open_path(path)?;
    let reader = factory.open()?;
    let mut buf = vec![0u8; reader.size() as usize];
    reader.read_at(0, &mut buf)?;
    let hashes = hash_reader(buf.as_slice(), &Algorithm::ALL)?;
    let mut item = ItemDefinition::new(factory.size());
    item.hashes = hashes;
    Ok(Arc::new(PreparedItem::new(item, factory)))
}

fn load_any(bytes: &[u8]) -> Result<(diffkit_core::core::Archive, Pantry)> {
    let mut slice = bytes;
    if standard::is_this_format(bytes) {
        standard::read_archive(&mut slice)
    } else if legacy::is_this_format(bytes) {
        legacy::read_archive(&mut slice)
    } else {
        Err(DiffError::MagicMismatch {
            expected: standard::MAGIC,
            found: bytes.get(..4).map(|s| [s[0], s[1], s[2], s[3]]).unwrap_or([0; 4]),
        })
    }
}
