//! Standard on-disk archive codec: magic `PAMZ`, little-endian integers,
//! length-prefixed strings and byte blobs.

use std::io::{Read, Write};
use std::sync::Arc;

use crate::core::archive::Archive;
use crate::core::cookbook::Cookbook;
use crate::core::item_definition::ItemDefinition;
use crate::core::pantry::Pantry;
use crate::core::recipe::Recipe;
use crate::error::{DiffError, Result};
use crate::hash::{Algorithm, Hash};
use crate::io::reader::{MemoryReaderFactory, ReaderFactory};
use crate::recipes;

pub const MAGIC: [u8; 4] = *b"PAMZ";
pub const VERSION: u32 = 1;

/// Result-item name used for the archive's single raw-remainder blob, so
/// `remainder_chunk` recipes can reference it as an ordinary pantry item.
pub const REMAINDER_ITEM_NAME: &str = "__remainder__";

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecipeKind {
    Slice = 0,
    Chain = 1,
    AllZero = 2,
    InlineAsset = 3,
    CopySource = 4,
    RemainderChunk = 5,
    ZstdCompression = 6,
    ZstdDecompression = 7,
    ZstdDelta = 8,
    BsdiffDelta = 9,
    ZlibDecompression = 10,
    NestedDiff = 11,
}

impl RecipeKind {
    fn from_u32(v: u32) -> Result<Self> {
        Ok(match v {
            0 => Self::Slice,
            1 => Self::Chain,
            2 => Self::AllZero,
            3 => Self::InlineAsset,
            4 => Self::CopySource,
            5 => Self::RemainderChunk,
            6 => Self::ZstdCompression,
            7 => Self::ZstdDecompression,
            8 => Self::ZstdDelta,
            9 => Self::BsdiffDelta,
            10 => Self::ZlibDecompression,
            11 => Self::NestedDiff,
            other => return Err(DiffError::UnknownRecipeType(other)),
        })
    }
}

/// Peeks the first 4 bytes of `data` to check for the standard magic,
/// without consuming the reader — used by the session loader to pick
/// between the standard and legacy codecs.
pub fn is_this_format(data: &[u8]) -> bool {
    data.len() >= 4 && data[..4] == MAGIC
}

struct RawRecipe {
    kind: RecipeKind,
    numbers: Vec<u64>,
    items: Vec<ItemDefinition>,
    inline_bytes: Vec<u8>,
}

fn write_u32(w: &mut impl Write, v: u32) -> Result<()> {
    w.write_all(&v.to_le_bytes()).map_err(DiffError::Io)
}
fn write_u64(w: &mut impl Write, v: u64) -> Result<()> {
    w.write_all(&v.to_le_bytes()).map_err(DiffError::Io)
}
fn write_u8(w: &mut impl Write, v: u8) -> Result<()> {
    w.write_all(&[v]).map_err(DiffError::Io)
}
fn read_u32(r: &mut impl Read) -> Result<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b).map_err(DiffError::Io)?;
    Ok(u32::from_le_bytes(b))
}
fn read_u64(r: &mut impl Read) -> Result<u64> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b).map_err(DiffError::Io)?;
    Ok(u64::from_le_bytes(b))
}
fn read_u8(r: &mut impl Read) -> Result<u8> {
    let mut b = [0u8; 1];
    r.read_exact(&mut b).map_err(DiffError::Io)?;
    Ok(b[0])
}

fn write_bytes_with_len(w: &mut impl Write, data: &[u8]) -> Result<()> {
    write_u64(w, data.len() as u64)?;
    w.write_all(data).map_err(DiffError::Io)
}
fn read_bytes_with_len(r: &mut impl Read) -> Result<Vec<u8>> {
    let len = read_u64(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).map_err(DiffError::Io)?;
    Ok(buf)
}

fn write_hash(w: &mut impl Write, h: &Hash) -> Result<()> {
    write_u8(w, h.algorithm.wire_id())?;
    write_u8(w, h.bytes.len() as u8)?;
    w.write_all(&h.bytes).map_err(DiffError::Io)
}
fn read_hash(r: &mut impl Read) -> Result<Hash> {
    let algo_id = read_u8(r)?;
    let algorithm = Algorithm::from_wire_id(algo_id)
        .ok_or_else(|| DiffError::Format(format!("unknown hash algorithm id {algo_id}")))?;
    let len = read_u8(r)? as usize;
    let mut bytes = vec![0u8; len];
    r.read_exact(&mut bytes).map_err(DiffError::Io)?;
    Ok(Hash::new(algorithm, bytes))
}

fn write_item(w: &mut impl Write, item: &ItemDefinition) -> Result<()> {
    write_u64(w, item.length)?;
    match &item.name {
        Some(name) => {
            write_u8(w, 1)?;
            let bytes = name.as_bytes();
            write_u32(w, bytes.len() as u32)?;
            w.write_all(bytes).map_err(DiffError::Io)?;
        }
        None => write_u8(w, 0)?,
    }
    write_u8(w, item.hashes.len() as u8)?;
    for hash in &item.hashes {
        write_hash(w, hash)?;
    }
    Ok(())
}

fn read_item(r: &mut impl Read) -> Result<ItemDefinition> {
    let length = read_u64(r)?;
    let has_name = read_u8(r)? != 0;
    let name = if has_name {
        let len = read_u32(r)? as usize;
        let mut buf = vec![0u8; len];
        r.read_exact(&mut buf).map_err(DiffError::Io)?;
        Some(String::from_utf8(buf).map_err(|e| DiffError::Format(e.to_string()))?)
    } else {
        None
    };
    let hash_count = read_u8(r)?;
    let mut item = ItemDefinition::new(length);
    item.name = name;
    for _ in 0..hash_count {
        item.hashes.push(read_hash(r)?);
    }
    Ok(item)
}

fn write_recipe(w: &mut impl Write, kind: RecipeKind, numbers: &[u64], items: &[ItemDefinition], inline: &[u8]) -> Result<()> {
    write_u32(w, kind as u32)?;
    write_u32(w, numbers.len() as u32)?;
    for n in numbers {
        write_u64(w, *n)?;
    }
    write_u32(w, items.len() as u32)?;
    for item in items {
        write_item(w, item)?;
    }
    write_bytes_with_len(w, inline)?;
    Ok(())
}

fn read_recipe(r: &mut impl Read) -> Result<RawRecipe> {
    let kind = RecipeKind::from_u32(read_u32(r)?)?;
    let numbers_count = read_u32(r)?;
    let mut numbers = Vec::with_capacity(numbers_count as usize);
    for _ in 0..numbers_count {
        numbers.push(read_u64(r)?);
    }
    let items_count = read_u32(r)?;
    let mut items = Vec::with_capacity(items_count as usize);
    for _ in 0..items_count {
        items.push(read_item(r)?);
    }
    let inline_bytes = read_bytes_with_len(r)?;
    Ok(RawRecipe {
        kind,
        numbers,
        items,
        inline_bytes,
    })
}

/// One entry to serialize: a result item plus the ordered recipe candidates
/// that can produce it.
pub struct GroupSpec {
    pub result: ItemDefinition,
    pub recipes: Vec<RecipeSpec>,
}

/// A single recipe's wire-level shape, used by `CreateSession` to author an
/// archive without round-tripping through live `Recipe` trait objects.
pub enum RecipeSpec {
    Slice { parent: ItemDefinition, offset: u64, length: u64 },
    Chain { parts: Vec<ItemDefinition> },
    AllZero,
    InlineAsset { bytes: Vec<u8> },
    CopySource { source: ItemDefinition, offset: u64, length: u64 },
    RemainderChunk { offset: u64, length: u64 },
    ZstdCompression { raw: ItemDefinition, level: i32 },
    ZstdDecompression { compressed: ItemDefinition },
    ZstdDelta { basis: ItemDefinition, delta: ItemDefinition },
    BsdiffDelta { basis: ItemDefinition, patch: ItemDefinition },
    ZlibDecompression { compressed: ItemDefinition },
    NestedDiff { nested: ItemDefinition },
}

pub struct ArchiveSpec {
    pub target: ItemDefinition,
    pub required_sources: Vec<ItemDefinition>,
    pub groups: Vec<GroupSpec>,
    pub remainder: Vec<u8>,
}

pub fn write_archive(w: &mut impl Write, spec: &ArchiveSpec) -> Result<()> {
    w.write_all(&MAGIC).map_err(DiffError::Io)?;
    write_u32(w, VERSION)?;
    write_item(w, &spec.target)?;
    write_u32(w, spec.required_sources.len() as u32)?;
    for item in &spec.required_sources {
        write_item(w, item)?;
    }
    write_u32(w, spec.groups.len() as u32)?;
    for group in &spec.groups {
        write_item(w, &group.result)?;
        write_u32(w, group.recipes.len() as u32)?;
        for recipe in &group.recipes {
            write_recipe_spec(w, recipe)?;
        }
    }
    write_bytes_with_len(w, &spec.remainder)?;
    Ok(())
}

fn write_recipe_spec(w: &mut impl Write, spec: &RecipeSpec) -> Result<()> {
    match spec {
        RecipeSpec::Slice { parent, offset, length } => {
            write_recipe(w, RecipeKind::Slice, &[*offset, *length], std::slice::from_ref(parent), &[])
        }
        RecipeSpec::Chain { parts } => write_recipe(w, RecipeKind::Chain, &[], parts, &[]),
        RecipeSpec::AllZero => write_recipe(w, RecipeKind::AllZero, &[], &[], &[]),
        RecipeSpec::InlineAsset { bytes } => write_recipe(w, RecipeKind::InlineAsset, &[], &[], bytes),
        RecipeSpec::CopySource { source, offset, length } => {
            write_recipe(w, RecipeKind::CopySource, &[*offset, *length], std::slice::from_ref(source), &[])
        }
        RecipeSpec::RemainderChunk { offset, length } => {
            write_recipe(w, RecipeKind::RemainderChunk, &[*offset, *length], &[], &[])
        }
        RecipeSpec::ZstdCompression { raw, level } => write_recipe(
            w,
            RecipeKind::ZstdCompression,
            &[*level as u64],
            std::slice::from_ref(raw),
            &[],
        ),
        RecipeSpec::ZstdDecompression { compressed } => {
            write_recipe(w, RecipeKind::ZstdDecompression, &[], std::slice::from_ref(compressed), &[])
        }
        RecipeSpec::ZstdDelta { basis, delta } => {
            write_recipe(w, RecipeKind::ZstdDelta, &[], &[basis.clone(), delta.clone()], &[])
        }
        RecipeSpec::BsdiffDelta { basis, patch } => {
            write_recipe(w, RecipeKind::BsdiffDelta, &[], &[basis.clone(), patch.clone()], &[])
        }
        RecipeSpec::ZlibDecompression { compressed } => {
            write_recipe(w, RecipeKind::ZlibDecompression, &[], std::slice::from_ref(compressed), &[])
        }
        RecipeSpec::NestedDiff { nested } => {
            write_recipe(w, RecipeKind::NestedDiff, &[], std::slice::from_ref(nested), &[])
        }
    }
}

/// Parses a standard-format archive, returning the `Archive` and a pantry
/// pre-stocked with the synthesized remainder item so `remainder_chunk`
/// recipes resolve without any caller-supplied ingredient.
pub fn read_archive(r: &mut impl Read) -> Result<(Archive, Pantry)> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic).map_err(DiffError::Io)?;
    if magic != MAGIC {
        return Err(DiffError::MagicMismatch {
            expected: MAGIC,
            found: magic,
        });
    }
    let version = read_u32(r)?;
    if version != VERSION {
        return Err(DiffError::VersionMismatch(version as u64));
    }
    let target = read_item(r)?;
    let required_count = read_u32(r)?;
    let mut required_sources = Vec::with_capacity(required_count as usize);
    for _ in 0..required_count {
        required_sources.push(read_item(r)?);
    }
    let group_count = read_u32(r)?;
    if group_count > 10_000_000 {
        return Err(DiffError::ChunkCountTooLarge(group_count as u64));
    }
    let mut raw_groups = Vec::with_capacity(group_count as usize);
    for _ in 0..group_count {
        let result = read_item(r)?;
        let recipe_count = read_u32(r)?;
        let mut recipes = Vec::with_capacity(recipe_count as usize);
        for _ in 0..recipe_count {
            recipes.push(read_recipe(r)?);
        }
        raw_groups.push((result, recipes));
    }
    let remainder = read_bytes_with_len(r)?;

    let remainder_item = ItemDefinition::new(remainder.len() as u64).with_name(REMAINDER_ITEM_NAME);
    let mut pantry = Pantry::new();
    let remainder_factory: Arc<dyn ReaderFactory> = MemoryReaderFactory::new(remainder);
    pantry.stock(Arc::new(crate::core::prepared_item::PreparedItem::new(
        remainder_item.clone(),
        remainder_factory,
    )));

    let mut all_recipes: Vec<Arc<dyn Recipe>> = Vec::new();
    for (result, raw_recipes) in raw_groups {
        for raw in raw_recipes {
            all_recipes.push(build_recipe(result.clone(), raw, &remainder_item)?);
        }
    }
    let cookbook = Cookbook::from_recipes(all_recipes)?;
    Ok((Archive::new(target, required_sources, cookbook), pantry))
}

fn build_recipe(result: ItemDefinition, raw: RawRecipe, remainder_item: &ItemDefinition) -> Result<Arc<dyn Recipe>> {
    Ok(match raw.kind {
        RecipeKind::Slice => {
            let [offset, length] = take2(&raw.numbers, "slice")?;
            Arc::new(recipes::SliceRecipe::new(result, take1_item(&raw.items, "slice")?, offset, length)?)
        }
        RecipeKind::Chain => Arc::new(recipes::ChainRecipe::new(result, raw.items)?),
        RecipeKind::AllZero => Arc::new(recipes::AllZeroRecipe::new(result)),
        RecipeKind::InlineAsset => Arc::new(recipes::InlineAssetRecipe::new(result, raw.inline_bytes)?),
        RecipeKind::CopySource => {
            let [offset, length] = take2(&raw.numbers, "copy_source")?;
            Arc::new(recipes::CopySourceRecipe::new(
                result,
                take1_item(&raw.items, "copy_source")?,
                offset,
                length,
            )?)
        }
        RecipeKind::RemainderChunk => {
            let [offset, length] = take2(&raw.numbers, "remainder_chunk")?;
            Arc::new(recipes::RemainderChunkRecipe::new(result, remainder_item.clone(), offset, length)?)
        }
        RecipeKind::ZstdCompression => {
            let level = *raw.numbers.first().ok_or_else(|| missing_number("zstd_compression"))? as i32;
            Arc::new(recipes::ZstdCompressionRecipe::new(result, take1_item(&raw.items, "zstd_compression")?, level)?)
        }
        RecipeKind::ZstdDecompression => {
            Arc::new(recipes::ZstdDecompressionRecipe::new(result, take1_item(&raw.items, "zstd_decompression")?)?)
        }
        RecipeKind::ZstdDelta => {
            let [basis, delta] = take2_items(&raw.items, "zstd_delta")?;
            Arc::new(recipes::ZstdDeltaRecipe::new(result, basis, delta)?)
        }
        RecipeKind::BsdiffDelta => {
            let [basis, patch] = take2_items(&raw.items, "bsdiff_delta")?;
            Arc::new(recipes::BsdiffDeltaRecipe::new(result, basis, patch)?)
        }
        RecipeKind::ZlibDecompression => {
            Arc::new(recipes::ZlibDecompressionRecipe::new(result, take1_item(&raw.items, "zlib_decompression")?)?)
        }
        RecipeKind::NestedDiff => Arc::new(recipes::NestedDiffRecipe::new(result, take1_item(&raw.items, "nested_diff")?)?),
    })
}

fn missing_number(name: &str) -> DiffError {
    DiffError::RecipeInvalidParameterCount {
        name: name.to_string(),
        expected_numbers: 1,
        actual_numbers: 0,
        expected_items: 1,
        actual_items: 0,
    }
}

fn take1_item(items: &[ItemDefinition], name: &str) -> Result<ItemDefinition> {
    items.first().cloned().ok_or_else(|| DiffError::RecipeInvalidParameterCount {
        name: name.to_string(),
        expected_numbers: 0,
        actual_numbers: 0,
        expected_items: 1,
        actual_items: items.len(),
    })
}

fn take2_items(items: &[ItemDefinition], name: &str) -> Result<[ItemDefinition; 2]> {
    if items.len() != 2 {
        return Err(DiffError::RecipeInvalidParameterCount {
            name: name.to_string(),
            expected_numbers: 0,
            actual_numbers: 0,
            expected_items: 2,
            actual_items: items.len(),
        });
    }
    Ok([items[0].clone(), items[1].clone()])
}

fn take2(numbers: &[u64], name: &str) -> Result<[u64; 2]> {
    if numbers.len() != 2 {
        return Err(DiffError::RecipeInvalidParameterCount {
            name: name.to_string(),
            expected_numbers: 2,
            actual_numbers: numbers.len(),
            expected_items: 0,
            actual_items: 0,
        });
    }
    Ok([numbers[0], numbers[1]])
}
