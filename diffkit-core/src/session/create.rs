use std::path::Path;

use tracing::debug;

use crate::codec::zstdc;
use crate::core::item_definition::ItemDefinition;
use crate::error::{DiffError, Result};
use crate::format::standard::{self, ArchiveSpec, GroupSpec, RecipeSpec};
use crate::hash::{Algorithm, hash_reader};

#[derive(Debug, Clone)]
pub struct CreateSessionOptions {
    pub zstd_level: i32,
    /// A zstd delta is only worth keeping over a raw remainder chunk if it
    /// actually shrinks the middle region by at least this many bytes.
    pub min_delta_savings: usize,
}

impl Default for CreateSessionOptions {
    fn default() -> Self {
        Self {
            zstd_level: 19,
            min_delta_savings: 64,
        }
    }
}

/// Builds a minimal single-level archive: identical prefix/suffix regions
/// become `copy_source` recipes, the differing middle becomes either a
/// `zstd_delta` (when it actually saves space) or a raw `remainder_chunk`.
/// This exists so the round-trip property is exercisable end to end; it is
/// not a replacement for a full external diff builder, which stays out of
/// scope here.
pub struct CreateSession {
    options: CreateSessionOptions,
}

impl CreateSession {
    pub fn new(options: CreateSessionOptions) -> Self {
        Self { options }
    }

    pub fn build(&self, source_path: impl AsRef<Path>, target_path: impl AsRef<Path>) -> Result<ArchiveSpec> {
        let source = std::fs::read(source_path.as_ref()).map_err(DiffError::Io)?;
        let target = std::fs::read(target_path.as_ref()).map_err(DiffError::Io)?;

        let source_item = item_for(&source, "source")?;
        let target_item = item_for(&target, "target")?;

        let prefix_len = common_prefix_len(&source, &target);
        let max_suffix = (source.len() - prefix_len).min(target.len() - prefix_len);
        let suffix_len = common_suffix_len(&source[prefix_len..], &target[prefix_len..], max_suffix);

        let target_middle = &target[prefix_len..target.len() - suffix_len];
        let source_middle = &source[prefix_len..source.len() - suffix_len];

        let mut groups = Vec::new();
        let mut remainder = Vec::new();
        let mut chain_parts = Vec::new();

        if prefix_len > 0 {
            let prefix_item = ItemDefinition::new(prefix_len as u64).with_name("prefix");
            groups.push(GroupSpec {
                result: prefix_item.clone(),
                recipes: vec![RecipeSpec::CopySource {
                    source: source_item.clone(),
                    offset: 0,
                    length: prefix_len as u64,
                }],
            });
            chain_parts.push(prefix_item);
        }

        if !target_middle.is_empty() {
            let middle_item = ItemDefinition::new(target_middle.len() as u64).with_name("middle");
            let recipe = self.build_middle_recipe(
                &mut groups,
                &mut remainder,
                source_item.clone(),
                prefix_len as u64,
                source_middle,
                target_middle,
                &middle_item,
            )?;
            groups.push(GroupSpec {
                result: middle_item.clone(),
                recipes: vec![recipe],
            });
            chain_parts.push(middle_item);
        }

        if suffix_len > 0 {
            let suffix_item = ItemDefinition::new(suffix_len as u64).with_name("suffix");
            groups.push(GroupSpec {
                result: suffix_item.clone(),
                recipes: vec![RecipeSpec::CopySource {
                    source: source_item.clone(),
                    offset: (source.len() - suffix_len) as u64,
                    length: suffix_len as u64,
                }],
            });
            chain_parts.push(suffix_item);
        }

        let target_recipe = if chain_parts.len() == 1 {
            // The whole target is one region (pure copy or pure middle); no
            // chain indirection needed.
            groups.pop().expect("one region means one group was pushed").recipes
        } else if chain_parts.is_empty() {
            vec![RecipeSpec::AllZero]
        } else {
            vec![RecipeSpec::Chain { parts: chain_parts }]
        };

        groups.push(GroupSpec {
            result: target_item.clone(),
            recipes: target_recipe,
        });

        Ok(ArchiveSpec {
            target: target_item,
            required_sources: vec![source_item],
            groups,
            remainder,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn build_middle_recipe(
        &self,
        groups: &mut Vec<GroupSpec>,
        remainder: &mut Vec<u8>,
        source_item: ItemDefinition,
        source_middle_offset: u64,
        source_middle: &[u8],
        target_middle: &[u8],
        middle_item: &ItemDefinition,
    ) -> Result<RecipeSpec> {
        if !source_middle.is_empty() {
            let delta = zstdc::compress(target_middle, Some(source_middle), self.options.zstd_level)?;
            if source_middle.len() + target_middle.len() > 0 && delta.len() + self.options.min_delta_savings < target_middle.len() {
                let basis_item = ItemDefinition::new(source_middle.len() as u64).with_name("middle_basis");
                groups.push(GroupSpec {
                    result: basis_item.clone(),
                    recipes: vec![RecipeSpec::CopySource {
                        source: source_item,
                        offset: source_middle_offset,
                        length: source_middle.len() as u64,
                    }],
                });
                let delta_item = ItemDefinition::new(delta.len() as u64).with_name("middle_delta");
                groups.push(GroupSpec {
                    result: delta_item.clone(),
                    recipes: vec![RecipeSpec::InlineAsset { bytes: delta }],
                });
                debug!(result = %middle_item, "middle region encoded as zstd_delta");
                return Ok(RecipeSpec::ZstdDelta {
                    basis: basis_item,
                    delta: delta_item,
                });
            }
        }
        let offset = remainder.len() as u64;
        remainder.extend_from_slice(target_middle);
        debug!(result = %middle_item, "middle region stored as raw remainder chunk");
        Ok(RecipeSpec::RemainderChunk {
            offset,
            length: target_middle.len() as u64,
        })
    }
}

pub fn write_diff(spec: &ArchiveSpec, out_path: impl AsRef<Path>) -> Result<()> {
    let mut file = std::fs::File::create(out_path.as_ref()).map_err(DiffError::Io)?;
    standard::write_archive(&mut file, spec)
}

fn item_for(bytes: &[u8], name: &str) -> Result<ItemDefinition> {
    let hashes = hash_reader(bytes, &Algorithm::ALL)?;
    let mut item = ItemDefinition::new(bytes.len() as u64).with_name(name);
    item.hashes = hashes;
    Ok(item)
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

fn common_suffix_len(a: &[u8], b: &[u8], max: usize) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take(max)
        .take_while(|(x, y)| x == y)
        .count()
}
