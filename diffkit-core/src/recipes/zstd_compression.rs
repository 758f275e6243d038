use std::sync::Arc;

use crate::codec::zstdc;
use crate::core::item_definition::ItemDefinition;
use crate::core::kitchen::Kitchen;
use crate::core::prepared_item::PreparedItem;
use crate::core::recipe::{Recipe, check_not_self_referential};
use crate::error::{DiffError, Result};
use crate::io::reader::Reader;

/// Compresses a raw ingredient to produce `result`'s bytes — the inverse of
/// `zstd_decompression`, used when a later recipe in the tree needs
/// compressed bytes derived from an already-prepared raw item rather than
/// bytes stored directly in the archive.
#[derive(Debug)]
pub struct ZstdCompressionRecipe {
    pub result: ItemDefinition,
    pub raw: ItemDefinition,
    pub level: i32,
}

impl ZstdCompressionRecipe {
    pub fn new(result: ItemDefinition, raw: ItemDefinition, level: i32) -> Result<Self> {
        check_not_self_referential("zstd_compression", &result, std::slice::from_ref(&raw))?;
        Ok(Self { result, raw, level })
    }
}

impl Recipe for ZstdCompressionRecipe {
    fn name(&self) -> &str {
        "zstd_compression"
    }

    fn result(&self) -> &ItemDefinition {
        &self.result
    }

    fn ingredients(&self) -> &[ItemDefinition] {
        std::slice::from_ref(&self.raw)
    }

    fn prepare(&self, kitchen: &Kitchen) -> Result<Arc<PreparedItem>> {
        let raw = kitchen.fetch_ready(&self.raw)?;
        let reader = raw.open()?;
        let mut buf = vec![0u8; reader.size() as usize];
        reader.read_at(0, &mut buf)?;
        let compressed = zstdc::compress(&buf, None, self.level)?;
        if compressed.len() as u64 != self.result.length {
            return Err(DiffError::ReaderReadFailure {
                expected: self.result.length,
                actual: compressed.len() as u64,
            });
        }
        Ok(PreparedItem::from_bytes(self.result.clone(), compressed))
    }
}
