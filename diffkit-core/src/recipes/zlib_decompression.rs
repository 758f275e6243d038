use std::sync::Arc;

use crate::codec::zlib;
use crate::core::item_definition::ItemDefinition;
use crate::core::kitchen::Kitchen;
use crate::core::prepared_item::PreparedItem;
use crate::core::recipe::{Recipe, check_not_self_referential};
use crate::error::Result;
use crate::io::reader::Reader;

/// Decompresses a zlib/deflate-compressed ingredient, used for archives
/// originating from the legacy format, which favored zlib over zstd.
#[derive(Debug)]
pub struct ZlibDecompressionRecipe {
    pub result: ItemDefinition,
    pub compressed: ItemDefinition,
}

impl ZlibDecompressionRecipe {
    pub fn new(result: ItemDefinition, compressed: ItemDefinition) -> Result<Self> {
        check_not_self_referential("zlib_decompression", &result, std::slice::from_ref(&compressed))?;
        Ok(Self { result, compressed })
    }
}

impl Recipe for ZlibDecompressionRecipe {
    fn name(&self) -> &str {
        "zlib_decompression"
    }

    fn result(&self) -> &ItemDefinition {
        &self.result
    }

    fn ingredients(&self) -> &[ItemDefinition] {
        std::slice::from_ref(&self.compressed)
    }

    fn prepare(&self, kitchen: &Kitchen) -> Result<Arc<PreparedItem>> {
        let compressed = kitchen.fetch_ready(&self.compressed)?;
        let reader = compressed.open()?;
        let mut buf = vec![0u8; reader.size() as usize];
        reader.read_at(0, &mut buf)?;
        let raw = zlib::decompress(&buf, self.result.length)?;
        Ok(PreparedItem::from_bytes(self.result.clone(), raw))
    }
}
