use std::sync::Arc;

use crate::codec::zstdc;
use crate::core::item_definition::ItemDefinition;
use crate::core::kitchen::Kitchen;
use crate::core::prepared_item::PreparedItem;
use crate::core::recipe::{Recipe, check_not_self_referential};
use crate::error::Result;
use crate::io::reader::Reader;

/// Decompresses a zstd-compressed ingredient into `result`'s raw bytes.
#[derive(Debug)]
pub struct ZstdDecompressionRecipe {
    pub result: ItemDefinition,
    pub compressed: ItemDefinition,
}

impl ZstdDecompressionRecipe {
    pub fn new(result: ItemDefinition, compressed: ItemDefinition) -> Result<Self> {
        check_not_self_referential("zstd_decompression", &result, std::slice::from_ref(&compressed))?;
        Ok(Self { result, compressed })
    }
}

impl Recipe for ZstdDecompressionRecipe {
    fn name(&self) -> &str {
        "zstd_decompression"
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
        let raw = zstdc::decompress(&buf, None, self.result.length)?;
        Ok(PreparedItem::from_bytes(self.result.clone(), raw))
    }
}
