use std::sync::Arc;

use crate::core::item_definition::ItemDefinition;
use crate::io::reader::{MemoryReaderFactory, Reader, ReaderFactory};

/// An item whose bytes are available, either as a random-access `Reader`
/// factory or — for items only ever consumed sequentially — a single
/// already-opened reader that must not be reused.
#[derive(Clone, Debug)]
pub struct PreparedItem {
    pub definition: ItemDefinition,
    pub source: Arc<dyn ReaderFactory>,
}

impl PreparedItem {
    pub fn new(definition: ItemDefinition, source: Arc<dyn ReaderFactory>) -> Self {
        Self { definition, source }
    }

    pub fn open(&self) -> crate::error::Result<Arc<dyn Reader>> {
        self.source.open()
    }

    pub fn size(&self) -> u64 {
        self.definition.length
    }

    /// Wraps an already-materialized buffer as a prepared item, used by
    /// recipes whose result is cheap to hold whole (decompression,
    /// all-zero fill, inline assets).
    pub fn from_bytes(definition: ItemDefinition, bytes: Vec<u8>) -> Arc<Self> {
        Arc::new(Self::new(definition, MemoryReaderFactory::new(bytes)))
    }
}
