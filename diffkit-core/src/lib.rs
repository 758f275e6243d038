#![forbid(unsafe_code)]

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;

pub mod hash {
    pub mod algorithm;
    pub mod incremental;
    pub mod value;

    pub use algorithm::Algorithm;
    pub use incremental::{IncrementalHasher, hash_reader, new_hasher};
    pub use value::{Hash, verify_hashes_match};
}

pub mod io {
    pub mod chain;
    pub mod reader;
    pub mod ring;
    pub mod sequential;
    pub mod slice;
    pub mod spool;
    pub mod writer;

    pub use reader::{Reader, ReaderFactory};
    pub use sequential::{SequentialReader, SequentialReaderFactory, SequentialWriter};
    pub use writer::Writer;
}

pub mod codec {
    pub mod zlib;
    pub mod zstdc;
}

pub mod core {
    pub mod archive;
    pub mod cookbook;
    pub mod item_definition;
    pub mod item_lookup;
    pub mod kitchen;
    pub mod pantry;
    pub mod prepared_item;
    pub mod recipe;
    pub mod slicer;

    pub use archive::Archive;
    pub use cookbook::Cookbook;
    pub use item_definition::ItemDefinition;
    pub use kitchen::Kitchen;
    pub use pantry::Pantry;
    pub use prepared_item::PreparedItem;
    pub use recipe::Recipe;
}

pub mod recipes;

pub mod format {
    pub mod legacy;
    pub mod standard;
}

pub mod session {
    pub mod apply;
    pub mod create;

    pub use apply::{ApplySession, ApplySessionOptions};
    pub use create::{CreateSession, CreateSessionOptions};
}

pub use error::{DiffError, Result};

pub mod prelude {
    pub use crate::Result;
    pub use crate::core::{Archive, Cookbook, ItemDefinition, Kitchen, Pantry, PreparedItem, Recipe};
    pub use crate::error::DiffError;
    pub use crate::hash::{Algorithm, Hash};
    pub use crate::session::{ApplySession, ApplySessionOptions, CreateSession, CreateSessionOptions};
}
