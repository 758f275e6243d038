pub mod all_zero;
pub mod bsdiff_delta;
pub mod chain;
pub mod copy_source;
pub mod inline_asset;
pub mod nested_diff;
pub mod remainder_chunk;
pub mod slice;
pub mod zlib_decompression;
pub mod zstd_compression;
pub mod zstd_decompression;
pub mod zstd_delta;

pub use all_zero::AllZeroRecipe;
pub use bsdiff_delta::BsdiffDeltaRecipe;
pub use chain::ChainRecipe;
pub use copy_source::CopySourceRecipe;
pub use inline_asset::InlineAssetRecipe;
pub use nested_diff::NestedDiffRecipe;
pub use remainder_chunk::RemainderChunkRecipe;
pub use slice::SliceRecipe;
pub use zlib_decompression::ZlibDecompressionRecipe;
pub use zstd_compression::ZstdCompressionRecipe;
pub use zstd_decompression::ZstdDecompressionRecipe;
pub use zstd_delta::ZstdDeltaRecipe;
