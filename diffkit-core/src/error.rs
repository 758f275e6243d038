use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiffError>;

#[derive(Error, Debug)]
pub enum DiffError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("format error: {0}")]
    Format(String),

    #[error("item_definition_hash_same_type_different_value: {0}")]
    ItemHashConflict(String),

    #[error("item_definition_hash_size_mismatch: {0}")]
    ItemHashSizeMismatch(String),

    #[error("item_definition_no_sha256_hash: {0}")]
    ItemNoSha256Hash(String),

    #[error("recipe_self_referential: recipe '{0}' result item matches one of its ingredients")]
    RecipeSelfReferential(String),

    #[error(
        "diff_recipe_invalid_parameter_count: recipe '{name}' expected {expected_numbers} numbers / {expected_items} items, got {actual_numbers} / {actual_items}"
    )]
    RecipeInvalidParameterCount {
        name: String,
        expected_numbers: usize,
        actual_numbers: usize,
        expected_items: usize,
        actual_items: usize,
    },

    #[error("value_exceeds_size_t: {0}")]
    ValueExceedsSizeT(u64),

    #[error("diff_verify_hash_failure: {0}")]
    VerifyHashFailure(String),

    #[error("reader_read_failure: expected {expected} bytes, read {actual}")]
    ReaderReadFailure { expected: u64, actual: u64 },

    #[error("diffs_kitchen_item_not_ready_to_fetch: {0}")]
    KitchenItemNotReady(String),

    #[error("diff_dependency_unreachable: {0}")]
    DependencyUnreachable(String),

    #[error("diff_dependency_cycle: {0}")]
    DependencyCycle(String),

    #[error("diff_slicing_request_slice_overlap: {0}")]
    SlicingRequestOverlap(String),

    #[error("diff_slicing_request_slice_no_hash: {0}")]
    SlicingRequestNoHash(String),

    #[error("diff_slicing_request_size_too_large: {0}")]
    SlicingRequestSizeTooLarge(String),

    #[error("diff_slicing_produced_hash_mismatch: {0}")]
    SlicingProducedHashMismatch(String),

    #[error("diff_slicing_invalid_state: {0}")]
    SlicingInvalidState(String),

    #[error("diff_slicing_no_stored_item: {0}")]
    SlicingNoStoredItem(String),

    #[error("diff_slicing_no_slices_requested: {0}")]
    SlicingNoSlicesRequested(String),

    #[error("diff_slicing_no_requests_for_slice: {0}")]
    SlicingNoRequestsForSlice(String),

    #[error("magic_mismatch: expected {expected:?}, found {found:?}")]
    MagicMismatch { expected: [u8; 4], found: [u8; 4] },

    #[error("version_mismatch: unsupported archive version {0}")]
    VersionMismatch(u64),

    #[error("chunk_count_too_large: {0}")]
    ChunkCountTooLarge(u64),

    #[error("inline_asset_byte_count_mismatch: expected {expected}, got {actual}")]
    InlineAssetByteCountMismatch { expected: u64, actual: u64 },

    #[error("copy_source_offset_too_large: {0}")]
    CopySourceOffsetTooLarge(u64),

    #[error("remainder_chunk_length_too_large: {0}")]
    RemainderChunkLengthTooLarge(u64),

    #[error("zlib_reader_init_failed: {0}")]
    ZlibReaderInitFailed(String),

    #[error("zstd_decompress_stream_failed: {0}")]
    ZstdDecompressStreamFailed(String),

    #[error("zstd_dictionary_too_large: {0}")]
    ZstdDictionaryTooLarge(u64),

    #[error("unknown_recipe_type: {0}")]
    UnknownRecipeType(u32),

    #[error("bsdiff_apply_failed: {0}")]
    BsdiffApplyFailed(String),

    #[error("diff_sequential_source_cannot_random_access: {0}")]
    SequentialSourceCannotRandomAccess(String),
}

impl DiffError {
    /// The stable string code for this error, independent of the
    /// human-readable `Display` message.
    pub fn code(&self) -> &'static str {
        use DiffError::*;
        match self {
            Io(_) => "io_error",
            Format(_) => "format_error",
            ItemHashConflict(_) => "item_definition_hash_same_type_different_value",
            ItemHashSizeMismatch(_) => "item_definition_hash_size_mismatch",
            ItemNoSha256Hash(_) => "item_definition_no_sha256_hash",
            RecipeSelfReferential(_) => "recipe_self_referential",
            RecipeInvalidParameterCount { .. } => "diff_recipe_invalid_parameter_count",
            ValueExceedsSizeT(_) => "value_exceeds_size_t",
            VerifyHashFailure(_) => "diff_verify_hash_failure",
            ReaderReadFailure { .. } => "reader_read_failure",
            KitchenItemNotReady(_) => "diffs_kitchen_item_not_ready_to_fetch",
            DependencyUnreachable(_) => "diff_dependency_unreachable",
            DependencyCycle(_) => "diff_dependency_cycle",
            SlicingRequestOverlap(_) => "diff_slicing_request_slice_overlap",
            SlicingRequestNoHash(_) => "diff_slicing_request_slice_no_hash",
            SlicingRequestSizeTooLarge(_) => "diff_slicing_request_size_too_large",
            SlicingProducedHashMismatch(_) => "diff_slicing_produced_hash_mismatch",
            SlicingInvalidState(_) => "diff_slicing_invalid_state",
            SlicingNoStoredItem(_) => "diff_slicing_no_stored_item",
            SlicingNoSlicesRequested(_) => "diff_slicing_no_slices_requested",
            SlicingNoRequestsForSlice(_) => "diff_slicing_no_requests_for_slice",
            MagicMismatch { .. } => "magic_mismatch",
            VersionMismatch(_) => "version_mismatch",
            ChunkCountTooLarge(_) => "chunk_count_too_large",
            InlineAssetByteCountMismatch { .. } => "inline_asset_byte_count_mismatch",
            CopySourceOffsetTooLarge(_) => "copy_source_offset_too_large",
            RemainderChunkLengthTooLarge(_) => "remainder_chunk_length_too_large",
            ZlibReaderInitFailed(_) => "zlib_reader_init_failed",
            ZstdDecompressStreamFailed(_) => "zstd_decompress_stream_failed",
            ZstdDictionaryTooLarge(_) => "zstd_dictionary_too_large",
            UnknownRecipeType(_) => "unknown_recipe_type",
            BsdiffApplyFailed(_) => "bsdiff_apply_failed",
            SequentialSourceCannotRandomAccess(_) => "diff_sequential_source_cannot_random_access",
        }
    }

    pub fn io_other(msg: impl Into<String>) -> Self {
        DiffError::Io(std::io::Error::other(msg.into()))
    }
}
