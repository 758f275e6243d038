//! End-to-end archive-building and archive-applying scenarios, grounded in
//! the six seed cases this format needs to be able to express: a plain
//! copy-source region, a chain of copy-source regions, an inline asset, a
//! raw remainder chunk, a zstd compression of a copy-source region, and
//! hash-mismatch detection at apply time.

use std::sync::Arc;

use diffkit_core::core::{Archive, Cookbook, ItemDefinition, Kitchen, Pantry};
use diffkit_core::hash::{Algorithm, hash_reader};
use diffkit_core::io::reader::{MemoryReaderFactory, SequentialOnlyReaderFactory};
use diffkit_core::io::sequential::BytesReaderFactory;
use diffkit_core::recipes::{AllZeroRecipe, ChainRecipe, CopySourceRecipe, InlineAssetRecipe, RemainderChunkRecipe, SliceRecipe, ZstdCompressionRecipe};
use diffkit_core::session::{CreateSession, CreateSessionOptions};

fn item_with_hash(bytes: &[u8], name: &str) -> ItemDefinition {
    let hashes = hash_reader(bytes, &Algorithm::ALL).unwrap();
    let mut item = ItemDefinition::new(bytes.len() as u64).with_name(name);
    item.hashes = hashes;
    item
}

fn source_pantry(bytes: &[u8], item: &ItemDefinition) -> Pantry {
    let mut pantry = Pantry::new();
    let factory = MemoryReaderFactory::new(bytes.to_vec());
    pantry.stock(Arc::new(diffkit_core::core::PreparedItem::new(item.clone(), factory)));
    pantry
}

fn resolve(cookbook: Cookbook, target: &ItemDefinition, pantry: Pantry) -> Vec<u8> {
    let kitchen = Kitchen::new(vec![Arc::new(cookbook)], pantry);
    let prepared = kitchen.request_item(target).unwrap();
    let reader = prepared.open().unwrap();
    let mut buf = vec![0u8; reader.size() as usize];
    reader.read_at(0, &mut buf).unwrap();
    buf
}

#[test]
fn copy_source_region_roundtrips() {
    let source = b"the quick brown fox jumps over the lazy dog".to_vec();
    let source_item = item_with_hash(&source, "source");

    let target_item = ItemDefinition::new(9).with_name("target");
    let recipe = CopySourceRecipe::new(target_item.clone(), source_item.clone(), 4, 9).unwrap();
    let cookbook = Cookbook::from_recipes(vec![Arc::new(recipe)]).unwrap();

    let out = resolve(cookbook, &target_item, source_pantry(&source, &source_item));
    assert_eq!(out, b"quick bro");
}

#[test]
fn chain_of_copy_source_regions_roundtrips() {
    let source = b"ABCDEFGHIJKLMNOP".to_vec();
    let source_item = item_with_hash(&source, "source");

    let part_a = ItemDefinition::new(3).with_name("a");
    let part_b = ItemDefinition::new(3).with_name("b");
    let target_item = ItemDefinition::new(6).with_name("target");

    let recipe_a = CopySourceRecipe::new(part_a.clone(), source_item.clone(), 0, 3).unwrap();
    let recipe_b = CopySourceRecipe::new(part_b.clone(), source_item.clone(), 10, 3).unwrap();
    let chain = ChainRecipe::new(target_item.clone(), vec![part_a, part_b]).unwrap();

    let cookbook = Cookbook::from_recipes(vec![Arc::new(recipe_a), Arc::new(recipe_b), Arc::new(chain)]).unwrap();
    let out = resolve(cookbook, &target_item, source_pantry(&source, &source_item));
    assert_eq!(out, b"ABCKLM");
}

#[test]
fn inline_asset_roundtrips() {
    let target_item = ItemDefinition::new(5).with_name("target");
    let recipe = InlineAssetRecipe::new(target_item.clone(), b"hello".to_vec()).unwrap();
    let cookbook = Cookbook::from_recipes(vec![Arc::new(recipe)]).unwrap();

    let out = resolve(cookbook, &target_item, Pantry::new());
    assert_eq!(out, b"hello");
}

#[test]
fn inline_asset_rejects_wrong_byte_count() {
    let target_item = ItemDefinition::new(6).with_name("target");
    let err = InlineAssetRecipe::new(target_item, b"hello".to_vec()).unwrap_err();
    assert_eq!(err.code(), "inline_asset_byte_count_mismatch");
}

#[test]
fn remainder_chunk_roundtrips() {
    let remainder_bytes = b"raw leftover payload bytes".to_vec();
    let remainder_item = ItemDefinition::new(remainder_bytes.len() as u64).with_name("__remainder__");
    let mut pantry = Pantry::new();
    pantry.stock(Arc::new(diffkit_core::core::PreparedItem::new(
        remainder_item.clone(),
        MemoryReaderFactory::new(remainder_bytes.clone()),
    )));

    let target_item = ItemDefinition::new(7).with_name("target");
    let recipe = RemainderChunkRecipe::new(target_item.clone(), remainder_item, 4, 7).unwrap();
    let cookbook = Cookbook::from_recipes(vec![Arc::new(recipe)]).unwrap();

    let out = resolve(cookbook, &target_item, pantry);
    assert_eq!(out, b"leftove");
}

#[test]
fn zstd_compression_of_copy_source_roundtrips() {
    let source = b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_vec();
    let source_item = item_with_hash(&source, "source");

    let raw_item = ItemDefinition::new(source.len() as u64).with_name("raw");
    let raw_recipe = CopySourceRecipe::new(raw_item.clone(), source_item.clone(), 0, source.len() as u64).unwrap();

    let compressed = diffkit_core::codec::zstdc::compress(&source, None, 3).unwrap();
    let compressed_item = ItemDefinition::new(compressed.len() as u64).with_name("compressed");
    let compression_recipe = ZstdCompressionRecipe::new(compressed_item.clone(), raw_item, 3).unwrap();

    let cookbook = Cookbook::from_recipes(vec![Arc::new(raw_recipe), Arc::new(compression_recipe)]).unwrap();
    let out = resolve(cookbook, &compressed_item, source_pantry(&source, &source_item));

    let decompressed = diffkit_core::codec::zstdc::decompress(&out, None, source.len() as u64).unwrap();
    assert_eq!(decompressed, source);
}

#[test]
fn corrupted_result_bytes_fail_hash_verification() {
    let expected = b"correct payload";
    let target_item = item_with_hash(expected, "target");

    // Same length as `expected` so the byte-count check passes, but the
    // recipe's actual output disagrees with `target_item`'s declared hash.
    let wrong_bytes = b"WRONG!! payload!".to_vec();
    assert_eq!(wrong_bytes.len(), expected.len());
    let recipe = InlineAssetRecipe::new(target_item.clone(), wrong_bytes).unwrap();
    let cookbook = Cookbook::from_recipes(vec![Arc::new(recipe)]).unwrap();

    let kitchen = Kitchen::new(vec![Arc::new(cookbook)], Pantry::new());
    let prepared = kitchen.request_item(&target_item).unwrap();
    let reader = prepared.open().unwrap();
    let mut buf = vec![0u8; reader.size() as usize];
    let err = reader.read_at(0, &mut buf).unwrap_err();
    assert_eq!(err.code(), "diff_verify_hash_failure");
}

#[test]
fn apply_leaves_no_partial_output_when_source_is_corrupted_after_hashing() {
    let source_dir = tempfile::tempdir().unwrap();
    let source_path = source_dir.path().join("source.bin");
    let target_path = source_dir.path().join("target.bin");
    let archive_path = source_dir.path().join("archive.bin");
    let out_path = source_dir.path().join("out.bin");

    let mut source = b"HEADER-".repeat(20);
    source.extend_from_slice(b"middle section that changes completely between versions");
    source.extend_from_slice(b"-TRAILER");

    let mut target = b"HEADER-".repeat(20);
    target.extend_from_slice(b"a totally different middle section with new content");
    target.extend_from_slice(b"-TRAILER");

    std::fs::write(&source_path, &source).unwrap();
    std::fs::write(&target_path, &target).unwrap();

    let session = CreateSession::new(CreateSessionOptions::default());
    let spec = session.build(&source_path, &target_path).unwrap();
    diffkit_core::session::create::write_diff(&spec, &archive_path).unwrap();

    let mut apply_session = diffkit_core::session::ApplySession::new(diffkit_core::session::ApplySessionOptions::default());
    apply_session.add_source(&source_path).unwrap();

    // Corrupt the source on disk after its hash has already been recorded:
    // the pantry still finds it by identity, but `copy_source` now reads
    // different bytes than the archive's target hash was computed from.
    let mut corrupted = source.clone();
    corrupted[0] ^= 0xFF;
    std::fs::write(&source_path, &corrupted).unwrap();

    apply_session.load_archive(&archive_path).unwrap();
    let err = apply_session.apply(&out_path).unwrap_err();
    assert_eq!(err.code(), "diff_verify_hash_failure");
    assert!(!out_path.exists(), "a failed apply must not leave a partial target file");
}

#[test]
fn copy_source_over_sequential_only_parent_goes_through_slicer() {
    let source = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ".to_vec();
    let source_item = item_with_hash(&source, "source");

    let sequential = diffkit_core::core::PreparedItem::new(
        source_item.clone(),
        SequentialOnlyReaderFactory::new(Arc::new(BytesReaderFactory(Arc::new(source.clone()))), source.len() as u64),
    );
    let mut pantry = Pantry::new();
    pantry.stock(Arc::new(sequential));

    let part_a = ItemDefinition::new(5).with_name("a");
    let part_b = ItemDefinition::new(6).with_name("b");
    let recipe_a = CopySourceRecipe::new(part_a.clone(), source_item.clone(), 0, 5).unwrap();
    let recipe_b = CopySourceRecipe::new(part_b.clone(), source_item.clone(), 20, 6).unwrap();
    let cookbook = Cookbook::from_recipes(vec![Arc::new(recipe_a), Arc::new(recipe_b)]).unwrap();

    let kitchen = Kitchen::new(vec![Arc::new(cookbook)], pantry);
    let requested = vec![part_a.clone(), part_b.clone()];

    // select_only walks the dependency graph and registers every slice
    // needed against the source's (single) slicer, without preparing
    // anything — the sequential source is still untouched at this point.
    assert!(kitchen.process_requested_items(&requested, true).unwrap());
    kitchen.resume_slicing().unwrap();
    assert!(kitchen.process_requested_items(&requested, false).unwrap());

    let a = kitchen.fetch_item(&part_a).unwrap();
    let b = kitchen.fetch_item(&part_b).unwrap();
    let mut buf_a = vec![0u8; a.size() as usize];
    a.open().unwrap().read_at(0, &mut buf_a).unwrap();
    let mut buf_b = vec![0u8; b.size() as usize];
    b.open().unwrap().read_at(0, &mut buf_b).unwrap();
    assert_eq!(buf_a, b"ABCDE");
    assert_eq!(buf_b, b"UVWXYZ");
}

#[test]
fn slice_over_sequential_only_parent_goes_through_slicer() {
    let source = b"0123456789abcdefghijklmnop".to_vec();
    let source_item = item_with_hash(&source, "source");

    let sequential = diffkit_core::core::PreparedItem::new(
        source_item.clone(),
        SequentialOnlyReaderFactory::new(Arc::new(BytesReaderFactory(Arc::new(source.clone()))), source.len() as u64),
    );
    let mut pantry = Pantry::new();
    pantry.stock(Arc::new(sequential));

    let middle = ItemDefinition::new(10).with_name("middle");
    let recipe = SliceRecipe::new(middle.clone(), source_item.clone(), 8, 10).unwrap();
    let cookbook = Cookbook::from_recipes(vec![Arc::new(recipe)]).unwrap();

    let kitchen = Kitchen::new(vec![Arc::new(cookbook)], pantry);
    let requested = vec![middle.clone()];

    assert!(kitchen.process_requested_items(&requested, true).unwrap());
    kitchen.resume_slicing().unwrap();
    assert!(kitchen.process_requested_items(&requested, false).unwrap());

    let prepared = kitchen.fetch_item(&middle).unwrap();
    let mut buf = vec![0u8; prepared.size() as usize];
    prepared.open().unwrap().read_at(0, &mut buf).unwrap();
    assert_eq!(buf, b"89abcdefgh");
}

#[test]
fn self_referential_recipe_is_rejected() {
    let item = ItemDefinition::new(4).with_name("loop");
    let err = CopySourceRecipe::new(item.clone(), item, 0, 4).unwrap_err();
    assert_eq!(err.code(), "recipe_self_referential");
}

#[test]
fn all_zero_recipe_fills_with_zero_bytes() {
    let target_item = ItemDefinition::new(8).with_name("target");
    let recipe = AllZeroRecipe::new(target_item.clone());
    let cookbook = Cookbook::from_recipes(vec![Arc::new(recipe)]).unwrap();
    let out = resolve(cookbook, &target_item, Pantry::new());
    assert_eq!(out, vec![0u8; 8]);
}

#[test]
fn create_session_round_trips_through_standard_format() {
    let source_dir = tempfile::tempdir().unwrap();
    let source_path = source_dir.path().join("source.bin");
    let target_path = source_dir.path().join("target.bin");
    let archive_path = source_dir.path().join("archive.bin");
    let out_path = source_dir.path().join("out.bin");

    let mut source = b"HEADER-".repeat(20);
    source.extend_from_slice(b"middle section that changes completely between versions");
    source.extend_from_slice(b"-TRAILER");

    let mut target = b"HEADER-".repeat(20);
    target.extend_from_slice(b"a totally different middle section with new content");
    target.extend_from_slice(b"-TRAILER");

    std::fs::write(&source_path, &source).unwrap();
    std::fs::write(&target_path, &target).unwrap();

    let session = CreateSession::new(CreateSessionOptions::default());
    let spec = session.build(&source_path, &target_path).unwrap();
    diffkit_core::session::create::write_diff(&spec, &archive_path).unwrap();

    let mut apply_session = diffkit_core::session::ApplySession::new(diffkit_core::session::ApplySessionOptions::default());
    apply_session.add_source(&source_path).unwrap();
    apply_session.load_archive(&archive_path).unwrap();
    apply_session.apply(&out_path).unwrap();

    let produced = std::fs::read(&out_path).unwrap();
    assert_eq!(produced, target);
}

#[test]
fn archive_exposes_required_sources_and_cookbook_len() {
    let source_item = ItemDefinition::new(4).with_name("source");
    let target_item = ItemDefinition::new(4).with_name("target");
    let recipe = CopySourceRecipe::new(target_item.clone(), source_item.clone(), 0, 4).unwrap();
    let cookbook = Cookbook::from_recipes(vec![Arc::new(recipe)]).unwrap();
    let archive = Archive::new(target_item, vec![source_item], cookbook);
    assert_eq!(archive.required_sources.len(), 1);
    assert_eq!(archive.cookbook.len(), 1);
}
