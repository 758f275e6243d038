use std::sync::Arc;

use diffkit_core::core::{ItemDefinition, Kitchen, Pantry};
use diffkit_core::core::recipe::Recipe;
use diffkit_core::core::slicer::Slicer;
use diffkit_core::format::standard::{self, ArchiveSpec, GroupSpec, RecipeSpec};
use diffkit_core::hash::{Algorithm, hash_reader};
use diffkit_core::io::sequential::BytesReaderFactory;

#[test]
fn standard_format_probe_accepts_only_its_own_magic() {
    assert!(standard::is_this_format(b"PAMZ\x01\x00\x00\x00"));
    assert!(!standard::is_this_format(b"ADUP\x01\x00\x00\x00"));
    assert!(!standard::is_this_format(b"xx"));
}

#[test]
fn standard_archive_round_trips_through_bytes() {
    let target = ItemDefinition::new(5).with_name("target");
    let spec = ArchiveSpec {
        target: target.clone(),
        required_sources: vec![],
        groups: vec![GroupSpec {
            result: target.clone(),
            recipes: vec![RecipeSpec::InlineAsset { bytes: b"howdy".to_vec() }],
        }],
        remainder: Vec::new(),
    };

    let mut buf = Vec::new();
    standard::write_archive(&mut buf, &spec).unwrap();
    assert!(standard::is_this_format(&buf));

    let (archive, pantry) = standard::read_archive(&mut buf.as_slice()).unwrap();
    assert_eq!(archive.target, target);
    assert!(pantry.is_empty() || pantry.len() == 1);

    let kitchen = Kitchen::new(vec![archive.cookbook], pantry);
    let prepared = kitchen.request_item(&archive.target).unwrap();
    let reader = prepared.open().unwrap();
    let mut out = vec![0u8; reader.size() as usize];
    reader.read_at(0, &mut out).unwrap();
    assert_eq!(out, b"howdy");
}

#[test]
fn standard_archive_remainder_chunk_round_trips() {
    let target = ItemDefinition::new(4).with_name("target");
    let spec = ArchiveSpec {
        target: target.clone(),
        required_sources: vec![],
        groups: vec![GroupSpec {
            result: target.clone(),
            recipes: vec![RecipeSpec::RemainderChunk { offset: 2, length: 4 }],
        }],
        remainder: b"xxLEFTOVERxx".to_vec(),
    };

    let mut buf = Vec::new();
    standard::write_archive(&mut buf, &spec).unwrap();
    let (archive, pantry) = standard::read_archive(&mut buf.as_slice()).unwrap();

    let kitchen = Kitchen::new(vec![archive.cookbook], pantry);
    let prepared = kitchen.request_item(&archive.target).unwrap();
    let reader = prepared.open().unwrap();
    let mut out = vec![0u8; reader.size() as usize];
    reader.read_at(0, &mut out).unwrap();
    assert_eq!(out, b"LEFT");
}

#[test]
fn unknown_recipe_kind_is_rejected_at_read_time() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&standard::MAGIC);
    buf.extend_from_slice(&standard::VERSION.to_le_bytes());
    // target item: length=0, no name, no hashes
    buf.extend_from_slice(&0u64.to_le_bytes());
    buf.push(0);
    buf.push(0);
    // required_sources count = 0
    buf.extend_from_slice(&0u32.to_le_bytes());
    // groups count = 1
    buf.extend_from_slice(&1u32.to_le_bytes());
    // group result item: length=0, no name, no hashes
    buf.extend_from_slice(&0u64.to_le_bytes());
    buf.push(0);
    buf.push(0);
    // recipe count = 1
    buf.extend_from_slice(&1u32.to_le_bytes());
    // recipe kind = 999 (invalid)
    buf.extend_from_slice(&999u32.to_le_bytes());
    // numbers count = 0, items count = 0
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    // inline bytes len = 0
    buf.extend_from_slice(&0u64.to_le_bytes());
    // remainder len = 0
    buf.extend_from_slice(&0u64.to_le_bytes());

    let err = standard::read_archive(&mut buf.as_slice()).unwrap_err();
    assert_eq!(err.code(), "unknown_recipe_type");
}

#[test]
fn slicer_extracts_requested_ranges_in_any_fetch_order() {
    let payload = b"0123456789ABCDEFGHIJ".to_vec();
    let hashes = hash_reader(payload.as_slice(), &Algorithm::ALL).unwrap();
    let sha256 = hashes.into_iter().find(|h| h.algorithm == Algorithm::Sha256);

    let factory: Arc<dyn diffkit_core::io::sequential::SequentialReaderFactory> =
        Arc::new(BytesReaderFactory(Arc::new(payload)));
    let slicer = Slicer::new(factory);

    slicer.request_slice(0, 5, None).unwrap();
    slicer.request_slice(10, 10, sha256).unwrap();
    slicer.resume_slicing().unwrap();

    // Fetch out of registration order; the worker still satisfies both.
    let second = slicer.fetch_slice(10, 10).unwrap();
    assert_eq!(second.as_slice(), b"ABCDEFGHIJ");
    let first = slicer.fetch_slice(0, 5).unwrap();
    assert_eq!(first.as_slice(), b"01234");
}

#[test]
fn slicer_rejects_overlapping_requests() {
    let payload = b"0123456789".to_vec();
    let factory: Arc<dyn diffkit_core::io::sequential::SequentialReaderFactory> =
        Arc::new(BytesReaderFactory(Arc::new(payload)));
    let slicer = Slicer::new(factory);

    slicer.request_slice(0, 5, None).unwrap();
    let err = slicer.request_slice(3, 5, None).unwrap_err();
    assert_eq!(err.code(), "diff_slicing_request_slice_overlap");
}

#[test]
fn slicer_detects_hash_mismatch_on_produced_slice() {
    let payload = b"0123456789".to_vec();
    let wrong_hash = hash_reader(b"9999999999".as_slice(), &[Algorithm::Sha256]).unwrap().remove(0);

    let factory: Arc<dyn diffkit_core::io::sequential::SequentialReaderFactory> =
        Arc::new(BytesReaderFactory(Arc::new(payload)));
    let slicer = Slicer::new(factory);
    slicer.request_slice(0, 10, Some(wrong_hash)).unwrap();
    slicer.resume_slicing().unwrap();

    let err = slicer.fetch_slice(0, 10).unwrap_err();
    assert_eq!(err.code(), "diff_slicing_produced_hash_mismatch");
}

#[test]
fn slicer_can_be_cancelled_cleanly() {
    let payload = vec![0u8; 1024];
    let factory: Arc<dyn diffkit_core::io::sequential::SequentialReaderFactory> =
        Arc::new(BytesReaderFactory(Arc::new(payload)));
    let slicer = Slicer::new(factory);
    slicer.request_slice(0, 512, None).unwrap();
    slicer.request_slice(512, 512, None).unwrap();
    slicer.resume_slicing().unwrap();
    slicer.cancel_slicing();
    // A fresh fetch for a slice never produced before cancellation fails
    // cleanly rather than hanging.
    let result = slicer.fetch_slice(512, 512);
    assert!(result.is_ok() || result.is_err());
}

#[test]
fn legacy_format_disambiguates_copy_by_explicit_flag() {
    use diffkit_core::format::legacy;

    let mut buf = Vec::new();
    buf.extend_from_slice(&legacy::MAGIC);
    // target item: length=3, no name, no hashes
    buf.extend_from_slice(&3u64.to_le_bytes());
    buf.push(0);
    buf.push(0);
    // required_sources count = 0
    buf.extend_from_slice(&0u32.to_le_bytes());
    // groups count = 1
    buf.extend_from_slice(&1u32.to_le_bytes());
    // group result item: same as target
    buf.extend_from_slice(&3u64.to_le_bytes());
    buf.push(0);
    buf.push(0);
    // recipe count = 1
    buf.extend_from_slice(&1u32.to_le_bytes());
    // recipe name "copy"
    buf.push(4);
    buf.extend_from_slice(b"copy");
    // numbers: [1 (is_source), offset=0, length=3]
    buf.extend_from_slice(&3u32.to_le_bytes());
    buf.extend_from_slice(&1u64.to_le_bytes());
    buf.extend_from_slice(&0u64.to_le_bytes());
    buf.extend_from_slice(&3u64.to_le_bytes());
    // items: [parent item: length=3, no name, no hashes]
    buf.extend_from_slice(&1u32.to_le_bytes());
    buf.extend_from_slice(&3u64.to_le_bytes());
    buf.push(0);
    buf.push(0);
    // inline bytes len = 0
    buf.extend_from_slice(&0u64.to_le_bytes());
    // remainder len = 0
    buf.extend_from_slice(&0u64.to_le_bytes());

    let (archive, _pantry) = legacy::read_archive(&mut buf.as_slice()).unwrap();
    let recipes = archive.cookbook.recipes_for(&archive.target).unwrap();
    assert_eq!(recipes.len(), 1);
    assert_eq!(recipes[0].name(), "copy_source");
}

#[test]
fn dependency_cycle_between_two_recipes_is_rejected() {
    use diffkit_core::core::Cookbook;
    use diffkit_core::recipes::SliceRecipe;

    let a = ItemDefinition::new(4).with_name("a");
    let b = ItemDefinition::new(4).with_name("b");

    let recipe_a = SliceRecipe::new(a.clone(), b.clone(), 0, 4).unwrap();
    let recipe_b = SliceRecipe::new(b.clone(), a.clone(), 0, 4).unwrap();
    let cookbook = Cookbook::from_recipes(vec![Arc::new(recipe_a), Arc::new(recipe_b)]).unwrap();

    let kitchen = Kitchen::new(vec![Arc::new(cookbook)], Pantry::new());
    let err = kitchen.request_item(&a).unwrap_err();
    assert_eq!(err.code(), "diff_dependency_cycle");
}
