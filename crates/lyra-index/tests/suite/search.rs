//! The query facade: index search hydrated from the metadata store.

use std::sync::Arc;

use lyra_core::{ArtifactKind, SymbolKind, TrackedFile};
use lyra_index::{FixedTargets, RawSymbol, Target, ACC_PUBLIC};
use lyra_store::SearchIndex;

use super::support::{new_engine, write_class, FakeExtractor};

fn seeded_engine() -> (
    lyra_index::IndexEngine,
    Arc<lyra_store::MemorySearchIndex>,
    Arc<lyra_store::MemorySymbolDb>,
    tempfile::TempDir,
) {
    let dir = tempfile::tempdir().unwrap();
    write_class(dir.path(), "Widget.class", 4);

    let extractor = FakeExtractor::new();
    extractor.set(
        "Widget.class",
        vec![
            RawSymbol::class("com.example.Widget", ACC_PUBLIC),
            RawSymbol::class("com.example.WidgetFactory", ACC_PUBLIC),
            RawSymbol::method("com.example.Widget.of", "(I)Lcom/example/Widget;", ACC_PUBLIC),
            RawSymbol::method("com.example.Widget.of", "(J)Lcom/example/Widget;", ACC_PUBLIC),
            RawSymbol::field("com.example.Widget.COUNT", "I", ACC_PUBLIC),
        ],
    );
    let targets = Arc::new(FixedTargets::new(vec![Target::ClassDir(
        dir.path().to_path_buf(),
    )]));
    let (engine, index, db) = new_engine(extractor, targets);
    engine.refresh().unwrap();
    (engine, index, db, dir)
}

#[test]
fn class_search_returns_hydrated_rows_in_index_order() {
    let (engine, _index, _db, _dir) = seeded_engine();

    let hits = engine.search_classes("widget", 10).unwrap();
    let fqns: Vec<&str> = hits.iter().map(|s| s.fqn.as_str()).collect();
    // Shortest hit first, and every row is a full symbol, not a bare FQN.
    assert_eq!(fqns, vec!["com.example.Widget", "com.example.WidgetFactory"]);
    assert!(hits.iter().all(|s| s.kind() == SymbolKind::Class));
    assert!(hits.iter().all(|s| !s.entry.is_empty()));
}

#[test]
fn method_search_matches_classes_and_methods() {
    let (engine, _index, _db, _dir) = seeded_engine();

    let hits = engine
        .search_classes_methods(&["widget".to_string(), "of(".to_string()], 10)
        .unwrap();
    assert_eq!(hits.len(), 2, "both overloads match");
    assert!(hits.iter().all(|s| s.kind() == SymbolKind::Method));
}

#[test]
fn overloads_are_distinct_rows() {
    let (engine, _index, _db, _dir) = seeded_engine();

    let int_overload = engine
        .find_unique("com.example.Widget.of(I)Lcom/example/Widget;")
        .unwrap()
        .unwrap();
    let long_overload = engine
        .find_unique("com.example.Widget.of(J)Lcom/example/Widget;")
        .unwrap()
        .unwrap();
    assert_ne!(int_overload.fqn, long_overload.fqn);
    assert_eq!(
        int_overload.method_descriptor.as_deref(),
        Some("(I)Lcom/example/Widget;")
    );
}

#[test]
fn find_unique_misses_return_none() {
    let (engine, _index, _db, _dir) = seeded_engine();
    assert!(engine.find_unique("com.example.Nope").unwrap().is_none());
}

#[test]
fn index_hits_unknown_to_the_db_are_dropped() {
    let (engine, index, _db, _dir) = seeded_engine();

    // Plant an index document with no metadata row behind it, as happens
    // transiently between a delete and the next commit.
    let orphan_check = TrackedFile {
        uri: lyra_core::ArtifactUri::new("/orphan.class"),
        kind: ArtifactKind::ClassFile,
        token: lyra_core::ChangeToken::from_raw(1),
    };
    index
        .persist(
            &orphan_check,
            &[lyra_core::FqnSymbol {
                container: lyra_core::ArtifactUri::new("/orphan.class"),
                entry: "/orphan.class".to_string(),
                fqn: "com.example.WidgetOrphan".to_string(),
                method_descriptor: None,
                field_descriptor: None,
                source: None,
                line: None,
            }],
        )
        .unwrap();

    let hits = engine.search_classes("widget", 10).unwrap();
    assert!(hits.iter().all(|s| s.fqn != "com.example.WidgetOrphan"));
    assert_eq!(hits.len(), 2);
}

#[test]
fn persisting_identical_rows_twice_is_observably_idempotent() {
    let extractor = FakeExtractor::new();
    let (engine, _index, _db) = new_engine(extractor, Arc::new(FixedTargets::default()));

    let check = TrackedFile {
        uri: lyra_core::ArtifactUri::new("/build/Gadget.class"),
        kind: ArtifactKind::ClassFile,
        token: lyra_core::ChangeToken::from_raw(1),
    };
    let symbol = lyra_core::FqnSymbol {
        container: check.uri.clone(),
        entry: "/build/Gadget.class".to_string(),
        fqn: "com.example.Gadget".to_string(),
        method_descriptor: None,
        field_descriptor: None,
        source: None,
        line: None,
    };

    // Overlapping cycles can write the same file twice; the second write
    // conflicts in the db (swallowed) and lands a second index document.
    engine.persist(&check, &[symbol.clone()]).unwrap();
    engine.persist(&check, &[symbol]).unwrap();

    let hits = engine.search_classes("gadget", 10).unwrap();
    let fqns: Vec<&str> = hits.iter().map(|s| s.fqn.as_str()).collect();
    assert_eq!(fqns, vec!["com.example.Gadget"], "one hit, never two");
    assert!(engine.find_unique("com.example.Gadget").unwrap().is_some());
}

#[test]
fn max_bounds_the_result_set() {
    let (engine, _index, _db, _dir) = seeded_engine();
    assert_eq!(engine.search_classes("widget", 1).unwrap().len(), 1);
    assert!(engine.search_classes("widget", 0).unwrap().is_empty());
}
