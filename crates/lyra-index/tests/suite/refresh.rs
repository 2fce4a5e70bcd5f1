//! Full refresh cycles: staleness detection, sweeping and re-indexing.

use std::sync::Arc;

use lyra_index::{
    EngineConfig, FixedTargets, IndexEngine, NullSourceResolver, RawSymbol, RefreshStats, Target,
    ACC_PUBLIC,
};
use lyra_store::{MemorySymbolDb, StoreError, SymbolDb};

use super::support::{new_engine, write_class, write_jar, FailingCommitIndex, FakeExtractor};

#[test]
fn first_refresh_indexes_class_dirs_and_archives() {
    let dir = tempfile::tempdir().unwrap();
    write_class(dir.path(), "com/example/A.class", 4);
    write_class(dir.path(), "com/example/B.class", 4);
    let jar = dir.path().join("dep.jar");
    write_jar(&jar, &["org/dep/C.class"]);

    let extractor = FakeExtractor::new();
    extractor.set("A.class", vec![RawSymbol::class("com.example.A", ACC_PUBLIC)]);
    extractor.set("B.class", vec![RawSymbol::class("com.example.B", ACC_PUBLIC)]);
    extractor.set("C.class", vec![RawSymbol::class("org.dep.C", ACC_PUBLIC)]);

    let targets = Arc::new(FixedTargets::new(vec![
        Target::ClassDir(dir.path().to_path_buf()),
        Target::Archive(jar),
    ]));
    let (engine, index, db) = new_engine(extractor, targets);

    let stats = engine.refresh().unwrap();
    assert_eq!(stats, RefreshStats { removed: 0, indexed: 3 });
    assert_eq!(db.symbol_count(), 3);
    assert_eq!(index.commit_count(), 1, "one commit per cycle");

    let hits = engine.search_classes("example", 10).unwrap();
    assert_eq!(hits.len(), 2);
    assert!(engine.find_unique("org.dep.C").unwrap().is_some());
}

#[test]
fn unchanged_files_are_not_re_extracted() {
    let dir = tempfile::tempdir().unwrap();
    write_class(dir.path(), "A.class", 4);

    let extractor = FakeExtractor::new();
    extractor.set("A.class", vec![RawSymbol::class("com.example.A", ACC_PUBLIC)]);
    let targets = Arc::new(FixedTargets::new(vec![Target::ClassDir(
        dir.path().to_path_buf(),
    )]));
    let (engine, index, _db) = new_engine(extractor.clone(), targets);

    engine.refresh().unwrap();
    let calls_after_first = extractor.calls();

    let stats = engine.refresh().unwrap();
    assert_eq!(stats, RefreshStats::default());
    assert_eq!(extractor.calls(), calls_after_first);
    assert_eq!(index.commit_count(), 2, "even an idle cycle commits");
}

#[test]
fn a_new_archive_is_indexed_without_touching_known_files() {
    let dir = tempfile::tempdir().unwrap();
    write_class(dir.path(), "A.class", 4);

    let extractor = FakeExtractor::new();
    extractor.set("A.class", vec![RawSymbol::class("pkg.A", ACC_PUBLIC)]);
    extractor.set("B.class", vec![RawSymbol::class("pkg.B", ACC_PUBLIC)]);
    let targets = Arc::new(FixedTargets::new(vec![Target::ClassDir(
        dir.path().to_path_buf(),
    )]));
    let (engine, _index, _db) = new_engine(extractor, targets.clone());
    engine.refresh().unwrap();

    // A dependency jar joins the universe; A.class is unchanged.
    let jar = dir.path().join("b.jar");
    write_jar(&jar, &["pkg/B.class"]);
    targets.replace(vec![
        Target::ClassDir(dir.path().to_path_buf()),
        Target::Archive(jar),
    ]);

    let stats = engine.refresh().unwrap();
    assert_eq!(stats, RefreshStats { removed: 0, indexed: 1 });

    let hits = engine.search_classes("B", 10).unwrap();
    let fqns: Vec<&str> = hits.iter().map(|s| s.fqn.as_str()).collect();
    assert_eq!(fqns, vec!["pkg.B"]);
}

#[test]
fn changed_file_is_swept_and_re_indexed() {
    let dir = tempfile::tempdir().unwrap();
    write_class(dir.path(), "A.class", 4);

    let extractor = FakeExtractor::new();
    extractor.set("A.class", vec![RawSymbol::class("com.example.Old", ACC_PUBLIC)]);
    let targets = Arc::new(FixedTargets::new(vec![Target::ClassDir(
        dir.path().to_path_buf(),
    )]));
    let (engine, _index, db) = new_engine(extractor.clone(), targets);
    engine.refresh().unwrap();
    assert!(db.find("com.example.Old").unwrap().is_some());

    write_class(dir.path(), "A.class", 9);
    extractor.set("A.class", vec![RawSymbol::class("com.example.New", ACC_PUBLIC)]);

    let stats = engine.refresh().unwrap();
    assert_eq!(stats, RefreshStats { removed: 1, indexed: 1 });
    assert!(db.find("com.example.Old").unwrap().is_none());
    assert!(db.find("com.example.New").unwrap().is_some());
}

#[test]
fn deleted_file_is_swept() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_class(dir.path(), "A.class", 4);

    let extractor = FakeExtractor::new();
    extractor.set("A.class", vec![RawSymbol::class("com.example.A", ACC_PUBLIC)]);
    let targets = Arc::new(FixedTargets::new(vec![Target::ClassDir(
        dir.path().to_path_buf(),
    )]));
    let (engine, _index, db) = new_engine(extractor, targets);
    engine.refresh().unwrap();

    std::fs::remove_file(&path).unwrap();
    let stats = engine.refresh().unwrap();
    assert_eq!(stats, RefreshStats { removed: 1, indexed: 0 });
    assert!(db.find("com.example.A").unwrap().is_none());
    assert!(db.known_files().unwrap().is_empty());
}

#[test]
fn modification_and_dependency_removal_land_in_one_cycle() {
    let dir = tempfile::tempdir().unwrap();
    write_class(dir.path(), "A.class", 4);
    let jar = dir.path().join("b.jar");
    write_jar(&jar, &["org/dep/B.class"]);

    let extractor = FakeExtractor::new();
    extractor.set("A.class", vec![RawSymbol::class("com.example.A", ACC_PUBLIC)]);
    extractor.set("B.class", vec![RawSymbol::class("org.dep.B", ACC_PUBLIC)]);
    let targets = Arc::new(FixedTargets::new(vec![
        Target::ClassDir(dir.path().to_path_buf()),
        Target::Archive(jar.clone()),
    ]));
    let (engine, index, db) = new_engine(extractor.clone(), targets.clone());
    engine.refresh().unwrap();
    assert_eq!(db.symbol_count(), 2);

    // A.class recompiled; b.jar dropped from the project model while still
    // present on disk.
    write_class(dir.path(), "A.class", 9);
    extractor.set("A.class", vec![RawSymbol::class("com.example.A2", ACC_PUBLIC)]);
    targets.replace(vec![Target::ClassDir(dir.path().to_path_buf())]);

    let stats = engine.refresh().unwrap();
    assert_eq!(stats, RefreshStats { removed: 2, indexed: 1 });
    assert!(jar.is_file(), "the jar itself stays on disk");
    assert!(db.find("org.dep.B").unwrap().is_none());
    assert!(db.find("com.example.A").unwrap().is_none());
    assert!(db.find("com.example.A2").unwrap().is_some());
    assert_eq!(index.commit_count(), 2);
}

#[test]
fn extraction_failure_leaves_the_file_out_of_date() {
    let dir = tempfile::tempdir().unwrap();
    write_class(dir.path(), "Bad.class", 4);
    write_class(dir.path(), "Good.class", 4);

    let extractor = FakeExtractor::new();
    extractor.fail("Bad.class");
    extractor.set("Good.class", vec![RawSymbol::class("com.example.Good", ACC_PUBLIC)]);
    let targets = Arc::new(FixedTargets::new(vec![Target::ClassDir(
        dir.path().to_path_buf(),
    )]));
    let (engine, _index, db) = new_engine(extractor.clone(), targets);

    let stats = engine.refresh().unwrap();
    assert_eq!(stats, RefreshStats { removed: 0, indexed: 1 });
    assert!(db.find("com.example.Good").unwrap().is_some());
    assert_eq!(
        db.known_files().unwrap().len(),
        1,
        "the failed file's check is not recorded"
    );

    // Nothing changed on disk, but the failed file is still out of date and
    // gets re-extracted; this time it parses.
    extractor.repair("Bad.class");
    extractor.set("Bad.class", vec![RawSymbol::class("com.example.Bad", ACC_PUBLIC)]);
    let stats = engine.refresh().unwrap();
    assert_eq!(stats, RefreshStats { removed: 0, indexed: 1 });
    assert!(db.find("com.example.Bad").unwrap().is_some());
}

#[test]
fn unreadable_archive_is_retried_once_it_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("dep.jar");
    std::fs::write(&jar, b"definitely not a zip").unwrap();

    let extractor = FakeExtractor::new();
    extractor.set("B.class", vec![RawSymbol::class("org.dep.B", ACC_PUBLIC)]);
    let targets = Arc::new(FixedTargets::new(vec![Target::Archive(jar.clone())]));
    let (engine, _index, db) = new_engine(extractor, targets);

    let stats = engine.refresh().unwrap();
    assert_eq!(stats, RefreshStats { removed: 0, indexed: 0 });
    assert!(db.known_files().unwrap().is_empty());

    write_jar(&jar, &["org/dep/B.class"]);
    let stats = engine.refresh().unwrap();
    assert_eq!(stats, RefreshStats { removed: 0, indexed: 1 });
    assert!(db.find("org.dep.B").unwrap().is_some());
}

#[test]
fn zero_public_declarations_still_record_the_check() {
    let dir = tempfile::tempdir().unwrap();
    write_class(dir.path(), "Internal.class", 4);

    let extractor = FakeExtractor::new();
    extractor.set(
        "Internal.class",
        vec![RawSymbol::class("com.example.Internal", 0)],
    );
    let targets = Arc::new(FixedTargets::new(vec![Target::ClassDir(
        dir.path().to_path_buf(),
    )]));
    let (engine, _index, db) = new_engine(extractor.clone(), targets);

    let stats = engine.refresh().unwrap();
    assert_eq!(stats, RefreshStats { removed: 0, indexed: 1 });
    assert_eq!(db.symbol_count(), 0);
    assert_eq!(db.known_files().unwrap().len(), 1);

    // Unlike a failed extraction, an empty result is a settled answer.
    let calls = extractor.calls();
    engine.refresh().unwrap();
    assert_eq!(extractor.calls(), calls);
}

#[test]
fn unreadable_metadata_store_aborts_the_cycle() {
    let dir = tempfile::tempdir().unwrap();
    write_class(dir.path(), "A.class", 4);

    let extractor = FakeExtractor::new();
    let targets = Arc::new(FixedTargets::new(vec![Target::ClassDir(
        dir.path().to_path_buf(),
    )]));
    let (engine, _index, db) = new_engine(extractor, targets);
    db.shutdown().unwrap();

    let err = engine.refresh().unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));
}

#[test]
fn commit_failure_propagates_after_writes_land() {
    let dir = tempfile::tempdir().unwrap();
    write_class(dir.path(), "A.class", 4);

    let extractor = FakeExtractor::new();
    extractor.set("A.class", vec![RawSymbol::class("com.example.A", ACC_PUBLIC)]);
    let index = FailingCommitIndex::new();
    index.fail_commits(true);
    let db = Arc::new(MemorySymbolDb::new());
    let engine = IndexEngine::new(
        index.clone(),
        db.clone(),
        extractor,
        Arc::new(NullSourceResolver),
        Arc::new(FixedTargets::new(vec![Target::ClassDir(
            dir.path().to_path_buf(),
        )])),
        EngineConfig {
            worker_threads: 2,
            ..EngineConfig::default()
        },
    )
    .unwrap();

    let err = engine.refresh().unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));
    // The per-file writes landed before the commit was attempted.
    assert!(db.find("com.example.A").unwrap().is_some());

    index.fail_commits(false);
    engine.refresh().unwrap();
}
