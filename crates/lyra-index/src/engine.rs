//! The engine facade: wires stores, extractor, filter and workers together
//! and owns the two maintenance paths (refresh and the backlog queue).

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Arc;

use lyra_core::{ArtifactKind, ArtifactUri, FqnSymbol, TrackedFile};
use lyra_store::{SearchIndex, StoreError, SymbolDb};
use parking_lot::{Condvar, Mutex};

use crate::convert;
use crate::extract::{ExtractError, SymbolExtractor};
use crate::filter::SymbolFilter;
use crate::pool::WorkerPool;
use crate::project::ProjectModel;
use crate::queue::{PendingUpdate, UpdateBacklog};
use crate::refresh::{self, RefreshStats};
use crate::resolve::SourceResolver;
use crate::scan;
use crate::write::SymbolWriter;

/// Tunables for one engine instance.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Worker threads shared by extraction and store writes.
    pub worker_threads: usize,
    /// Stale files removed per store transaction during refresh.
    pub remove_group_size: usize,
    /// Maximum queued updates drained into one backlog batch.
    pub queue_batch_limit: usize,
    /// Admission policy for extracted declarations.
    pub filter: SymbolFilter,
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        EngineConfig {
            // Leave a core for the caller; extraction is CPU-bound enough
            // that more than 8 workers mostly adds store contention.
            worker_threads: available.saturating_sub(1).clamp(1, 8),
            remove_group_size: 1000,
            queue_batch_limit: 500,
            filter: SymbolFilter::default(),
        }
    }
}

/// Everything the worker jobs need, shared behind one `Arc`.
pub(crate) struct EngineShared {
    pub(crate) writer: SymbolWriter,
    pub(crate) index: Arc<dyn SearchIndex>,
    pub(crate) db: Arc<dyn SymbolDb>,
    extractor: Arc<dyn SymbolExtractor>,
    resolver: Arc<dyn SourceResolver>,
    filter: SymbolFilter,
}

impl EngineShared {
    /// Extract and persist one file. Returns whether the file made it into
    /// the stores. An unreadable artifact writes nothing, so its check stays
    /// unrecorded and the next refresh retries it; an artifact with zero
    /// public declarations persists an empty list, which records the check.
    pub(crate) fn index_one(&self, file: &TrackedFile) -> bool {
        let Some(symbols) = self.extract_file(file) else {
            return false;
        };
        match self.writer.persist(file, &symbols) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    target = "lyra.index",
                    uri = %file.uri,
                    error = %err,
                    "persist failed; file stays out of date"
                );
                false
            }
        }
    }

    /// All store-ready symbols of one artifact, or `None` when the artifact
    /// itself could not be read. Inside an archive, trouble with a single
    /// entry only skips that entry.
    pub(crate) fn extract_file(&self, file: &TrackedFile) -> Option<Vec<FqnSymbol>> {
        match file.kind {
            ArtifactKind::ClassFile => match self.extract_entry(&file.uri, file.uri.as_str()) {
                Ok(symbols) => Some(symbols),
                Err(err) => {
                    tracing::warn!(
                        target = "lyra.index",
                        uri = %file.uri,
                        error = %err,
                        "extraction failed; file left out of date"
                    );
                    None
                }
            },
            ArtifactKind::Archive => {
                let entries = match scan::archive_class_entries(&file.uri.to_path()) {
                    Ok(entries) => entries,
                    Err(err) => {
                        tracing::warn!(
                            target = "lyra.index",
                            uri = %file.uri,
                            error = %err,
                            "failed to enumerate archive entries; archive left out of date"
                        );
                        return None;
                    }
                };
                let symbols = entries
                    .iter()
                    .flat_map(|entry| match self.extract_entry(&file.uri, entry) {
                        Ok(symbols) => symbols,
                        Err(err) => {
                            tracing::warn!(
                                target = "lyra.index",
                                uri = %file.uri,
                                entry = %entry,
                                error = %err,
                                "extraction failed; entry skipped"
                            );
                            Vec::new()
                        }
                    })
                    .collect();
                Some(symbols)
            }
        }
    }

    fn extract_entry(
        &self,
        container: &ArtifactUri,
        entry: &str,
    ) -> Result<Vec<FqnSymbol>, ExtractError> {
        let raws = self.extractor.extract(container, entry)?;
        Ok(convert::to_symbols(
            &self.filter,
            self.resolver.as_ref(),
            container,
            entry,
            raws,
        ))
    }
}

/// Counts change-notification jobs between acceptance and enqueue so
/// `quiesce` has something deterministic to wait on.
#[derive(Default)]
struct NotifyInflight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl NotifyInflight {
    fn wait_idle(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.idle.wait(&mut count);
        }
    }

    fn finish(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }
}

/// Decrements on drop so a panicking job cannot wedge `quiesce`.
struct InflightGuard {
    inflight: Arc<NotifyInflight>,
}

impl InflightGuard {
    fn enter(inflight: &Arc<NotifyInflight>) -> InflightGuard {
        *inflight.count.lock() += 1;
        InflightGuard {
            inflight: Arc::clone(inflight),
        }
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.inflight.finish();
    }
}

/// Incremental indexing engine over a pair of symbol stores.
///
/// The engine keeps a full-text search index and a relational metadata store
/// eventually consistent with the compiled output of a project. [`refresh`]
/// reconciles everything; the `classfile_*` notifications feed an internal
/// single-writer queue for cheap incremental convergence in between.
///
/// [`refresh`]: IndexEngine::refresh
pub struct IndexEngine {
    shared: Arc<EngineShared>,
    project: Arc<dyn ProjectModel>,
    pool: WorkerPool,
    backlog: UpdateBacklog,
    inflight: Arc<NotifyInflight>,
    remove_group_size: usize,
}

impl IndexEngine {
    /// Wire an engine over the given collaborators. Fails only when the
    /// backlog writer thread cannot be spawned.
    pub fn new(
        index: Arc<dyn SearchIndex>,
        db: Arc<dyn SymbolDb>,
        extractor: Arc<dyn SymbolExtractor>,
        resolver: Arc<dyn SourceResolver>,
        project: Arc<dyn ProjectModel>,
        config: EngineConfig,
    ) -> io::Result<IndexEngine> {
        let writer = SymbolWriter::new(Arc::clone(&index), Arc::clone(&db));
        let backlog = UpdateBacklog::spawn(writer.clone(), config.queue_batch_limit)?;
        let shared = Arc::new(EngineShared {
            writer,
            index,
            db,
            extractor,
            resolver,
            filter: config.filter,
        });
        Ok(IndexEngine {
            shared,
            project,
            pool: WorkerPool::build(config.worker_threads),
            backlog,
            inflight: Arc::new(NotifyInflight::default()),
            remove_group_size: config.remove_group_size,
        })
    }

    /// Reconcile both stores with the current on-disk universe. Blocks until
    /// the cycle (including its single index commit) is done.
    pub fn refresh(&self) -> Result<RefreshStats, StoreError> {
        refresh::run_refresh(
            &self.shared,
            self.project.as_ref(),
            &self.pool,
            self.remove_group_size,
        )
    }

    /// Synchronous write primitive, shared with the internal queue. Most
    /// callers want the `classfile_*` notifications instead.
    pub fn persist(&self, check: &TrackedFile, symbols: &[FqnSymbol]) -> Result<(), StoreError> {
        self.shared.writer.persist(check, symbols)
    }

    /// Synchronous delete primitive; removing absent files is a no-op.
    pub fn delete(&self, files: &[ArtifactUri]) -> Result<usize, StoreError> {
        self.shared.writer.delete(files)
    }

    /// A compiled artifact appeared. Extraction runs on a worker; the write
    /// goes through the queue.
    pub fn classfile_added(&self, path: &Path) {
        self.schedule_extract(path);
    }

    /// A compiled artifact changed on disk.
    pub fn classfile_changed(&self, path: &Path) {
        self.schedule_extract(path);
    }

    /// A compiled artifact disappeared.
    pub fn classfile_removed(&self, path: &Path) {
        self.backlog.enqueue(PendingUpdate::Remove {
            uri: ArtifactUri::from_path(path),
        });
    }

    fn schedule_extract(&self, path: &Path) {
        // Count the job before handing it off so a quiesce started right
        // after this call waits for it.
        let guard = InflightGuard::enter(&self.inflight);
        let shared = Arc::clone(&self.shared);
        let backlog = self.backlog.clone();
        let path = path.to_path_buf();
        self.pool.spawn(move || {
            let _guard = guard;
            backlog.enqueue(build_update(&shared, &path));
        });
    }

    /// Free-text class search, hydrated from the metadata store. Hits the
    /// metadata store no longer knows are dropped silently; index order is
    /// preserved.
    pub fn search_classes(&self, query: &str, max: usize) -> Result<Vec<FqnSymbol>, StoreError> {
        let hits = self.shared.index.search_classes(query, max)?;
        hydrate(self.shared.db.as_ref(), hits, max)
    }

    /// Class-and-method search; every term must match.
    pub fn search_classes_methods(
        &self,
        terms: &[String],
        max: usize,
    ) -> Result<Vec<FqnSymbol>, StoreError> {
        let hits = self.shared.index.search_classes_methods(terms, max)?;
        hydrate(self.shared.db.as_ref(), hits, max)
    }

    /// Point lookup by exact FQN, straight from the metadata store.
    pub fn find_unique(&self, fqn: &str) -> Result<Option<FqnSymbol>, StoreError> {
        self.shared.db.find(fqn)
    }

    /// Block until every change notification accepted before this call has
    /// been fully applied to the stores. Notifications delivered concurrently
    /// with the wait may or may not be included.
    pub fn quiesce(&self) {
        self.inflight.wait_idle();
        self.backlog.flush();
    }

    /// Stop the backlog writer at its next batch boundary and close the
    /// metadata store. Queued and in-flight work is abandoned, not drained;
    /// call [`quiesce`](IndexEngine::quiesce) first when it must land.
    pub fn shutdown(&self) {
        self.backlog.stop();
        if let Err(err) = self.shared.db.shutdown() {
            tracing::warn!(
                target = "lyra.index",
                error = %err,
                "symbol db shutdown reported an error"
            );
        }
    }
}

impl Drop for IndexEngine {
    fn drop(&mut self) {
        self.backlog.stop();
    }
}

/// Stat the artifact and produce its replacement rows; a vanished artifact
/// degrades to a removal. An unreadable artifact becomes a delete-only
/// update: its old rows go away, its check stays unrecorded, and the next
/// refresh retries it.
fn build_update(shared: &EngineShared, path: &Path) -> PendingUpdate {
    match TrackedFile::of_path(path, artifact_kind_of(path)) {
        Ok(file) => {
            let symbols = shared.extract_file(&file).unwrap_or_default();
            PendingUpdate::Index { file, symbols }
        }
        Err(err) => {
            tracing::debug!(
                target = "lyra.queue",
                path = %path.display(),
                error = %err,
                "changed file vanished before extraction; treating as removal"
            );
            PendingUpdate::Remove {
                uri: ArtifactUri::from_path(path),
            }
        }
    }
}

fn artifact_kind_of(path: &Path) -> ArtifactKind {
    if path.extension().and_then(|ext| ext.to_str()) == Some("class") {
        ArtifactKind::ClassFile
    } else {
        ArtifactKind::Archive
    }
}

/// Replace index hits with full rows, keeping hit order and dropping FQNs
/// the metadata store no longer has.
fn hydrate(
    db: &dyn SymbolDb,
    hits: Vec<String>,
    max: usize,
) -> Result<Vec<FqnSymbol>, StoreError> {
    let mut by_fqn: HashMap<String, FqnSymbol> = db
        .find_all(&hits)?
        .into_iter()
        .map(|symbol| (symbol.fqn.clone(), symbol))
        .collect();
    Ok(hits
        .iter()
        .filter_map(|fqn| by_fqn.remove(fqn))
        .take(max)
        .collect())
}
