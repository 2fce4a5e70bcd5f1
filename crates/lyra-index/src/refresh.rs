//! Full reconciliation pass: make both stores agree with the on-disk world.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel as channel;
use lyra_core::{ArtifactKind, ArtifactUri, ChangeToken, TrackedFile};
use lyra_store::StoreError;

use crate::engine::EngineShared;
use crate::pool::WorkerPool;
use crate::project::ProjectModel;
use crate::scan;

/// Counts from one refresh cycle. Estimates by design: the universe can
/// change again while the cycle runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshStats {
    /// Stale files removed from both stores.
    pub removed: usize,
    /// Files (re)indexed this cycle.
    pub indexed: usize,
}

/// One full refresh: sweep stale files out, re-index what changed, commit.
///
/// Removal happens strictly before indexing so a changed file's old rows can
/// never collide with its fresh ones. Per-file failures are logged and the
/// cycle keeps going; only a failing metadata-store read or a failing commit
/// aborts the whole cycle.
pub(crate) fn run_refresh(
    shared: &Arc<EngineShared>,
    project: &dyn ProjectModel,
    pool: &WorkerPool,
    remove_group_size: usize,
) -> Result<RefreshStats, StoreError> {
    let started = Instant::now();
    let universe = scan::expand_targets(&project.targets());
    let known = shared.db.known_files()?;

    let stale = find_stale(&known, &universe);
    tracing::debug!(
        target = "lyra.index",
        universe = universe.len(),
        known = known.len(),
        stale = stale.len(),
        "refresh cycle started"
    );
    let removed = remove_stale(shared, pool, stale, remove_group_size);

    let mut to_index = Vec::new();
    for file in universe {
        match shared.db.out_of_date(&file) {
            Ok(true) => to_index.push(file),
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(
                    target = "lyra.index",
                    uri = %file.uri,
                    error = %err,
                    "freshness check failed; file skipped this cycle"
                );
            }
        }
    }
    let indexed = index_files(shared, pool, to_index);

    shared.writer.commit()?;
    let stats = RefreshStats { removed, indexed };
    tracing::debug!(
        target = "lyra.index",
        removed = stats.removed,
        indexed = stats.indexed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "refresh cycle finished"
    );
    Ok(stats)
}

/// A known file is stale when it vanished from disk, its token changed, or
/// (for archives) it is no longer part of the configured universe.
fn find_stale(known: &[TrackedFile], universe: &[TrackedFile]) -> Vec<ArtifactUri> {
    let current_archives: HashSet<&ArtifactUri> = universe
        .iter()
        .filter(|file| file.kind == ArtifactKind::Archive)
        .map(|file| &file.uri)
        .collect();

    known
        .iter()
        .filter(|file| is_stale(file, &current_archives))
        .map(|file| file.uri.clone())
        .collect()
}

fn is_stale(file: &TrackedFile, current_archives: &HashSet<&ArtifactUri>) -> bool {
    // Unreadable counts as gone; if the file comes back the next cycle
    // re-adds it.
    match ChangeToken::of(&file.uri.to_path()) {
        Err(_) => true,
        Ok(token) if token != file.token => true,
        Ok(_) => file.kind == ArtifactKind::Archive && !current_archives.contains(&file.uri),
    }
}

/// Delete stale files in fixed-size groups, one store transaction per group,
/// all groups in flight at once. Returns only after every group finished:
/// the caller must not start inserting while deletes are still pending.
fn remove_stale(
    shared: &Arc<EngineShared>,
    pool: &WorkerPool,
    stale: Vec<ArtifactUri>,
    group_size: usize,
) -> usize {
    if stale.is_empty() {
        return 0;
    }
    let groups: Vec<Vec<ArtifactUri>> = stale
        .chunks(group_size.max(1))
        .map(<[ArtifactUri]>::to_vec)
        .collect();
    let (tx, rx) = channel::bounded(groups.len());
    for group in groups {
        let shared = Arc::clone(shared);
        let tx = tx.clone();
        pool.spawn(move || {
            let removed = match shared.writer.delete(&group) {
                Ok(removed) => removed,
                Err(err) => {
                    tracing::warn!(
                        target = "lyra.index",
                        files = group.len(),
                        error = %err,
                        "failed to remove a group of stale files; retried next cycle"
                    );
                    0
                }
            };
            let _ = tx.send(removed);
        });
    }
    drop(tx);
    rx.iter().sum()
}

/// Extract and persist out-of-date files concurrently; join before returning
/// so the commit afterwards covers every write.
fn index_files(shared: &Arc<EngineShared>, pool: &WorkerPool, files: Vec<TrackedFile>) -> usize {
    if files.is_empty() {
        return 0;
    }
    let (tx, rx) = channel::bounded(files.len());
    for file in files {
        let shared = Arc::clone(shared);
        let tx = tx.clone();
        pool.spawn(move || {
            let _ = tx.send(shared.index_one(&file));
        });
    }
    drop(tx);
    rx.iter().filter(|indexed| *indexed).count()
}
