//! Update backlog: a single-writer queue that absorbs change-notification
//! storms between full refreshes.
//!
//! Producers enqueue from any thread and never block on store I/O. One drain
//! thread owns all writes: it pulls everything currently queued (up to a
//! batch limit), collapses redundant updates per file, deletes the touched
//! files' old rows, then inserts the replacements. The queue never commits
//! the search index; only the refresh pass does.

use std::io;
use std::thread;

use crossbeam_channel as channel;
use lyra_core::{ArtifactUri, FqnSymbol, TrackedFile};

use crate::write::SymbolWriter;

/// Queued unit of incremental work. Identity is the artifact URI; within one
/// batch only the last update for a URI survives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PendingUpdate {
    /// Replace whatever both stores hold for the file. An empty symbol list
    /// still clears the old rows (delete-only).
    Index {
        file: TrackedFile,
        symbols: Vec<FqnSymbol>,
    },
    /// Drop the file and all its symbols.
    Remove { uri: ArtifactUri },
}

impl PendingUpdate {
    pub(crate) fn uri(&self) -> &ArtifactUri {
        match self {
            PendingUpdate::Index { file, .. } => &file.uri,
            PendingUpdate::Remove { uri } => uri,
        }
    }
}

enum QueueMessage {
    Update(PendingUpdate),
    /// Acked once every update enqueued before the marker has been written.
    Flush(channel::Sender<()>),
}

/// Producer handle to the backlog. Cheap to clone; all clones feed the same
/// drain thread.
#[derive(Clone)]
pub(crate) struct UpdateBacklog {
    tx: channel::Sender<QueueMessage>,
    stop_tx: channel::Sender<()>,
}

impl UpdateBacklog {
    pub(crate) fn spawn(writer: SymbolWriter, batch_limit: usize) -> io::Result<UpdateBacklog> {
        let (tx, rx) = channel::unbounded();
        let (stop_tx, stop_rx) = channel::bounded(1);
        let drain = BatchDrain {
            rx,
            stop_rx,
            writer,
            batch_limit: batch_limit.max(1),
        };
        thread::Builder::new()
            .name("lyra-backlog".to_string())
            .spawn(move || drain.run())?;
        Ok(UpdateBacklog { tx, stop_tx })
    }

    /// Hand an update to the drain thread. Never blocks; after `stop` the
    /// update is dropped with a log line.
    pub(crate) fn enqueue(&self, update: PendingUpdate) {
        if self.tx.send(QueueMessage::Update(update)).is_err() {
            tracing::debug!(
                target = "lyra.queue",
                "dropping update enqueued after the backlog stopped"
            );
        }
    }

    /// Block until every update enqueued before this call has been written.
    /// Returns immediately if the backlog has stopped.
    pub(crate) fn flush(&self) {
        let (ack_tx, ack_rx) = channel::bounded(1);
        if self.tx.send(QueueMessage::Flush(ack_tx)).is_err() {
            return;
        }
        let _ = ack_rx.recv();
    }

    /// Ask the drain thread to exit at its next batch boundary. Queued work
    /// is abandoned, not drained; idempotent.
    pub(crate) fn stop(&self) {
        let _ = self.stop_tx.try_send(());
    }
}

struct BatchDrain {
    rx: channel::Receiver<QueueMessage>,
    stop_rx: channel::Receiver<()>,
    writer: SymbolWriter,
    batch_limit: usize,
}

impl BatchDrain {
    fn run(self) {
        loop {
            let first = channel::select! {
                recv(self.stop_rx) -> _ => break,
                recv(self.rx) -> msg => match msg {
                    Ok(msg) => msg,
                    Err(_) => break,
                },
            };

            let mut batch = Vec::new();
            let mut acks = Vec::new();
            self.collect(first, &mut batch, &mut acks);
            if !batch.is_empty() {
                self.flush_batch(batch);
            }
            for ack in acks {
                let _ = ack.send(());
            }
        }
        tracing::debug!(target = "lyra.queue", "backlog drain stopped");
    }

    /// Pull everything already queued, up to the batch limit. Flush markers
    /// ride along without counting against the limit.
    fn collect(
        &self,
        first: QueueMessage,
        batch: &mut Vec<PendingUpdate>,
        acks: &mut Vec<channel::Sender<()>>,
    ) {
        let mut next = Some(first);
        while let Some(message) = next {
            match message {
                QueueMessage::Update(update) => {
                    batch.push(update);
                    if batch.len() >= self.batch_limit {
                        return;
                    }
                }
                QueueMessage::Flush(ack) => acks.push(ack),
            }
            next = self.rx.try_recv().ok();
        }
    }

    fn flush_batch(&self, batch: Vec<PendingUpdate>) {
        let updates = dedup_last_wins(batch);
        let touched: Vec<ArtifactUri> = updates.iter().map(|u| u.uri().clone()).collect();

        // Old rows go first so re-inserts below cannot collide with them.
        if let Err(err) = self.writer.delete(&touched) {
            tracing::warn!(
                target = "lyra.queue",
                files = touched.len(),
                error = %err,
                "batched delete failed; skipping inserts, the next refresh reconciles"
            );
            return;
        }

        for update in updates {
            if let PendingUpdate::Index { file, symbols } = update {
                if symbols.is_empty() {
                    continue;
                }
                if let Err(err) = self.writer.persist(&file, &symbols) {
                    tracing::warn!(
                        target = "lyra.queue",
                        uri = %file.uri,
                        error = %err,
                        "persist failed; the file stays stale until the next refresh"
                    );
                }
            }
        }
    }
}

/// Keep only the most recently enqueued update per URI, preserving the
/// relative order of the survivors.
pub(crate) fn dedup_last_wins(batch: Vec<PendingUpdate>) -> Vec<PendingUpdate> {
    use std::collections::HashMap;

    let mut slots: Vec<Option<PendingUpdate>> = Vec::with_capacity(batch.len());
    let mut latest: HashMap<ArtifactUri, usize> = HashMap::new();
    for update in batch {
        if let Some(&previous) = latest.get(update.uri()) {
            slots[previous] = None;
        }
        latest.insert(update.uri().clone(), slots.len());
        slots.push(Some(update));
    }
    slots.into_iter().flatten().collect()
}
