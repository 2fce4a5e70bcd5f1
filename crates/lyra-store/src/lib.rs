//! Backing-store contracts for the symbol indexes.
//!
//! Two stores cooperate behind these traits: a full-text [`SearchIndex`] that
//! answers free-text queries with FQN hits, and a relational [`SymbolDb`] that
//! holds the authoritative symbol rows plus per-file freshness evidence. The
//! engine in `lyra-index` keeps the two eventually consistent; the stores
//! themselves stay passive and never stat the filesystem.
//!
//! [`MemorySearchIndex`] and [`MemorySymbolDb`] are the reference
//! implementations. They back the test suite and small single-process
//! embedders; production deployments put a real search engine and a real
//! database behind the same traits.

mod memory;

pub use memory::{MemorySearchIndex, MemorySymbolDb};

use lyra_core::{ArtifactUri, FqnSymbol, TrackedFile};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique-key conflict on a symbol's FQN. Raised when concurrent writers
    /// overlap on the same file; the engine downgrades it to a warning because
    /// the next refresh converges on the correct rows anyway.
    #[error("duplicate symbol: {fqn}")]
    Duplicate { fqn: String },
    /// The store cannot serve requests, typically because it was shut down.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate { .. })
    }
}

/// Full-text symbol index.
///
/// Documents are owned by their container URI; writers always delete a
/// container's documents before re-adding them, so `persist` itself never
/// replaces anything. Reads may observe half-applied batches; only `commit`
/// is a durability point.
pub trait SearchIndex: Send + Sync {
    /// Add one document per symbol for `check`'s container.
    fn persist(&self, check: &TrackedFile, symbols: &[FqnSymbol]) -> Result<()>;

    /// Drop every document owned by the given containers. Containers without
    /// documents are skipped without error.
    fn remove(&self, files: &[ArtifactUri]) -> Result<()>;

    /// Free-text search over class documents. Returns up to `max` FQNs in
    /// relevance order.
    fn search_classes(&self, query: &str, max: usize) -> Result<Vec<String>>;

    /// Search over class and method documents; every term must match.
    fn search_classes_methods(&self, terms: &[String], max: usize) -> Result<Vec<String>>;

    /// Make everything written so far durable. Called once per refresh cycle,
    /// not per file.
    fn commit(&self) -> Result<()>;
}

/// Relational metadata store: authoritative symbol rows keyed by FQN plus one
/// freshness row per indexed file.
pub trait SymbolDb: Send + Sync {
    /// Every file the store currently has a freshness row for.
    fn known_files(&self) -> Result<Vec<TrackedFile>>;

    /// Remove the given files' freshness rows and all their symbols. Returns
    /// how many of the files were actually present.
    fn remove_files(&self, files: &[ArtifactUri]) -> Result<usize>;

    /// True when the store holds nothing current for `check`: either the file
    /// is unknown or its stored token differs from `check.token`.
    fn out_of_date(&self, check: &TrackedFile) -> Result<bool>;

    /// Upsert `check`'s freshness row and insert its symbols. Inserting an
    /// FQN that already exists fails with [`StoreError::Duplicate`].
    fn persist(&self, check: &TrackedFile, symbols: &[FqnSymbol]) -> Result<()>;

    /// Point lookup by exact FQN.
    fn find(&self, fqn: &str) -> Result<Option<FqnSymbol>>;

    /// Bulk lookup; missing FQNs are silently absent from the result.
    fn find_all(&self, fqns: &[String]) -> Result<Vec<FqnSymbol>>;

    /// Close the store. Later calls fail with [`StoreError::Unavailable`];
    /// closing an already closed store is a no-op.
    fn shutdown(&self) -> Result<()>;
}
