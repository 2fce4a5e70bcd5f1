//! Shared write primitives used by both the refresh pass and the backlog
//! queue, so the two paths cannot drift apart.

use std::sync::Arc;

use lyra_core::{ArtifactUri, FqnSymbol, TrackedFile};
use lyra_store::{SearchIndex, StoreError, SymbolDb};

#[derive(Clone)]
pub(crate) struct SymbolWriter {
    index: Arc<dyn SearchIndex>,
    db: Arc<dyn SymbolDb>,
}

impl SymbolWriter {
    pub(crate) fn new(index: Arc<dyn SearchIndex>, db: Arc<dyn SymbolDb>) -> SymbolWriter {
        SymbolWriter { index, db }
    }

    /// Write `check` and its symbols into both stores.
    ///
    /// Duplicate-key conflicts are logged and swallowed: they only happen
    /// when concurrent writers overlap on a file, and the next refresh
    /// converges on the correct rows. An empty symbol list still records the
    /// freshness check.
    pub(crate) fn persist(
        &self,
        check: &TrackedFile,
        symbols: &[FqnSymbol],
    ) -> Result<(), StoreError> {
        if let Err(err) = self.index.persist(check, symbols) {
            if !err.is_duplicate() {
                return Err(err);
            }
            tracing::warn!(
                target = "lyra.index",
                uri = %check.uri,
                error = %err,
                "search index rejected a duplicate symbol; the next refresh reconciles it"
            );
        }
        if let Err(err) = self.db.persist(check, symbols) {
            if !err.is_duplicate() {
                return Err(err);
            }
            tracing::warn!(
                target = "lyra.index",
                uri = %check.uri,
                error = %err,
                "symbol db rejected a duplicate symbol; the next refresh reconciles it"
            );
        }
        Ok(())
    }

    /// Remove `files` and all their symbols from both stores. Removing an
    /// absent file is a no-op; returns how many files were actually present.
    pub(crate) fn delete(&self, files: &[ArtifactUri]) -> Result<usize, StoreError> {
        self.index.remove(files)?;
        self.db.remove_files(files)
    }

    /// Durability point for the search index.
    pub(crate) fn commit(&self) -> Result<(), StoreError> {
        self.index.commit()
    }
}
