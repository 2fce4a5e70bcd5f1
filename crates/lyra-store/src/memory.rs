//! In-memory reference implementations of the store traits.

use std::collections::BTreeMap;

use lyra_core::{ArtifactUri, FqnSymbol, SymbolKind, TrackedFile};
use parking_lot::Mutex;

use crate::{Result, SearchIndex, StoreError, SymbolDb};

#[derive(Debug)]
struct IndexDoc {
    fqn: String,
    /// Lowercased FQN; all matching is case-insensitive substring search.
    text: String,
    kind: SymbolKind,
    container: ArtifactUri,
}

#[derive(Debug, Default)]
struct SearchState {
    docs: Vec<IndexDoc>,
    commits: u64,
}

/// Substring-matching search index held entirely in memory.
///
/// Writes become searchable immediately; `commit` only advances a counter so
/// tests can observe the once-per-cycle commit discipline. Hit order is
/// deterministic: shortest FQN first, ties lexicographic.
#[derive(Debug, Default)]
pub struct MemorySearchIndex {
    state: Mutex<SearchState>,
}

impl MemorySearchIndex {
    pub fn new() -> MemorySearchIndex {
        MemorySearchIndex::default()
    }

    /// Commits issued so far.
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.state.lock().commits
    }

    /// Documents currently held, counting duplicates.
    #[must_use]
    pub fn doc_count(&self) -> usize {
        self.state.lock().docs.len()
    }

    fn search(&self, terms: &[String], kinds: &[SymbolKind], max: usize) -> Vec<String> {
        let terms: Vec<String> = terms
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if terms.is_empty() {
            return Vec::new();
        }

        let state = self.state.lock();
        let mut hits: Vec<&str> = state
            .docs
            .iter()
            .filter(|doc| kinds.contains(&doc.kind))
            .filter(|doc| terms.iter().all(|term| doc.text.contains(term)))
            .map(|doc| doc.fqn.as_str())
            .collect();
        hits.sort_by_key(|fqn| (fqn.len(), *fqn));
        hits.dedup();
        hits.truncate(max);
        hits.into_iter().map(str::to_owned).collect()
    }
}

impl SearchIndex for MemorySearchIndex {
    fn persist(&self, check: &TrackedFile, symbols: &[FqnSymbol]) -> Result<()> {
        let mut state = self.state.lock();
        for symbol in symbols {
            state.docs.push(IndexDoc {
                fqn: symbol.fqn.clone(),
                text: symbol.fqn.to_lowercase(),
                kind: symbol.kind(),
                container: check.uri.clone(),
            });
        }
        Ok(())
    }

    fn remove(&self, files: &[ArtifactUri]) -> Result<()> {
        let mut state = self.state.lock();
        state.docs.retain(|doc| !files.contains(&doc.container));
        Ok(())
    }

    fn search_classes(&self, query: &str, max: usize) -> Result<Vec<String>> {
        Ok(self.search(&[query.to_string()], &[SymbolKind::Class], max))
    }

    fn search_classes_methods(&self, terms: &[String], max: usize) -> Result<Vec<String>> {
        Ok(self.search(terms, &[SymbolKind::Class, SymbolKind::Method], max))
    }

    fn commit(&self) -> Result<()> {
        self.state.lock().commits += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct DbState {
    checks: BTreeMap<ArtifactUri, TrackedFile>,
    symbols: BTreeMap<String, FqnSymbol>,
    closed: bool,
}

/// In-memory metadata store with a unique constraint on the symbol FQN.
///
/// Batch inserts abort at the first conflicting FQN; symbols later in the
/// batch stay absent until a later cycle re-indexes the file. This matches
/// how a relational backend's batched insert behaves under the same conflict.
#[derive(Debug, Default)]
pub struct MemorySymbolDb {
    state: Mutex<DbState>,
}

impl MemorySymbolDb {
    pub fn new() -> MemorySymbolDb {
        MemorySymbolDb::default()
    }

    /// Symbol rows currently held.
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.state.lock().symbols.len()
    }
}

fn guard(state: &DbState) -> Result<()> {
    if state.closed {
        return Err(StoreError::Unavailable("symbol db is closed".to_string()));
    }
    Ok(())
}

impl SymbolDb for MemorySymbolDb {
    fn known_files(&self) -> Result<Vec<TrackedFile>> {
        let state = self.state.lock();
        guard(&state)?;
        Ok(state.checks.values().cloned().collect())
    }

    fn remove_files(&self, files: &[ArtifactUri]) -> Result<usize> {
        let mut state = self.state.lock();
        guard(&state)?;
        let mut removed = 0;
        for uri in files {
            if state.checks.remove(uri).is_some() {
                removed += 1;
            }
        }
        state.symbols.retain(|_, symbol| !files.contains(&symbol.container));
        Ok(removed)
    }

    fn out_of_date(&self, check: &TrackedFile) -> Result<bool> {
        let state = self.state.lock();
        guard(&state)?;
        Ok(match state.checks.get(&check.uri) {
            Some(stored) => stored.token != check.token,
            None => true,
        })
    }

    fn persist(&self, check: &TrackedFile, symbols: &[FqnSymbol]) -> Result<()> {
        let mut state = self.state.lock();
        guard(&state)?;
        state.checks.insert(check.uri.clone(), check.clone());
        for symbol in symbols {
            if state.symbols.contains_key(&symbol.fqn) {
                return Err(StoreError::Duplicate {
                    fqn: symbol.fqn.clone(),
                });
            }
            state.symbols.insert(symbol.fqn.clone(), symbol.clone());
        }
        Ok(())
    }

    fn find(&self, fqn: &str) -> Result<Option<FqnSymbol>> {
        let state = self.state.lock();
        guard(&state)?;
        Ok(state.symbols.get(fqn).cloned())
    }

    fn find_all(&self, fqns: &[String]) -> Result<Vec<FqnSymbol>> {
        let state = self.state.lock();
        guard(&state)?;
        Ok(fqns
            .iter()
            .filter_map(|fqn| state.symbols.get(fqn))
            .cloned()
            .collect())
    }

    fn shutdown(&self) -> Result<()> {
        self.state.lock().closed = true;
        Ok(())
    }
}
