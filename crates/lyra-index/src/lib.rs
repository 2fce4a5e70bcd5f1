//! Incremental indexing engine for compiled JVM artifacts.
//!
//! The engine discovers class files and archives from a [`ProjectModel`],
//! extracts publicly visible declarations through a pluggable
//! [`SymbolExtractor`], and keeps two stores eventually consistent with the
//! on-disk world: a full-text search index and a relational metadata store
//! (see `lyra-store`). Consistency is maintained two ways:
//!
//! - [`IndexEngine::refresh`] runs a full reconciliation cycle with staleness
//!   detection, grouped deletes, concurrent extraction and a single commit;
//! - the `classfile_*` notifications feed a single-writer backlog queue that
//!   batches incremental updates between refreshes.
//!
//! Queries go through the engine facade, which searches the index and
//! hydrates full rows from the metadata store.

mod convert;
mod engine;
mod extract;
mod filter;
mod pool;
mod project;
mod queue;
mod refresh;
mod resolve;
mod scan;
mod write;

pub use engine::{EngineConfig, IndexEngine};
pub use extract::{ExtractError, RawSymbol, SymbolExtractor, ACC_PUBLIC};
pub use filter::SymbolFilter;
pub use project::{FixedTargets, ProjectModel, Target};
pub use refresh::RefreshStats;
pub use resolve::{NullSourceResolver, SourceResolver, SourceRootResolver};
