//! Core data model shared by Lyra's stores and indexing engine.
//!
//! This crate is intentionally small: artifact identity, change detection and
//! the symbol record both stores agree on. Everything that does I/O beyond a
//! single `stat` lives in `lyra-index`.

mod artifact;
mod symbol;

pub use artifact::{ArtifactKind, ArtifactUri, ChangeToken, TrackedFile};
pub use symbol::{FqnSymbol, SymbolKind};
