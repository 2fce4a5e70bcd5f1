//! Contract between the engine and whatever parses compiled class data.

use lyra_core::ArtifactUri;
use thiserror::Error;

/// JVM `public` access bit.
pub const ACC_PUBLIC: u16 = 0x0001;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed class data: {0}")]
    Malformed(String),
}

/// Parses one compiled entry and returns every declaration found in it.
///
/// Implementations own the binary decoding; the engine owns filtering,
/// conversion and persistence. `entry` equals the container's own path for a
/// plain class file, and the archive-internal path (`com/example/A.class`)
/// when the container is an archive.
pub trait SymbolExtractor: Send + Sync {
    fn extract(&self, container: &ArtifactUri, entry: &str)
        -> Result<Vec<RawSymbol>, ExtractError>;
}

/// Unfiltered declaration as read from a compiled entry.
///
/// The `fqn` is the plain dotted (or slashed, which the engine normalizes)
/// name without descriptor qualification; the engine derives the stored key
/// from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawSymbol {
    pub fqn: String,
    /// JVM access flags of the declaration itself.
    pub access_flags: u16,
    /// Present only for methods.
    pub method_descriptor: Option<String>,
    /// Present only for fields.
    pub field_descriptor: Option<String>,
    /// `SourceFile`-attribute hint, e.g. `Widget.java`.
    pub source_name: Option<String>,
    /// Line hint from debug info.
    pub line: Option<u32>,
}

impl RawSymbol {
    pub fn class(fqn: impl Into<String>, access_flags: u16) -> RawSymbol {
        RawSymbol {
            fqn: fqn.into(),
            access_flags,
            method_descriptor: None,
            field_descriptor: None,
            source_name: None,
            line: None,
        }
    }

    pub fn method(
        fqn: impl Into<String>,
        descriptor: impl Into<String>,
        access_flags: u16,
    ) -> RawSymbol {
        RawSymbol {
            method_descriptor: Some(descriptor.into()),
            ..RawSymbol::class(fqn, access_flags)
        }
    }

    pub fn field(
        fqn: impl Into<String>,
        descriptor: impl Into<String>,
        access_flags: u16,
    ) -> RawSymbol {
        RawSymbol {
            field_descriptor: Some(descriptor.into()),
            ..RawSymbol::class(fqn, access_flags)
        }
    }
}
