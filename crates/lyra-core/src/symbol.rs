use serde::{Deserialize, Serialize};

use crate::ArtifactUri;

/// Classification of an indexed declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Class,
    Method,
    Field,
}

/// One publicly visible declaration extracted from a compiled artifact.
///
/// The `fqn` is the record's unique key across both stores. Method names are
/// descriptor-qualified (`com.example.A.of(I)V`) so overloads stay distinct;
/// class and field names are plain dotted names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FqnSymbol {
    /// The file or archive the declaration came from.
    pub container: ArtifactUri,
    /// Entry within the container. Equals `container` for plain class files,
    /// and the archive-internal path (`com/example/A.class`) otherwise.
    pub entry: String,
    pub fqn: String,
    /// JVM-style descriptor, present only for methods.
    pub method_descriptor: Option<String>,
    /// JVM-style descriptor, present only for fields.
    pub field_descriptor: Option<String>,
    /// Best-effort resolved source file.
    pub source: Option<ArtifactUri>,
    /// Best-effort line hint from debug info.
    pub line: Option<u32>,
}

impl FqnSymbol {
    /// Kind derived from which descriptor is present.
    #[must_use]
    pub fn kind(&self) -> SymbolKind {
        if self.method_descriptor.is_some() {
            SymbolKind::Method
        } else if self.field_descriptor.is_some() {
            SymbolKind::Field
        } else {
            SymbolKind::Class
        }
    }

    /// Trailing identifier segment after the last `.`.
    ///
    /// For descriptor-qualified method FQNs this keeps the descriptor
    /// (`of(I)V`); descriptors never contain dots, so the split is safe.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.fqn.rsplit('.').next().unwrap_or(&self.fqn)
    }
}
