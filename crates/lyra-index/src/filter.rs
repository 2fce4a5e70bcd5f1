//! Symbol admission policy.

use std::borrow::Cow;

use crate::extract::{RawSymbol, ACC_PUBLIC};

/// Decides which extracted declarations survive into the stores.
///
/// Three rules, applied per declaration: vendor-internal packages are
/// blacklisted, compiler-synthesized names are dropped, and only publicly
/// visible declarations are kept. Entries that share a container are filtered
/// independently.
#[derive(Clone, Debug)]
pub struct SymbolFilter {
    vendor_prefixes: Vec<String>,
    synthetic_markers: Vec<String>,
}

impl Default for SymbolFilter {
    fn default() -> SymbolFilter {
        SymbolFilter {
            vendor_prefixes: ["sun.", "sunw.", "com.sun.", "com.oracle.", "jdk.internal."]
                .map(str::to_owned)
                .to_vec(),
            synthetic_markers: ["$$anon$", "$$anonfun$", "$$Lambda$", "$worker$"]
                .map(str::to_owned)
                .to_vec(),
        }
    }
}

impl SymbolFilter {
    /// Replace the default lists. Prefixes match against the dotted FQN;
    /// markers match anywhere in the name.
    pub fn new(vendor_prefixes: Vec<String>, synthetic_markers: Vec<String>) -> SymbolFilter {
        SymbolFilter {
            vendor_prefixes,
            synthetic_markers,
        }
    }

    /// Whether `raw` survives into the stores.
    #[must_use]
    pub fn keeps(&self, raw: &RawSymbol) -> bool {
        let dotted = normalize_fqn(&raw.fqn);
        if self
            .vendor_prefixes
            .iter()
            .any(|prefix| dotted.starts_with(prefix.as_str()))
        {
            return false;
        }
        if self
            .synthetic_markers
            .iter()
            .any(|marker| dotted.contains(marker.as_str()))
        {
            return false;
        }
        raw.access_flags & ACC_PUBLIC != 0
    }
}

/// Accepts both dotted and internal slashed names.
pub(crate) fn normalize_fqn(fqn: &str) -> Cow<'_, str> {
    if fqn.contains('/') {
        Cow::Owned(fqn.replace('/', "."))
    } else {
        Cow::Borrowed(fqn)
    }
}
