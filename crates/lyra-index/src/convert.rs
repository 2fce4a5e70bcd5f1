//! Raw-declaration to stored-symbol conversion.

use lyra_core::{ArtifactUri, FqnSymbol};

use crate::extract::RawSymbol;
use crate::filter::{normalize_fqn, SymbolFilter};
use crate::resolve::SourceResolver;

/// Filter `raws` and convert the survivors into store-ready symbols.
///
/// Method FQNs get their descriptor appended so overloads produce distinct
/// keys. Source resolution is best-effort and per declaration.
pub(crate) fn to_symbols(
    filter: &SymbolFilter,
    resolver: &dyn SourceResolver,
    container: &ArtifactUri,
    entry: &str,
    raws: Vec<RawSymbol>,
) -> Vec<FqnSymbol> {
    raws.into_iter()
        .filter(|raw| filter.keeps(raw))
        .map(|raw| convert_one(resolver, container, entry, raw))
        .collect()
}

fn convert_one(
    resolver: &dyn SourceResolver,
    container: &ArtifactUri,
    entry: &str,
    raw: RawSymbol,
) -> FqnSymbol {
    let dotted = normalize_fqn(&raw.fqn).into_owned();
    let source = raw
        .source_name
        .as_deref()
        .and_then(|name| resolver.resolve(package_of(&dotted, &raw), name));
    let fqn = match &raw.method_descriptor {
        Some(descriptor) => format!("{dotted}{descriptor}"),
        None => dotted,
    };
    FqnSymbol {
        container: container.clone(),
        entry: entry.to_string(),
        fqn,
        method_descriptor: raw.method_descriptor,
        field_descriptor: raw.field_descriptor,
        source,
        line: raw.line,
    }
}

/// Package of the declaration's owning type.
///
/// Members carry the owner as their second-to-last segment, so they drop two
/// segments; types drop one. Nested types use `$` and keep a single segment.
fn package_of<'a>(dotted: &'a str, raw: &RawSymbol) -> &'a str {
    let type_name = if raw.method_descriptor.is_some() || raw.field_descriptor.is_some() {
        dotted.rsplit_once('.').map_or(dotted, |(owner, _)| owner)
    } else {
        dotted
    };
    type_name.rsplit_once('.').map_or("", |(package, _)| package)
}
