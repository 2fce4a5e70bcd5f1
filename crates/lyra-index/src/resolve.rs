//! Best-effort mapping from compiled declarations back to source files.

use std::path::PathBuf;

use lyra_core::ArtifactUri;

/// Maps a declaration's package and source-file hint to a source location.
///
/// Resolution failures are not errors; a `None` simply leaves the symbol
/// without a source link.
pub trait SourceResolver: Send + Sync {
    fn resolve(&self, package: &str, source_name: &str) -> Option<ArtifactUri>;
}

/// Resolver for deployments without source roots; never finds anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSourceResolver;

impl SourceResolver for NullSourceResolver {
    fn resolve(&self, _package: &str, _source_name: &str) -> Option<ArtifactUri> {
        None
    }
}

/// Looks for `<root>/<package as path>/<source_name>` under configured roots,
/// first root wins.
#[derive(Clone, Debug, Default)]
pub struct SourceRootResolver {
    roots: Vec<PathBuf>,
}

impl SourceRootResolver {
    pub fn new(roots: Vec<PathBuf>) -> SourceRootResolver {
        SourceRootResolver { roots }
    }
}

impl SourceResolver for SourceRootResolver {
    fn resolve(&self, package: &str, source_name: &str) -> Option<ArtifactUri> {
        // The hint comes from untrusted class data; refuse anything that
        // could step outside the roots.
        if source_name.is_empty()
            || source_name.contains('/')
            || source_name.contains('\\')
            || source_name.contains("..")
        {
            return None;
        }

        let mut relative = PathBuf::new();
        for segment in package.split('.').filter(|s| !s.is_empty()) {
            relative.push(segment);
        }
        relative.push(source_name);

        self.roots
            .iter()
            .map(|root| root.join(&relative))
            .find(|candidate| candidate.is_file())
            .map(|path| ArtifactUri::from_path(&path))
    }
}
