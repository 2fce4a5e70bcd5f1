//! Filesystem scanning: targets to concrete indexable files.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::Path;

use lyra_core::{ArtifactKind, ArtifactUri, TrackedFile};
use thiserror::Error;

use crate::project::Target;

#[derive(Debug, Error)]
pub(crate) enum ScanError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Expand configured targets into the current universe of indexable files.
///
/// Unreadable entries are logged and skipped; the universe is best-effort and
/// re-derived every cycle. Duplicate URIs across overlapping targets collapse
/// to one entry.
pub(crate) fn expand_targets(targets: &[Target]) -> Vec<TrackedFile> {
    let mut universe = Vec::new();
    let mut seen: HashSet<ArtifactUri> = HashSet::new();
    for target in targets {
        match target {
            Target::ClassDir(dir) => scan_class_dir(dir, &mut universe, &mut seen),
            Target::Archive(path) => match TrackedFile::of_path(path, ArtifactKind::Archive) {
                Ok(file) => {
                    if seen.insert(file.uri.clone()) {
                        universe.push(file);
                    }
                }
                Err(err) => {
                    tracing::debug!(
                        target = "lyra.scan",
                        path = %path.display(),
                        error = %err,
                        "skipping unreadable archive"
                    );
                }
            },
        }
    }
    universe
}

fn scan_class_dir(dir: &Path, universe: &mut Vec<TrackedFile>, seen: &mut HashSet<ArtifactUri>) {
    for entry in walkdir::WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension() != Some(OsStr::new("class")) {
            continue;
        }
        if is_ignored_stem(entry.path()) {
            continue;
        }
        match TrackedFile::of_path(entry.path(), ArtifactKind::ClassFile) {
            Ok(file) => {
                if seen.insert(file.uri.clone()) {
                    universe.push(file);
                }
            }
            Err(err) => {
                tracing::debug!(
                    target = "lyra.scan",
                    path = %entry.path().display(),
                    error = %err,
                    "skipping unreadable class file"
                );
            }
        }
    }
}

fn is_ignored_stem(path: &Path) -> bool {
    matches!(
        path.file_stem().and_then(OsStr::to_str),
        Some("module-info") | Some("package-info")
    )
}

/// List an archive's `.class` entries without reading their bytes.
///
/// Resource entries, `META-INF/` (including multi-release versions) and
/// declaration-free JVM bookkeeping classes are skipped. The listing is
/// sorted so extraction order is deterministic.
pub(crate) fn archive_class_entries(path: &Path) -> Result<Vec<String>, ScanError> {
    let file = std::fs::File::open(path)?;
    let archive = zip::ZipArchive::new(file)?;
    let mut entries: Vec<String> = archive
        .file_names()
        .filter(|name| name.ends_with(".class"))
        .filter(|name| !name.starts_with("META-INF/"))
        .filter(|name| !is_ignored_class_entry(name))
        .map(str::to_owned)
        .collect();
    entries.sort();
    Ok(entries)
}

fn is_ignored_class_entry(name: &str) -> bool {
    let Some(internal) = name.strip_suffix(".class") else {
        return true;
    };
    internal == "module-info" || internal == "package-info" || internal.ends_with("/package-info")
}
