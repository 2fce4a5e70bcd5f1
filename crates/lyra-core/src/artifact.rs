use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Stable identity of an indexable artifact.
///
/// The string form is the artifact's on-disk path; two artifacts are the same
/// record exactly when their URIs compare equal. Keeping this a newtype (and
/// not a `PathBuf`) makes it usable as a database key without worrying about
/// platform-specific path equality.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactUri(String);

impl ArtifactUri {
    pub fn new(uri: impl Into<String>) -> ArtifactUri {
        ArtifactUri(uri.into())
    }

    pub fn from_path(path: &Path) -> ArtifactUri {
        ArtifactUri(path.to_string_lossy().into_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn to_path(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }
}

impl fmt::Display for ArtifactUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Path> for ArtifactUri {
    fn from(path: &Path) -> ArtifactUri {
        ArtifactUri::from_path(path)
    }
}

/// What shape of artifact a [`TrackedFile`] refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// A single compiled class file on disk.
    ClassFile,
    /// A jar/zip archive indexed as one unit.
    Archive,
}

/// Cheap fingerprint of a file's on-disk state.
///
/// Hashes length and modification time so changes are detected with a single
/// `stat`, never by re-reading content. Tokens are opaque: the only supported
/// operation is comparing two tokens for the same artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeToken(u64);

impl ChangeToken {
    /// Fingerprint the file at `path` from its metadata.
    pub fn of(path: &Path) -> io::Result<ChangeToken> {
        let meta = std::fs::metadata(path)?;
        let mut hasher = DefaultHasher::new();
        meta.len().hash(&mut hasher);
        hash_mtime(&mut hasher, &meta.modified()?);
        Ok(ChangeToken(hasher.finish()))
    }

    /// Build a token from a raw value. Intended for tests and store
    /// implementations that serialize tokens themselves.
    #[must_use]
    pub fn from_raw(raw: u64) -> ChangeToken {
        ChangeToken(raw)
    }

    #[must_use]
    pub fn as_raw(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn to_hex(self) -> String {
        format!("{:016x}", self.0)
    }
}

fn hash_mtime(hasher: &mut DefaultHasher, time: &SystemTime) {
    let duration = time
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0));
    duration.as_secs().hash(hasher);
    duration.subsec_nanos().hash(hasher);
}

/// Identity plus freshness evidence for one indexable artifact.
///
/// A `TrackedFile` is what the metadata store remembers per artifact; the
/// refresh pass compares the stored token against a freshly computed one to
/// decide whether the artifact needs re-indexing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    pub uri: ArtifactUri,
    pub kind: ArtifactKind,
    pub token: ChangeToken,
}

impl TrackedFile {
    /// Stat `path` and capture its current token.
    pub fn of_path(path: &Path, kind: ArtifactKind) -> io::Result<TrackedFile> {
        Ok(TrackedFile {
            uri: ArtifactUri::from_path(path),
            kind,
            token: ChangeToken::of(path)?,
        })
    }
}
