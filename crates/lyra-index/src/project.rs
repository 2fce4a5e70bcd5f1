//! Where the engine learns what it should keep indexed.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

/// One configured indexing root.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    /// Build-output directory, scanned recursively for `.class` files.
    ClassDir(PathBuf),
    /// Dependency archive, indexed as a single unit.
    Archive(PathBuf),
}

impl Target {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Target::ClassDir(path) | Target::Archive(path) => path,
        }
    }
}

/// Supplies the universe of artifacts the engine should keep indexed.
///
/// Queried once per refresh cycle; the answer may change between cycles as
/// the build configuration evolves.
pub trait ProjectModel: Send + Sync {
    fn targets(&self) -> Vec<Target>;
}

/// A target list that can be swapped wholesale between refreshes. Enough for
/// tests and embedders with static build configuration.
#[derive(Debug, Default)]
pub struct FixedTargets {
    targets: Mutex<Vec<Target>>,
}

impl FixedTargets {
    pub fn new(targets: Vec<Target>) -> FixedTargets {
        FixedTargets {
            targets: Mutex::new(targets),
        }
    }

    /// Replace the universe; visible to the next refresh.
    pub fn replace(&self, targets: Vec<Target>) {
        *self.targets.lock() = targets;
    }
}

impl ProjectModel for FixedTargets {
    fn targets(&self) -> Vec<Target> {
        self.targets.lock().clone()
    }
}
