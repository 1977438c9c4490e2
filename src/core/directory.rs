//! Source directory handles.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// An opaque reference to a directory tree the engine can mount.
///
/// The composer never reads or writes the tree; it only passes the handle
/// to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum Directory {
    /// A directory on the host filesystem.
    Host(PathBuf),
}

impl Directory {
    /// Refer to a host directory.
    pub fn host(path: impl AsRef<Path>) -> Self {
        Directory::Host(path.as_ref().to_path_buf())
    }

    /// Host path backing this directory.
    pub fn host_path(&self) -> &Path {
        match self {
            Directory::Host(path) => path,
        }
    }
}

impl fmt::Display for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directory::Host(path) => write!(f, "host:{}", path.display()),
        }
    }
}
