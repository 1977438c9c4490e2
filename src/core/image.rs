//! Container image references.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Repository used when no image is specified.
pub const DEFAULT_IMAGE_REPOSITORY: &str = "golang";

/// Tag used when no version is specified.
pub const DEFAULT_IMAGE_TAG: &str = "latest";

/// An image reference in `repository:tag` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    /// Repository, possibly including a registry host (e.g. `ghcr.io/org/go`)
    pub repository: String,
    /// Tag (e.g. `1.22`, `latest`)
    pub tag: String,
}

impl ImageRef {
    /// Create a reference from repository and tag.
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        ImageRef {
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    /// Reference a version of the default repository; an empty version means `latest`.
    pub fn version(version: &str) -> Self {
        let tag = if version.is_empty() {
            DEFAULT_IMAGE_TAG
        } else {
            version
        };
        ImageRef::new(DEFAULT_IMAGE_REPOSITORY, tag)
    }

    /// Parse a `repository[:tag]` reference.
    ///
    /// A colon belonging to a registry port (`host:5000/repo`) is not a tag
    /// separator, so only a colon after the last `/` is considered.
    pub fn parse(reference: &str) -> Self {
        let name_start = reference.rfind('/').map(|i| i + 1).unwrap_or(0);
        match reference[name_start..].rfind(':') {
            Some(pos) => {
                let split = name_start + pos;
                ImageRef::new(&reference[..split], &reference[split + 1..])
            }
            None => ImageRef::new(reference, DEFAULT_IMAGE_TAG),
        }
    }
}

impl Default for ImageRef {
    fn default() -> Self {
        ImageRef::new(DEFAULT_IMAGE_REPOSITORY, DEFAULT_IMAGE_TAG)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

impl From<&str> for ImageRef {
    fn from(reference: &str) -> Self {
        ImageRef::parse(reference)
    }
}
