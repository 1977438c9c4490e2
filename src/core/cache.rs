//! Cache volume descriptions.
//!
//! A cache volume is a named directory persisted by the engine across
//! independent builds. The composer only describes the mount; sharing
//! semantics are enforced (or approximated) by the engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::directory::Directory;

/// Mount point of the Go module cache (`GOMODCACHE`).
pub const MODULE_CACHE_PATH: &str = "/go/pkg/mod";

/// Mount point of the Go build cache (`GOCACHE`).
pub const BUILD_CACHE_PATH: &str = "/root/.cache/go-build";

/// Volume name used for the default module cache.
pub const DEFAULT_MODULE_CACHE_VOLUME: &str = "go-mod";

/// Volume name used for the default build cache.
pub const DEFAULT_BUILD_CACHE_VOLUME: &str = "go-build";

/// A named, engine-managed cache volume.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheVolume {
    name: String,
}

impl CacheVolume {
    /// Refer to the cache volume with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        CacheVolume { name: name.into() }
    }

    /// The volume name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Policy for concurrent access to a cache volume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheSharingMode {
    /// Concurrent users see the same directory; overlapping writes race.
    #[default]
    Shared,
    /// Each user gets an isolated copy.
    Private,
    /// Concurrent users are serialized.
    Locked,
}

impl CacheSharingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheSharingMode::Shared => "shared",
            CacheSharingMode::Private => "private",
            CacheSharingMode::Locked => "locked",
        }
    }
}

impl fmt::Display for CacheSharingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheSharingMode {
    type Err = CacheSharingModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shared" => Ok(CacheSharingMode::Shared),
            "private" => Ok(CacheSharingMode::Private),
            "locked" => Ok(CacheSharingMode::Locked),
            _ => Err(CacheSharingModeParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid sharing mode.
#[derive(Debug, Clone)]
pub struct CacheSharingModeParseError(pub String);

impl fmt::Display for CacheSharingModeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid cache sharing mode '{}', valid values: shared, private, locked",
            self.0
        )
    }
}

impl std::error::Error for CacheSharingModeParseError {}

/// A cache volume mounted at a path, with optional seed contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheMount {
    /// Absolute mount point inside the container
    pub target: String,
    /// Volume to mount
    pub volume: CacheVolume,
    /// Directory used as the volume's initial contents
    pub source: Option<Directory>,
    /// Concurrent access policy, passed through to the engine
    pub sharing: CacheSharingMode,
}

impl CacheMount {
    /// Describe a mount of `volume` at `target`.
    pub fn new(target: impl Into<String>, volume: CacheVolume) -> Self {
        CacheMount {
            target: target.into(),
            volume,
            source: None,
            sharing: CacheSharingMode::default(),
        }
    }

    /// Seed the volume from a directory.
    pub fn with_source(mut self, source: Option<Directory>) -> Self {
        self.source = source;
        self
    }

    /// Set the sharing mode; `None` keeps the default.
    pub fn with_sharing(mut self, sharing: Option<CacheSharingMode>) -> Self {
        self.sharing = sharing.unwrap_or_default();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sharing_mode_parse() {
        assert_eq!("shared".parse::<CacheSharingMode>().unwrap(), CacheSharingMode::Shared);
        assert_eq!("PRIVATE".parse::<CacheSharingMode>().unwrap(), CacheSharingMode::Private);
        assert_eq!("locked".parse::<CacheSharingMode>().unwrap(), CacheSharingMode::Locked);

        let err = "exclusive".parse::<CacheSharingMode>().unwrap_err();
        assert!(err.to_string().contains("exclusive"));
    }

    #[test]
    fn test_sharing_mode_default_is_shared() {
        assert_eq!(CacheSharingMode::default(), CacheSharingMode::Shared);
    }

    #[test]
    fn test_cache_mount_builder() {
        let mount = CacheMount::new(MODULE_CACHE_PATH, CacheVolume::new("mods"))
            .with_source(Some(Directory::host("/seed")))
            .with_sharing(Some(CacheSharingMode::Locked));

        assert_eq!(mount.target, "/go/pkg/mod");
        assert_eq!(mount.volume.name(), "mods");
        assert_eq!(mount.source, Some(Directory::host("/seed")));
        assert_eq!(mount.sharing, CacheSharingMode::Locked);

        let plain = CacheMount::new(BUILD_CACHE_PATH, CacheVolume::new("b")).with_sharing(None);
        assert_eq!(plain.sharing, CacheSharingMode::Shared);
    }
}
