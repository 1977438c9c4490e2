//! Configuration file support for gobuild.
//!
//! gobuild supports two configuration file locations:
//! - Global: `~/.gobuild/config.toml` - User-wide defaults
//! - Project: `.gobuild/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::cache::CacheSharingMode;
use crate::core::image::ImageRef;

/// gobuild configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base image settings
    pub image: ImageConfig,

    /// Cache volume settings
    pub cache: CacheConfig,

    /// Default build options
    pub build: BuildConfig,

    /// Container engine settings
    pub engine: EngineConfig,
}

/// Base image configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Image repository (default: golang)
    pub repository: Option<String>,

    /// Image tag (default: latest)
    pub version: Option<String>,
}

/// Cache volume configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Mount cache volumes (default: true)
    pub enabled: Option<bool>,

    /// Volume name for the module cache (default: go-mod)
    pub module_volume: Option<String>,

    /// Volume name for the build cache (default: go-build)
    pub build_volume: Option<String>,

    /// Sharing mode for both volumes (shared, private, locked)
    pub sharing: Option<String>,
}

/// Default build options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Build tags applied to every build
    pub tags: Vec<String>,

    /// Pass -trimpath by default
    pub trimpath: Option<bool>,

    /// Default target platform (e.g. linux/amd64)
    pub platform: Option<String>,

    /// Set CGO_ENABLED (true = 1, false = 0, unset = image default)
    pub cgo: Option<bool>,
}

/// Container engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Container CLI to use (docker, podman, or a path)
    pub program: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        // Image settings
        if other.image.repository.is_some() {
            self.image.repository = other.image.repository;
        }
        if other.image.version.is_some() {
            self.image.version = other.image.version;
        }

        // Cache settings
        if other.cache.enabled.is_some() {
            self.cache.enabled = other.cache.enabled;
        }
        if other.cache.module_volume.is_some() {
            self.cache.module_volume = other.cache.module_volume;
        }
        if other.cache.build_volume.is_some() {
            self.cache.build_volume = other.cache.build_volume;
        }
        if other.cache.sharing.is_some() {
            self.cache.sharing = other.cache.sharing;
        }

        // Build settings
        if !other.build.tags.is_empty() {
            self.build.tags = other.build.tags;
        }
        if other.build.trimpath.is_some() {
            self.build.trimpath = other.build.trimpath;
        }
        if other.build.platform.is_some() {
            self.build.platform = other.build.platform;
        }
        if other.build.cgo.is_some() {
            self.build.cgo = other.build.cgo;
        }

        // Engine settings
        if other.engine.program.is_some() {
            self.engine.program = other.engine.program;
        }
    }

    /// The configured base image, if a repository or version is set.
    pub fn image_ref(&self) -> Option<ImageRef> {
        match (&self.image.repository, &self.image.version) {
            (None, None) => None,
            (repository, version) => {
                let mut image = ImageRef::version(version.as_deref().unwrap_or_default());
                if let Some(repository) = repository {
                    image.repository = repository.clone();
                }
                Some(image)
            }
        }
    }

    /// Whether default cache volumes are mounted.
    pub fn caching_enabled(&self) -> bool {
        self.cache.enabled.unwrap_or(true)
    }

    /// Parse the cache sharing mode.
    pub fn sharing(&self) -> Result<Option<CacheSharingMode>> {
        self.cache
            .sharing
            .as_deref()
            .map(|s| s.parse::<CacheSharingMode>())
            .transpose()
            .context("invalid `cache.sharing` in config")
    }
}

/// Get the global gobuild config directory (~/.gobuild).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".gobuild"))
}

/// Get the project config path (.gobuild/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".gobuild").join("config.toml")
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.gobuild/config.toml)
/// 2. Global config (~/.gobuild/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        let global = Config::load_or_default(global_path);
        config.merge(global);
    }

    if project_path.exists() {
        let project = Config::load_or_default(project_path);
        config.merge(project);
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.caching_enabled());
        assert!(config.image_ref().is_none());
        assert!(config.build.tags.is_empty());
        assert_eq!(config.sharing().unwrap(), None);
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[image]
version = "1.22"

[cache]
enabled = false
sharing = "locked"

[build]
tags = ["netgo", "osusergo"]
trimpath = true
platform = "linux/arm64"

[engine]
program = "podman"
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.image_ref().unwrap().to_string(), "golang:1.22");
        assert!(!config.caching_enabled());
        assert_eq!(config.sharing().unwrap(), Some(CacheSharingMode::Locked));
        assert_eq!(config.build.tags, vec!["netgo", "osusergo"]);
        assert_eq!(config.build.trimpath, Some(true));
        assert_eq!(config.build.platform.as_deref(), Some("linux/arm64"));
        assert_eq!(config.engine.program, Some(PathBuf::from("podman")));
    }

    #[test]
    fn test_config_invalid_sharing() {
        let mut config = Config::default();
        config.cache.sharing = Some("exclusive".to_string());
        assert!(config.sharing().is_err());
    }

    #[test]
    fn test_image_ref_repository_only() {
        let mut config = Config::default();
        config.image.repository = Some("registry.local:5000/golang".to_string());
        assert_eq!(
            config.image_ref().unwrap().to_string(),
            "registry.local:5000/golang:latest"
        );
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.image.version = Some("1.21".to_string());
        base.build.tags = vec!["a".to_string()];

        let mut override_cfg = Config::default();
        override_cfg.image.version = Some("1.22".to_string());
        override_cfg.cache.enabled = Some(false);

        base.merge(override_cfg);

        assert_eq!(base.image.version.as_deref(), Some("1.22"));
        assert_eq!(base.build.tags, vec!["a"]); // Not overridden
        assert_eq!(base.cache.enabled, Some(false));
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(
            &global_path,
            r#"
[image]
version = "1.21"

[cache]
module_volume = "shared-mod"
"#,
        )
        .unwrap();

        std::fs::write(
            &project_path,
            r#"
[image]
version = "1.22"
"#,
        )
        .unwrap();

        let config = load_config(&global_path, &project_path);

        assert_eq!(config.image.version.as_deref(), Some("1.22"));
        assert_eq!(config.cache.module_volume.as_deref(), Some("shared-mod"));
    }

    #[test]
    fn test_unparsable_config_falls_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[cache\nenabled = ").unwrap();

        assert_eq!(Config::load_or_default(&path), Config::default());
    }
}
