//! Global context for gobuild operations.
//!
//! Provides centralized access to configuration and paths.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::util::config::{self, Config};

/// Name of the Go module file used to locate a module root.
pub const GO_MOD: &str = "go.mod";

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global gobuild data (~/.gobuild/)
    home: PathBuf,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        // Fallback to ./.gobuild when there is no home directory
        let home = config::global_config_dir().unwrap_or_else(|| PathBuf::from(".gobuild"));

        Ok(GlobalContext { cwd, home })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Get the project configuration file path.
    pub fn project_config_path(&self) -> PathBuf {
        config::project_config_path(&self.cwd)
    }

    /// Load the merged global and project configuration.
    pub fn load_config(&self) -> Config {
        config::load_config(&self.config_path(), &self.project_config_path())
    }

    /// Find the enclosing Go module root, searching upward from cwd.
    pub fn find_module_root(&self) -> Option<PathBuf> {
        self.cwd
            .ancestors()
            .find(|dir| dir.join(GO_MOD).is_file())
            .map(Path::to_path_buf)
    }

    /// Resolve a source directory argument against cwd.
    ///
    /// Without an argument this is the enclosing module root, or cwd when
    /// there is none.
    pub fn source_dir(&self, arg: Option<&Path>) -> PathBuf {
        match arg {
            Some(path) if path.is_absolute() => path.to_path_buf(),
            Some(path) => self.cwd.join(path),
            None => self.find_module_root().unwrap_or_else(|| self.cwd.clone()),
        }
    }
}
