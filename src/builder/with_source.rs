//! An environment with a source tree mounted.

use crate::builder::build::{BuildOptions, BINARY_PATH};
use crate::builder::go::GoEnv;
use crate::core::cache::{CacheSharingMode, CacheVolume};
use crate::core::container::{Artifact, Container};
use crate::core::directory::Directory;
use crate::core::error::Result;
use crate::core::platform::Platform;

/// A [`GoEnv`] bound to a source directory.
///
/// Obtained from [`GoEnv::with_source`]. All configuration methods delegate
/// to the wrapped environment and stay bound, so commands keep running in
/// the mounted tree however many calls are chained.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WithSource {
    go: GoEnv,
}

impl WithSource {
    pub(crate) fn bind(container: Container) -> Self {
        WithSource {
            go: GoEnv::wrap(container),
        }
    }

    fn rebind(go: GoEnv) -> Self {
        WithSource { go }
    }

    /// The underlying container.
    pub fn container(&self) -> &Container {
        self.go.container()
    }

    pub fn with_env_variable(&self, name: &str, value: &str, expand: bool) -> Self {
        WithSource::rebind(self.go.with_env_variable(name, value, expand))
    }

    pub fn with_platform(&self, platform: &str) -> Result<Self> {
        Ok(WithSource::rebind(self.go.with_platform(platform)?))
    }

    pub fn with_target(&self, platform: &Platform) -> Self {
        WithSource::rebind(self.go.with_target(platform))
    }

    pub fn with_cgo_enabled(&self) -> Self {
        WithSource::rebind(self.go.with_cgo_enabled())
    }

    pub fn with_cgo_disabled(&self) -> Self {
        WithSource::rebind(self.go.with_cgo_disabled())
    }

    pub fn with_module_cache(
        &self,
        cache: CacheVolume,
        source: Option<Directory>,
        sharing: Option<CacheSharingMode>,
    ) -> Self {
        WithSource::rebind(self.go.with_module_cache(cache, source, sharing))
    }

    pub fn with_build_cache(
        &self,
        cache: CacheVolume,
        source: Option<Directory>,
        sharing: Option<CacheSharingMode>,
    ) -> Self {
        WithSource::rebind(self.go.with_build_cache(cache, source, sharing))
    }

    /// Run a command in the source tree, applying `platform` first.
    pub fn exec<I, S>(&self, args: I, platform: &str) -> Result<Container>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let bound = self.with_platform(platform)?;
        Ok(bound.go.container().with_exec(args))
    }

    /// Compile the package into a binary at [`BINARY_PATH`].
    pub fn build(&self, options: &BuildOptions) -> Result<Artifact> {
        let ctr = self.exec(options.build_args(), options.platform.as_deref().unwrap_or_default())?;
        Ok(ctr.file(BINARY_PATH))
    }
}
