//! The Go execution environment.

use crate::builder::build::BuildOptions;
use crate::builder::with_source::WithSource;
use crate::core::cache::{
    CacheSharingMode, CacheVolume, BUILD_CACHE_PATH, DEFAULT_BUILD_CACHE_VOLUME,
    DEFAULT_MODULE_CACHE_VOLUME, MODULE_CACHE_PATH,
};
use crate::core::container::{Artifact, Container};
use crate::core::directory::Directory;
use crate::core::error::Result;
use crate::core::image::ImageRef;
use crate::core::platform::Platform;

/// Working directory the source tree is mounted at.
pub const SOURCE_WORKDIR: &str = "/work/src";

/// Constructor options for [`GoEnv`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoOptions {
    /// Tag of the official `golang` image. Ignored when `container` is set.
    pub version: Option<String>,
    /// Custom base container.
    pub container: Option<Container>,
    /// Mount the default `go-mod` and `go-build` cache volumes.
    pub caching_enabled: bool,
}

impl Default for GoOptions {
    fn default() -> Self {
        GoOptions {
            version: None,
            container: None,
            caching_enabled: true,
        }
    }
}

impl GoOptions {
    pub fn new() -> Self {
        GoOptions::default()
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn container(mut self, container: Container) -> Self {
        self.container = Some(container);
        self
    }

    pub fn caching_enabled(mut self, enabled: bool) -> Self {
        self.caching_enabled = enabled;
        self
    }
}

/// An immutable environment for running the Go toolchain.
///
/// Every method returns a new value; the receiver is never modified, so an
/// environment can be branched and reused freely.
///
/// Unless [`GoOptions::caching_enabled`] is turned off, construction mounts
/// the process-wide `go-mod` volume at [`MODULE_CACHE_PATH`] and the
/// `go-build` volume at [`BUILD_CACHE_PATH`], both with the default sharing
/// mode. This is the only implicit behavior of the type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GoEnv {
    container: Container,
}

impl Default for GoEnv {
    fn default() -> Self {
        GoEnv::new(GoOptions::default())
    }
}

impl GoEnv {
    pub fn new(options: GoOptions) -> Self {
        let container = match options.container {
            Some(container) => container,
            None => Container::from_image(ImageRef::version(
                options.version.as_deref().unwrap_or_default(),
            )),
        };

        let env = GoEnv { container };
        if !options.caching_enabled {
            return env;
        }

        env.with_module_cache(CacheVolume::new(DEFAULT_MODULE_CACHE_VOLUME), None, None)
            .with_build_cache(CacheVolume::new(DEFAULT_BUILD_CACHE_VOLUME), None, None)
    }

    /// Use a tag of the official image (e.g. `1.22`).
    pub fn from_version(version: &str) -> Self {
        GoEnv::new(GoOptions::new().version(version))
    }

    /// Use a full image reference (e.g. `golang:1.22-alpine`).
    pub fn from_image(reference: &str) -> Self {
        GoEnv::from_container(Container::from_image(ImageRef::parse(reference)))
    }

    /// Use a caller-supplied base container.
    pub fn from_container(container: Container) -> Self {
        GoEnv::new(GoOptions::new().container(container))
    }

    /// Wrap a container without any default wiring.
    pub(crate) fn wrap(container: Container) -> Self {
        GoEnv { container }
    }

    /// The underlying container.
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Set an environment variable.
    ///
    /// With `expand`, `${VAR}` and `$VAR` in `value` resolve against the
    /// variables defined at this point (e.g. `/opt/bin:$PATH`).
    pub fn with_env_variable(&self, name: &str, value: &str, expand: bool) -> Self {
        GoEnv::wrap(self.container.with_env_variable(name, value, expand))
    }

    /// Set `GOOS`, `GOARCH` and, for platforms with a variant, `GOARM`.
    ///
    /// `platform` is `os/arch[/variant]` (e.g. `linux/arm64/v7`). An empty
    /// string returns the environment unchanged.
    pub fn with_platform(&self, platform: &str) -> Result<Self> {
        Ok(match Platform::parse(platform)? {
            Some(platform) => self.with_target(&platform),
            None => self.clone(),
        })
    }

    /// Like [`GoEnv::with_platform`] for an already parsed platform.
    pub fn with_target(&self, platform: &Platform) -> Self {
        let container = platform
            .env_variables()
            .into_iter()
            .fold(self.container.clone(), |ctr, (name, value)| {
                ctr.with_env_variable(name, value, false)
            });
        GoEnv::wrap(container)
    }

    /// Set `CGO_ENABLED=1`.
    pub fn with_cgo_enabled(&self) -> Self {
        self.with_env_variable("CGO_ENABLED", "1", false)
    }

    /// Set `CGO_ENABLED=0`.
    pub fn with_cgo_disabled(&self) -> Self {
        self.with_env_variable("CGO_ENABLED", "0", false)
    }

    /// Mount a cache volume for the module cache.
    pub fn with_module_cache(
        &self,
        cache: CacheVolume,
        source: Option<Directory>,
        sharing: Option<CacheSharingMode>,
    ) -> Self {
        GoEnv::wrap(
            self.container
                .with_mounted_cache(MODULE_CACHE_PATH, cache, source, sharing),
        )
    }

    /// Mount a cache volume for the build cache.
    pub fn with_build_cache(
        &self,
        cache: CacheVolume,
        source: Option<Directory>,
        sharing: Option<CacheSharingMode>,
    ) -> Self {
        GoEnv::wrap(
            self.container
                .with_mounted_cache(BUILD_CACHE_PATH, cache, source, sharing),
        )
    }

    /// Run a command.
    ///
    /// The platform is applied first. With a source directory the command
    /// runs in the mounted tree, exactly as `with_source(src).exec(args)`.
    pub fn exec<I, S>(
        &self,
        args: I,
        source: Option<Directory>,
        platform: &str,
    ) -> Result<Container>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let env = self.with_platform(platform)?;

        match source {
            Some(source) => env.with_source(source).exec(args, ""),
            None => Ok(env.container.with_exec(args)),
        }
    }

    /// Mount a source directory at [`SOURCE_WORKDIR`] and make it the
    /// working directory.
    pub fn with_source(&self, source: Directory) -> WithSource {
        WithSource::bind(
            self.container
                .with_workdir(SOURCE_WORKDIR)
                .with_mounted_directory(SOURCE_WORKDIR, source),
        )
    }

    /// Build a binary from `source`.
    pub fn build(&self, source: Directory, options: &BuildOptions) -> Result<Artifact> {
        self.with_source(source).build(options)
    }
}
