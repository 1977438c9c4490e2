//! Implementation of `gobuild build`, `gobuild exec` and `gobuild plan`.
//!
//! These operations merge configuration with command-line options, compose
//! a [`GoEnv`] from the result, and either realize it against an engine or
//! render it without running anything.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::builder::{BuildOptions, GoEnv, GoOptions, BINARY_PATH};
use crate::core::cache::{CacheVolume, DEFAULT_BUILD_CACHE_VOLUME, DEFAULT_MODULE_CACHE_VOLUME};
use crate::core::container::{Artifact, Container};
use crate::core::directory::Directory;
use crate::core::image::ImageRef;
use crate::engine::{DockerEngine, Engine, ExecOutput, PlanEngine};
use crate::util::config::Config;

/// Options shaping the environment, shared by every command.
#[derive(Debug, Clone, Default)]
pub struct EnvOptions {
    /// Full image reference; wins over `version`
    pub image: Option<String>,

    /// Tag of the official golang image
    pub version: Option<String>,

    /// Skip the default cache volumes
    pub no_cache: bool,

    /// Force CGO_ENABLED on or off
    pub cgo: Option<bool>,

    /// Extra environment variables, applied in order
    pub env: Vec<(String, String)>,
}

/// Options for `gobuild build`.
#[derive(Debug, Clone, Default)]
pub struct GoBuildOptions {
    pub env: EnvOptions,

    /// Source directory on the host
    pub source: PathBuf,

    /// Build flags from the command line
    pub build: BuildOptions,

    /// Where to write the binary on the host
    pub output: Option<PathBuf>,
}

/// Options for `gobuild exec`.
#[derive(Debug, Clone, Default)]
pub struct GoExecOptions {
    pub env: EnvOptions,

    /// Source directory to mount, if any
    pub source: Option<PathBuf>,

    /// Target platform
    pub platform: Option<String>,

    /// Command to run
    pub args: Vec<String>,
}

/// Result of a build.
#[derive(Debug)]
pub struct BuildResult {
    /// Handle to the binary inside the container
    pub artifact: Artifact,

    /// Host path the binary was exported to
    pub output: Option<PathBuf>,
}

/// A rendered, unexecuted container.
#[derive(Debug, Serialize)]
pub struct Plan {
    pub fingerprint: String,
    pub container: Container,
    pub steps: Vec<String>,
}

impl Plan {
    /// Render `container` without an engine.
    pub fn of(container: &Container) -> Result<Self> {
        let steps = PlanEngine::new()
            .render(container)
            .context("failed to render plan")?;
        Ok(Plan {
            fingerprint: container.fingerprint(),
            container: container.clone(),
            steps,
        })
    }
}

/// Create the engine named in config, or detect one.
pub fn docker_engine(config: &Config) -> Result<DockerEngine> {
    match config.engine.program {
        Some(ref program) => Ok(DockerEngine::new(program)),
        None => DockerEngine::detect(),
    }
}

/// Compose the base environment from config and command-line options.
///
/// Command-line options win over config.
pub fn compose_env(config: &Config, opts: &EnvOptions) -> Result<GoEnv> {
    let image = match (&opts.image, &opts.version) {
        (Some(image), _) => Some(ImageRef::parse(image)),
        (None, Some(version)) => Some(ImageRef::version(version)),
        (None, None) => config.image_ref(),
    };

    let caching = !opts.no_cache && config.caching_enabled();
    let sharing = config.sharing()?;
    let custom_caches = sharing.is_some()
        || config.cache.module_volume.is_some()
        || config.cache.build_volume.is_some();

    let mut options = GoOptions::new().caching_enabled(caching && !custom_caches);
    if let Some(image) = image {
        options = options.container(Container::from_image(image));
    }
    let mut env = GoEnv::new(options);

    if caching && custom_caches {
        let module = config
            .cache
            .module_volume
            .as_deref()
            .unwrap_or(DEFAULT_MODULE_CACHE_VOLUME);
        let build = config
            .cache
            .build_volume
            .as_deref()
            .unwrap_or(DEFAULT_BUILD_CACHE_VOLUME);
        env = env
            .with_module_cache(CacheVolume::new(module), None, sharing)
            .with_build_cache(CacheVolume::new(build), None, sharing);
    }

    env = match opts.cgo.or(config.build.cgo) {
        Some(true) => env.with_cgo_enabled(),
        Some(false) => env.with_cgo_disabled(),
        None => env,
    };

    for (name, value) in &opts.env {
        env = env.with_env_variable(name, value, false);
    }

    debug!("composed environment {}", env.container().fingerprint());
    Ok(env)
}

/// Fill unset build options from config.
pub fn resolve_build_options(config: &Config, cli: &BuildOptions) -> BuildOptions {
    let mut opts = cli.clone();
    if opts.tags.is_empty() {
        opts.tags = config.build.tags.clone();
    }
    if !opts.trimpath {
        opts.trimpath = config.build.trimpath.unwrap_or(false);
    }
    if opts.platform.is_none() {
        opts.platform = config.build.platform.clone();
    }
    opts
}

fn source_directory(path: &Path) -> Result<Directory> {
    if !path.is_dir() {
        bail!("source directory not found: {}", path.display());
    }
    Ok(Directory::host(path))
}

/// Compose the build without running it.
pub fn compose_build(config: &Config, opts: &GoBuildOptions) -> Result<Artifact> {
    let env = compose_env(config, &opts.env)?;
    let build = resolve_build_options(config, &opts.build);
    let source = source_directory(&opts.source)?;

    env.build(source, &build)
        .with_context(|| format!("invalid build options for {}", opts.source.display()))
}

/// Build a binary and optionally export it to the host.
pub fn go_build<E: Engine>(
    engine: &E,
    config: &Config,
    opts: &GoBuildOptions,
) -> Result<BuildResult> {
    let artifact = compose_build(config, opts)?;

    info!(
        "building {} ({})",
        opts.source.display(),
        artifact.container().image()
    );

    match opts.output {
        Some(ref output) => {
            artifact
                .export(engine, output)
                .with_context(|| format!("failed to build {}", opts.source.display()))?;
            info!("wrote {}", output.display());
        }
        None => {
            artifact
                .contents(engine)
                .with_context(|| format!("failed to build {}", opts.source.display()))?;
            info!("built {}", BINARY_PATH);
        }
    }

    Ok(BuildResult {
        artifact,
        output: opts.output.clone(),
    })
}

/// Compose an exec without running it.
pub fn compose_exec(config: &Config, opts: &GoExecOptions) -> Result<Container> {
    if opts.args.is_empty() {
        bail!("no command given");
    }

    let env = compose_env(config, &opts.env)?;
    let source = opts.source.as_deref().map(source_directory).transpose()?;
    let platform = opts
        .platform
        .as_deref()
        .or(config.build.platform.as_deref())
        .unwrap_or_default();

    Ok(env.exec(opts.args.iter().cloned(), source, platform)?)
}

/// Run a command in the environment.
pub fn go_exec<E: Engine>(
    engine: &E,
    config: &Config,
    opts: &GoExecOptions,
) -> Result<ExecOutput> {
    let container = compose_exec(config, opts)?;
    info!("running `{}`", opts.args.join(" "));

    container
        .sync(engine)
        .with_context(|| format!("`{}` failed", opts.args.join(" ")))
}
