//! Execution engines.
//!
//! The composer never runs anything itself. An [`Engine`] is the narrow
//! capability interface that does: start from an image, set variables and
//! working directory, mount directories and caches, execute commands, and
//! read files. [`realize`] replays a container's operation log against an
//! engine, always starting from the base image, so every realization is
//! independent of any other.

pub mod docker;
pub mod expand;
pub mod plan;

use serde::{Deserialize, Serialize};

use crate::core::cache::CacheMount;
use crate::core::container::{Container, Op};
use crate::core::directory::Directory;
use crate::core::error::{Error, Result};
use crate::core::image::ImageRef;

pub use docker::DockerEngine;
pub use expand::{expand_vars, EnvVars};
pub use plan::PlanEngine;

/// Captured result of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    /// A successful result with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        ExecOutput {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Primitives an execution backend provides.
///
/// Each method consumes the previous state and returns the next, mirroring
/// the immutable composer on the engine side. Engines report non-zero exit
/// codes as data; [`realize`] turns them into [`Error::Execution`].
pub trait Engine {
    /// Engine-specific snapshot of a container being realized.
    type State;

    /// Start from a base image.
    fn from_image(&self, image: &ImageRef) -> Result<Self::State>;

    /// Set a variable, expanding `$VAR` references against the state first
    /// when `expand` is true.
    fn with_env_variable(
        &self,
        state: Self::State,
        name: &str,
        value: &str,
        expand: bool,
    ) -> Result<Self::State>;

    fn with_workdir(&self, state: Self::State, path: &str) -> Result<Self::State>;

    fn with_mounted_directory(
        &self,
        state: Self::State,
        path: &str,
        source: &Directory,
    ) -> Result<Self::State>;

    fn with_mounted_cache(&self, state: Self::State, mount: &CacheMount) -> Result<Self::State>;

    /// Run a command and return the state that observed its effects.
    fn with_exec(&self, state: Self::State, args: &[String]) -> Result<(Self::State, ExecOutput)>;

    /// Read a file; a missing path is [`Error::ArtifactNotFound`].
    fn read_file(&self, state: &Self::State, path: &str) -> Result<Vec<u8>>;

    /// Free whatever the engine holds for a state that is no longer needed.
    fn release(&self, _state: Self::State) {}
}

/// Engine state after replaying a container, plus its last exec output.
#[derive(Debug)]
pub struct Realized<S> {
    pub state: S,
    pub last_output: Option<ExecOutput>,
}

/// Replay `container` against `engine` from its base image.
///
/// Stops at the first failing primitive or non-zero exit; nothing is
/// retried. On success the caller owns the returned state and must hand it
/// back through [`Engine::release`].
pub fn realize<E: Engine>(engine: &E, container: &Container) -> Result<Realized<E::State>> {
    let mut state = engine.from_image(container.image())?;
    let mut last_output = None;

    for op in container.ops() {
        state = match op {
            Op::EnvVariable {
                name,
                value,
                expand,
            } => engine.with_env_variable(state, name, value, *expand)?,
            Op::Workdir { path } => engine.with_workdir(state, path)?,
            Op::MountedDirectory { path, source } => {
                engine.with_mounted_directory(state, path, source)?
            }
            Op::MountedCache(mount) => engine.with_mounted_cache(state, mount)?,
            Op::Exec { args } => {
                let (next, output) = engine.with_exec(state, args)?;
                if !output.is_success() {
                    engine.release(next);
                    return Err(Error::Execution {
                        args: args.clone(),
                        exit_code: output.exit_code,
                        stderr: output.stderr,
                    });
                }
                last_output = Some(output);
                next
            }
        };
    }

    Ok(Realized { state, last_output })
}
