//! Engine backed by a docker-compatible CLI (docker or podman).
//!
//! Every exec runs in a fresh container created from the current image and
//! is committed to a new image afterwards, so each step of a realization is
//! an immutable snapshot and the next exec observes the previous one's
//! filesystem effects.
//!
//! Cache sharing modes are approximated with the CLI's volume model:
//! - `shared`: named volume, mounted as is.
//! - `locked`: named volume; execs using it are serialized in-process.
//! - `private`: anonymous volume per exec.
//!
//! Containers are removed with their anonymous volumes right after each
//! step. Committed snapshot images live until the state is released.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::core::cache::{CacheMount, CacheSharingMode};
use crate::core::directory::Directory;
use crate::core::error::{Error, Result};
use crate::core::image::ImageRef;
use crate::engine::{EnvVars, Engine, ExecOutput};
use crate::util::hash::Fingerprint;
use crate::util::process::{find_container_cli, ProcessBuilder};

/// Per-volume locks for `locked` cache mounts.
static VOLUME_LOCKS: LazyLock<Mutex<HashMap<String, Arc<Mutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

static CONTAINER_SEQ: AtomicU64 = AtomicU64::new(0);

/// Image configuration as reported by `image inspect`.
#[derive(Debug, Default, Deserialize)]
struct ImageConfig {
    #[serde(rename = "Env", default)]
    env: Option<Vec<String>>,
    #[serde(rename = "WorkingDir", default)]
    working_dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MountArg {
    target: String,
    spec: String,
    locked_volume: Option<String>,
}

/// A container image being realized by [`DockerEngine`].
#[derive(Debug, Clone)]
pub struct DockerState {
    image: String,
    env: EnvVars,
    workdir: Option<String>,
    mounts: Vec<MountArg>,
    /// Images committed during this realization, oldest first.
    committed: Vec<String>,
}

impl DockerState {
    /// Image reference or committed image ID of the current snapshot.
    pub fn image(&self) -> &str {
        &self.image
    }

    fn mount(&mut self, arg: MountArg) {
        self.mounts.retain(|m| m.target != arg.target);
        self.mounts.push(arg);
    }
}

/// Engine that shells out to `docker` (or a compatible CLI).
#[derive(Debug, Clone)]
pub struct DockerEngine {
    program: PathBuf,
}

impl DockerEngine {
    /// Use the given CLI binary.
    pub fn new(program: impl AsRef<Path>) -> Self {
        DockerEngine {
            program: program.as_ref().to_path_buf(),
        }
    }

    /// Locate `docker` or `podman` on PATH.
    pub fn detect() -> anyhow::Result<Self> {
        let program = find_container_cli().ok_or_else(|| {
            anyhow::anyhow!(
                "no container CLI found; install docker or podman, or set GOBUILD_ENGINE"
            )
        })?;
        info!("using container engine {}", program.display());
        Ok(DockerEngine::new(program))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn cli(&self) -> ProcessBuilder {
        ProcessBuilder::new(&self.program)
    }

    fn check(&self, operation: &str, cmd: ProcessBuilder) -> Result<String> {
        cmd.exec_and_check()
            .map_err(|e| Error::engine(operation, format!("{:#}", e)))
    }

    fn inspect(&self, image: &str) -> Result<ImageConfig> {
        let json = self.check(
            "inspect image",
            self.cli()
                .args(["image", "inspect", "--format", "{{json .Config}}"])
                .arg(image),
        )?;
        let config: Option<ImageConfig> = serde_json::from_str(&json)
            .map_err(|e| Error::engine("inspect image", format!("unexpected output: {}", e)))?;
        Ok(config.unwrap_or_default())
    }

    fn container_name(&self, image: &str) -> String {
        let seq = CONTAINER_SEQ.fetch_add(1, Ordering::SeqCst);
        let mut fp = Fingerprint::new();
        fp.update_str(image)
            .update_str(&std::process::id().to_string())
            .update_str(&seq.to_string());
        format!("gobuild-{}", fp.finish_short())
    }

    fn remove(&self, container: &str) {
        if let Err(e) = self.cli().args(["rm", "-f", "-v", container]).exec_and_check() {
            warn!("failed to remove container {}: {:#}", container, e);
        }
    }

    /// Remove committed snapshots, newest first so no child outlives its parent.
    fn remove_images(&self, images: &[String]) {
        for image in images.iter().rev() {
            // Removing a child also prunes its untagged parents
            if let Err(e) = self.cli().args(["rmi", image.as_str()]).exec_and_check() {
                debug!("image {} not removed: {:#}", image, e);
            }
        }
    }

    /// Release `state` when a step fails, then return the error.
    fn abort<T>(&self, state: DockerState, err: Error) -> Result<T> {
        self.release(state);
        Err(err)
    }

    fn volume_exists(&self, name: &str) -> bool {
        self.cli()
            .args(["volume", "inspect", name])
            .exec()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Copy a seed directory into a named volume that does not exist yet.
    fn seed_volume(&self, image: &str, volume: &str, seed: &Path) -> Result<()> {
        if self.volume_exists(volume) {
            debug!("cache volume {} exists, not reseeding", volume);
            return Ok(());
        }

        info!("seeding cache volume {} from {}", volume, seed.display());
        self.check(
            "seed cache volume",
            self.cli()
                .args(["run", "--rm", "--mount"])
                .arg(format!("type=bind,source={},target=/seed,readonly", seed.display()))
                .arg("--mount")
                .arg(format!("type=volume,source={},target=/cache", volume))
                .args(["--entrypoint", "cp", image, "-a", "/seed/.", "/cache/"]),
        )?;
        Ok(())
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path).map_err(|e| {
        Error::engine(
            "mount directory",
            format!("cannot resolve {}: {}", path.display(), e),
        )
    })
}

/// Look up the locks of every `locked` volume, in name order.
fn lock_volumes(mounts: &[MountArg]) -> Vec<Arc<Mutex<()>>> {
    let mut names: Vec<&str> = mounts
        .iter()
        .filter_map(|m| m.locked_volume.as_deref())
        .collect();
    names.sort_unstable();
    names.dedup();

    // A panic elsewhere must not turn locked caches into unlocked ones
    let mut table = VOLUME_LOCKS.lock().unwrap_or_else(PoisonError::into_inner);
    names
        .into_iter()
        .map(|name| table.entry(name.to_string()).or_default().clone())
        .collect()
}

/// Hold every lock in `locks` until the guards drop.
fn hold(locks: &[Arc<Mutex<()>>]) -> Vec<MutexGuard<'_, ()>> {
    locks
        .iter()
        .map(|l| l.lock().unwrap_or_else(PoisonError::into_inner))
        .collect()
}

/// Whether `docker cp`/`podman cp` stderr reports a missing source path.
fn is_missing_path(stderr: &str) -> bool {
    let stderr = stderr.to_lowercase();
    ["no such file", "could not find", "could not be found"]
        .iter()
        .any(|needle| stderr.contains(needle))
}

impl Engine for DockerEngine {
    type State = DockerState;

    fn from_image(&self, image: &ImageRef) -> Result<DockerState> {
        let reference = image.to_string();

        let config = match self.inspect(&reference) {
            Ok(config) => config,
            Err(_) => {
                info!("pulling {}", reference);
                self.check("pull image", self.cli().args(["pull", reference.as_str()]))?;
                self.inspect(&reference)?
            }
        };

        Ok(DockerState {
            image: reference,
            env: EnvVars::from_entries(config.env.unwrap_or_default()),
            workdir: config.working_dir.filter(|w| !w.is_empty()),
            mounts: Vec::new(),
            committed: Vec::new(),
        })
    }

    fn with_env_variable(
        &self,
        mut state: DockerState,
        name: &str,
        value: &str,
        expand: bool,
    ) -> Result<DockerState> {
        state.env.set(name, value, expand);
        Ok(state)
    }

    fn with_workdir(&self, mut state: DockerState, path: &str) -> Result<DockerState> {
        state.workdir = Some(path.to_string());
        Ok(state)
    }

    fn with_mounted_directory(
        &self,
        mut state: DockerState,
        path: &str,
        source: &Directory,
    ) -> Result<DockerState> {
        let host = match absolute(source.host_path()) {
            Ok(host) => host,
            Err(e) => return self.abort(state, e),
        };
        state.mount(MountArg {
            target: path.to_string(),
            spec: format!("type=bind,source={},target={},readonly", host.display(), path),
            locked_volume: None,
        });
        Ok(state)
    }

    fn with_mounted_cache(
        &self,
        mut state: DockerState,
        mount: &CacheMount,
    ) -> Result<DockerState> {
        let name = mount.volume.name();

        if let Some(ref seed) = mount.source {
            if mount.sharing == CacheSharingMode::Private {
                warn!("seed directory ignored for private cache {}", name);
            } else {
                let seeded = absolute(seed.host_path())
                    .and_then(|seed| self.seed_volume(&state.image, name, &seed));
                if let Err(e) = seeded {
                    return self.abort(state, e);
                }
            }
        }

        let (spec, locked_volume) = match mount.sharing {
            CacheSharingMode::Shared => (
                format!("type=volume,source={},target={}", name, mount.target),
                None,
            ),
            CacheSharingMode::Locked => (
                format!("type=volume,source={},target={}", name, mount.target),
                Some(name.to_string()),
            ),
            CacheSharingMode::Private => (format!("type=volume,target={}", mount.target), None),
        };

        state.mount(MountArg {
            target: mount.target.clone(),
            spec,
            locked_volume,
        });
        Ok(state)
    }

    fn with_exec(
        &self,
        mut state: DockerState,
        args: &[String],
    ) -> Result<(DockerState, ExecOutput)> {
        let Some((entrypoint, rest)) = args.split_first() else {
            return self.abort(state, Error::engine("exec", "empty argument list"));
        };

        let name = self.container_name(&state.image);
        let mut cmd = self.cli().args(["run", "--name", name.as_str()]);
        for mount in &state.mounts {
            cmd = cmd.arg("--mount").arg(&mount.spec);
        }
        for (key, value) in state.env.iter() {
            cmd = cmd.arg("-e").arg(format!("{}={}", key, value));
        }
        if let Some(ref workdir) = state.workdir {
            cmd = cmd.arg("-w").arg(workdir);
        }
        cmd = cmd.arg("--entrypoint").arg(entrypoint).arg(&state.image).args(rest);

        let locks = lock_volumes(&state.mounts);
        let guards = hold(&locks);

        debug!("exec in {}: {}", name, args.join(" "));
        let output = match cmd.exec() {
            Ok(output) => output,
            Err(e) => {
                drop(guards);
                self.remove(&name);
                return self.abort(state, Error::engine("exec", format!("{:#}", e)));
            }
        };
        drop(guards);

        let result = ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.is_success() {
            debug!(
                "command failed in {}: exit_code={} stderr='{}'",
                name,
                result.exit_code,
                result.stderr.trim()
            );
            self.remove(&name);
            return Ok((state, result));
        }

        let committed = self.check("commit container", self.cli().args(["commit", name.as_str()]));
        self.remove(&name);
        let image = match committed {
            Ok(image) => image,
            Err(e) => return self.abort(state, e),
        };

        state.committed.push(image.clone());
        state.image = image;
        Ok((state, result))
    }

    fn read_file(&self, state: &DockerState, path: &str) -> Result<Vec<u8>> {
        let id = self.check(
            "create container",
            self.cli()
                .args(["create", "--entrypoint", "true"])
                .arg(&state.image),
        )?;

        let tmp = tempfile::TempDir::new()?;
        let dest = tmp.path().join("artifact");
        let copied = self
            .cli()
            .arg("cp")
            .arg(format!("{}:{}", id, path))
            .arg(&dest)
            .exec();
        self.remove(&id);

        let output = copied.map_err(|e| Error::engine("copy file", format!("{:#}", e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_missing_path(&stderr) {
                return Err(Error::ArtifactNotFound {
                    path: path.to_string(),
                });
            }
            return Err(Error::engine("copy file", stderr.trim().to_string()));
        }

        Ok(std::fs::read(&dest)?)
    }

    fn release(&self, state: DockerState) {
        self.remove_images(&state.committed);
    }
}
