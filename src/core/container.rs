//! Immutable container descriptions.
//!
//! A [`Container`] is a base image plus an ordered log of operations
//! (environment variables, working directory, mounts, command executions).
//! Every `with_*` method borrows `self` and returns a new value, so two
//! chains branching from the same container never observe each other.
//! Nothing runs until the container is realized against an [`Engine`].

use serde::{Deserialize, Serialize};

use crate::core::cache::{CacheMount, CacheSharingMode, CacheVolume};
use crate::core::directory::Directory;
use crate::core::error::Result;
use crate::core::image::ImageRef;
use crate::engine::{self, Engine, ExecOutput};
use crate::util::hash::Fingerprint;

/// One step in a container's operation log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    /// Set or overwrite an environment variable.
    EnvVariable {
        name: String,
        value: String,
        /// Resolve `$VAR`/`${VAR}` against the environment at this step
        expand: bool,
    },
    /// Change the working directory for later execs.
    Workdir { path: String },
    /// Mount a directory tree at a path.
    MountedDirectory { path: String, source: Directory },
    /// Mount a cache volume.
    MountedCache(CacheMount),
    /// Run a command; its filesystem effects persist into later steps.
    Exec { args: Vec<String> },
}

/// An immutable description of a container: base image plus operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Container {
    image: ImageRef,
    ops: Vec<Op>,
}

impl Container {
    /// Start from an image.
    pub fn from_image(image: impl Into<ImageRef>) -> Self {
        Container {
            image: image.into(),
            ops: Vec::new(),
        }
    }

    fn push(&self, op: Op) -> Self {
        let mut next = self.clone();
        next.ops.push(op);
        next
    }

    /// Set an environment variable.
    ///
    /// Re-setting a variable to the literal value it already holds returns
    /// an identical container.
    pub fn with_env_variable(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
        expand: bool,
    ) -> Self {
        let name = name.into();
        let value = value.into();

        if !expand && self.env_definition(&name) == Some((value.as_str(), false)) {
            return self.clone();
        }

        self.push(Op::EnvVariable {
            name,
            value,
            expand,
        })
    }

    /// Set the working directory.
    pub fn with_workdir(&self, path: impl Into<String>) -> Self {
        self.push(Op::Workdir { path: path.into() })
    }

    /// Mount a directory at `path`.
    pub fn with_mounted_directory(&self, path: impl Into<String>, source: Directory) -> Self {
        self.push(Op::MountedDirectory {
            path: path.into(),
            source,
        })
    }

    /// Mount a cache volume at `path`.
    pub fn with_mounted_cache(
        &self,
        path: impl Into<String>,
        volume: CacheVolume,
        source: Option<Directory>,
        sharing: Option<CacheSharingMode>,
    ) -> Self {
        let mount = CacheMount::new(path, volume)
            .with_source(source)
            .with_sharing(sharing);
        self.push(Op::MountedCache(mount))
    }

    /// Append a command execution.
    pub fn with_exec<I, S>(&self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(Op::Exec {
            args: args.into_iter().map(Into::into).collect(),
        })
    }

    /// The base image.
    pub fn image(&self) -> &ImageRef {
        &self.image
    }

    /// The full operation log, oldest first.
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    fn env_definition(&self, name: &str) -> Option<(&str, bool)> {
        self.ops.iter().rev().find_map(|op| match op {
            Op::EnvVariable {
                name: n,
                value,
                expand,
            } if n == name => Some((value.as_str(), *expand)),
            _ => None,
        })
    }

    /// The value most recently assigned to `name`, before any expansion.
    pub fn env_variable(&self, name: &str) -> Option<&str> {
        self.env_definition(name).map(|(value, _)| value)
    }

    /// All variables set on this container, in first-assignment order,
    /// each with its latest unexpanded value.
    pub fn env_variables(&self) -> Vec<(&str, &str)> {
        let mut vars: Vec<(&str, &str)> = Vec::new();
        for op in &self.ops {
            if let Op::EnvVariable { name, value, .. } = op {
                match vars.iter_mut().find(|(n, _)| *n == name.as_str()) {
                    Some(entry) => entry.1 = value.as_str(),
                    None => vars.push((name.as_str(), value.as_str())),
                }
            }
        }
        vars
    }

    /// The current working directory, if one was set.
    pub fn workdir(&self) -> Option<&str> {
        self.ops.iter().rev().find_map(|op| match op {
            Op::Workdir { path } => Some(path.as_str()),
            _ => None,
        })
    }

    /// Cache mounts in effect, one per target path (latest wins).
    pub fn cache_mounts(&self) -> Vec<&CacheMount> {
        let mut mounts: Vec<&CacheMount> = Vec::new();
        for op in &self.ops {
            if let Op::MountedCache(mount) = op {
                mounts.retain(|m| m.target != mount.target);
                mounts.push(mount);
            }
        }
        mounts
    }

    /// Directory mounts in effect, one per target path (latest wins).
    pub fn mounted_directories(&self) -> Vec<(&str, &Directory)> {
        let mut mounts: Vec<(&str, &Directory)> = Vec::new();
        for op in &self.ops {
            if let Op::MountedDirectory { path, source } = op {
                mounts.retain(|(p, _)| *p != path.as_str());
                mounts.push((path.as_str(), source));
            }
        }
        mounts
    }

    /// Argument vectors of every exec, oldest first.
    pub fn execs(&self) -> Vec<&[String]> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Exec { args } => Some(args.as_slice()),
                _ => None,
            })
            .collect()
    }

    /// Stable digest of the image and operation log.
    pub fn fingerprint(&self) -> String {
        let mut fp = Fingerprint::new();
        fp.update_str(&self.image.to_string());
        for op in &self.ops {
            // Serializing a plain enum of strings cannot fail
            let encoded = serde_json::to_string(op).unwrap_or_default();
            fp.update_str(&encoded);
        }
        fp.finish()
    }

    /// Realize the container and return the output of its last exec.
    pub fn sync<E: Engine>(&self, engine: &E) -> Result<ExecOutput> {
        let realized = engine::realize(engine, self)?;
        engine.release(realized.state);
        Ok(realized.last_output.unwrap_or_default())
    }

    /// Realize the container and return the last exec's stdout.
    pub fn stdout<E: Engine>(&self, engine: &E) -> Result<String> {
        Ok(self.sync(engine)?.stdout)
    }

    /// Realize the container and return the last exec's stderr.
    pub fn stderr<E: Engine>(&self, engine: &E) -> Result<String> {
        Ok(self.sync(engine)?.stderr)
    }

    /// A lazy handle to a file inside this container.
    pub fn file(&self, path: impl Into<String>) -> Artifact {
        Artifact {
            container: self.clone(),
            path: path.into(),
        }
    }
}

/// A single file produced inside a container, retrieved by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    container: Container,
    path: String,
}

impl Artifact {
    /// Path of the file inside the container.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The container that produces this file.
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Realize the producing container and read the file.
    pub fn contents<E: Engine>(&self, engine: &E) -> Result<Vec<u8>> {
        let realized = engine::realize(engine, &self.container)?;
        let contents = engine.read_file(&realized.state, &self.path);
        engine.release(realized.state);
        contents
    }

    /// Realize the producing container and write the file to `dest` on the host.
    pub fn export<E: Engine>(&self, engine: &E, dest: &std::path::Path) -> Result<()> {
        let contents = self.contents(engine)?;
        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(dest, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Error;
    use crate::test_support::MockEngine;

    #[test]
    fn test_with_methods_do_not_mutate_receiver() {
        let base = Container::from_image("golang:1.22");
        let a = base.with_env_variable("A", "1", false);
        let b = base.with_env_variable("B", "2", false);

        assert!(base.ops().is_empty());
        assert_eq!(a.env_variable("A"), Some("1"));
        assert_eq!(a.env_variable("B"), None);
        assert_eq!(b.env_variable("B"), Some("2"));
        assert_eq!(b.env_variable("A"), None);
    }

    #[test]
    fn test_env_variable_idempotent() {
        let base = Container::from_image("golang:latest");
        let once = base.with_env_variable("FOO", "bar", false);
        let twice = once.with_env_variable("FOO", "bar", false);

        assert_eq!(once, twice);
        assert_eq!(once.fingerprint(), twice.fingerprint());
    }

    #[test]
    fn test_env_variable_overwrite() {
        let c = Container::from_image("golang:latest")
            .with_env_variable("FOO", "1", false)
            .with_env_variable("BAR", "x", false)
            .with_env_variable("FOO", "2", false);

        assert_eq!(c.env_variable("FOO"), Some("2"));
        assert_eq!(c.env_variables(), vec![("FOO", "2"), ("BAR", "x")]);
    }

    #[test]
    fn test_same_transforms_same_fingerprint() {
        let build = || {
            Container::from_image("golang:latest")
                .with_workdir("/src")
                .with_mounted_cache("/cache", CacheVolume::new("c"), None, None)
                .with_exec(["go", "version"])
        };

        assert_eq!(build(), build());
        assert_eq!(build().fingerprint(), build().fingerprint());
        assert_ne!(
            build().fingerprint(),
            build().with_exec(["go", "env"]).fingerprint()
        );
    }

    #[test]
    fn test_cache_mounts_latest_wins() {
        let c = Container::from_image("golang:latest")
            .with_mounted_cache("/a", CacheVolume::new("one"), None, None)
            .with_mounted_cache("/b", CacheVolume::new("two"), None, None)
            .with_mounted_cache(
                "/a",
                CacheVolume::new("three"),
                None,
                Some(CacheSharingMode::Private),
            );

        let mounts = c.cache_mounts();
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[0].target, "/b");
        assert_eq!(mounts[1].volume.name(), "three");
        assert_eq!(mounts[1].sharing, CacheSharingMode::Private);
    }

    #[test]
    fn test_stdout_sees_env() {
        let engine = MockEngine::new();
        let out = Container::from_image("golang:latest")
            .with_env_variable("FOO", "bar", false)
            .with_exec(["sh", "-c", "echo $FOO"])
            .stdout(&engine)
            .unwrap();

        assert_eq!(out, "bar\n");
    }

    #[test]
    fn test_exec_args_are_not_expanded() {
        let engine = MockEngine::new();
        let out = Container::from_image("golang:latest")
            .with_env_variable("FOO", "bar", false)
            .with_exec(["echo", "$FOO"])
            .stdout(&engine)
            .unwrap();

        assert_eq!(out, "$FOO\n");
    }

    #[test]
    fn test_expand_resolves_at_application_time() {
        let engine = MockEngine::new();
        let out = Container::from_image("golang:latest")
            .with_env_variable("A", "one", false)
            .with_env_variable("B", "${A}-b", true)
            .with_env_variable("A", "two", false)
            .with_exec(["sh", "-c", "echo $B $A"])
            .stdout(&engine)
            .unwrap();

        assert_eq!(out, "one-b two\n");
    }

    #[test]
    fn test_failed_exec_reports_args() {
        let mut engine = MockEngine::new();
        engine.fail_on("go vet", 1, "vet: bad");

        let err = Container::from_image("golang:latest")
            .with_exec(["go", "vet", "./..."])
            .sync(&engine)
            .unwrap_err();

        match err {
            Error::Execution {
                args,
                exit_code,
                stderr,
            } => {
                assert_eq!(args, vec!["go", "vet", "./..."]);
                assert_eq!(exit_code, 1);
                assert_eq!(stderr, "vet: bad");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_artifact_missing_file() {
        let engine = MockEngine::new();
        let err = Container::from_image("golang:latest")
            .with_exec(["true"])
            .file("/nope")
            .contents(&engine)
            .unwrap_err();

        assert!(matches!(err, Error::ArtifactNotFound { ref path } if path == "/nope"));
    }
}
