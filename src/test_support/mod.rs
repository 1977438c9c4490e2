//! Test utilities and a mock engine for unit tests.
//!
//! [`MockEngine`] realizes containers in memory. It emulates just enough of
//! a shell to make environment behavior observable: `sh -c`/`bash -c` with an
//! `echo` script prints it with `$VAR` references expanded, a bare `echo`
//! prints its arguments literally (there is no shell to expand them), and any
//! command carrying `-o <path>` produces a file at that path.
//!
//! # Example
//!
//! ```rust,ignore
//! use gobuild::test_support::{MockEngine, CommandPattern};
//!
//! let mut engine = MockEngine::new();
//! engine.fail_on("go vet", 1, "vet failed");
//! engine.expect(CommandPattern::StartsWith("go version".into()), ExecOutput::success("go1.22"));
//! ```

use std::collections::HashMap;
use std::sync::Mutex;

use tempfile::TempDir;

use crate::core::cache::CacheMount;
use crate::core::directory::Directory;
use crate::core::error::{Error, Result};
use crate::core::image::ImageRef;
use crate::engine::{EnvVars, Engine, ExecOutput};

/// Pattern for matching an exec's space-joined argument vector.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on the full command string.
    Exact(String),
    /// Match if the command starts with the prefix.
    StartsWith(String),
    /// Match if the command contains the substring.
    Contains(String),
}

impl CommandPattern {
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s.as_str()),
            CommandPattern::Contains(s) => cmd.contains(s.as_str()),
        }
    }
}

/// In-memory container state for [`MockEngine`].
#[derive(Debug, Clone)]
pub struct MockState {
    pub image: ImageRef,
    pub env: EnvVars,
    pub workdir: Option<String>,
    pub directories: Vec<(String, Directory)>,
    pub caches: Vec<CacheMount>,
    pub files: HashMap<String, Vec<u8>>,
}

/// An engine that never leaves the process.
#[derive(Debug, Default)]
pub struct MockEngine {
    expectations: Vec<(CommandPattern, ExecOutput)>,
    calls: Mutex<Vec<String>>,
}

impl MockEngine {
    pub fn new() -> Self {
        MockEngine::default()
    }

    /// Return `output` for execs matching `pattern` (first match wins).
    pub fn expect(&mut self, pattern: CommandPattern, output: ExecOutput) -> &mut Self {
        self.expectations.push((pattern, output));
        self
    }

    /// Make execs starting with `prefix` exit with `code`.
    pub fn fail_on(&mut self, prefix: &str, code: i32, stderr: &str) -> &mut Self {
        self.expect(
            CommandPattern::StartsWith(prefix.to_string()),
            ExecOutput {
                exit_code: code,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        )
    }

    /// Every primitive invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn emulate(&self, state: &mut MockState, args: &[String]) -> ExecOutput {
        let cmd = args.join(" ");
        if let Some((_, output)) = self.expectations.iter().find(|(p, _)| p.matches(&cmd)) {
            return output.clone();
        }

        if let Some(pos) = args.iter().position(|a| a == "-o") {
            if let Some(path) = args.get(pos + 1) {
                state.files.insert(path.clone(), cmd.clone().into_bytes());
            }
        }

        match args.first().map(String::as_str) {
            Some("echo") => ExecOutput::success(format!("{}\n", args[1..].join(" "))),
            Some("sh") | Some("bash") if args.get(1).map(String::as_str) == Some("-c") => {
                let script = args.get(2).cloned().unwrap_or_default();
                match script.strip_prefix("echo ") {
                    Some(rest) => ExecOutput::success(format!("{}\n", state.env.expand(rest))),
                    None => ExecOutput::default(),
                }
            }
            _ => ExecOutput::default(),
        }
    }
}

impl Engine for MockEngine {
    type State = MockState;

    fn from_image(&self, image: &ImageRef) -> Result<MockState> {
        self.record(format!("from {}", image));
        Ok(MockState {
            image: image.clone(),
            env: EnvVars::from_entries(["PATH=/usr/local/go/bin:/usr/bin:/bin"]),
            workdir: None,
            directories: Vec::new(),
            caches: Vec::new(),
            files: HashMap::new(),
        })
    }

    fn with_env_variable(
        &self,
        mut state: MockState,
        name: &str,
        value: &str,
        expand: bool,
    ) -> Result<MockState> {
        self.record(format!("env {}={}", name, value));
        state.env.set(name, value, expand);
        Ok(state)
    }

    fn with_workdir(&self, mut state: MockState, path: &str) -> Result<MockState> {
        self.record(format!("workdir {}", path));
        state.workdir = Some(path.to_string());
        Ok(state)
    }

    fn with_mounted_directory(
        &self,
        mut state: MockState,
        path: &str,
        source: &Directory,
    ) -> Result<MockState> {
        self.record(format!("mount {} -> {}", source, path));
        state.directories.retain(|(p, _)| p != path);
        state.directories.push((path.to_string(), source.clone()));
        Ok(state)
    }

    fn with_mounted_cache(&self, mut state: MockState, mount: &CacheMount) -> Result<MockState> {
        self.record(format!(
            "cache {} -> {} ({})",
            mount.volume.name(),
            mount.target,
            mount.sharing
        ));
        state.caches.retain(|m| m.target != mount.target);
        state.caches.push(mount.clone());
        Ok(state)
    }

    fn with_exec(&self, mut state: MockState, args: &[String]) -> Result<(MockState, ExecOutput)> {
        self.record(format!("exec {}", args.join(" ")));
        let output = self.emulate(&mut state, args);
        Ok((state, output))
    }

    fn read_file(&self, state: &MockState, path: &str) -> Result<Vec<u8>> {
        self.record(format!("read {}", path));
        state
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| Error::ArtifactNotFound {
                path: path.to_string(),
            })
    }
}

/// Create a temporary Go module with a `main` package printing `hello`.
pub fn create_go_project() -> TempDir {
    let tmp = TempDir::new().expect("failed to create temp dir");
    std::fs::write(tmp.path().join("go.mod"), "module example.com/hello\n\ngo 1.21\n")
        .expect("failed to write go.mod");
    std::fs::write(
        tmp.path().join("main.go"),
        "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(\"hello\")\n}\n",
    )
    .expect("failed to write main.go");
    tmp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::container::Container;

    #[test]
    fn test_command_pattern() {
        assert!(CommandPattern::Exact("go version".into()).matches("go version"));
        assert!(!CommandPattern::Exact("go".into()).matches("go version"));
        assert!(CommandPattern::StartsWith("go".into()).matches("go version"));
        assert!(CommandPattern::Contains("vers".into()).matches("go version"));
    }

    #[test]
    fn test_mock_sh_echo() {
        let engine = MockEngine::new();
        let out = Container::from_image("golang:latest")
            .with_env_variable("FOO", "bar", false)
            .with_exec(["bash", "-c", "echo $FOO"])
            .stdout(&engine)
            .unwrap();

        assert_eq!(out, "bar\n");
    }

    #[test]
    fn test_mock_bare_echo_is_literal() {
        let engine = MockEngine::new();
        let out = Container::from_image("golang:latest")
            .with_env_variable("FOO", "bar", false)
            .with_exec(["echo", "$FOO"])
            .stdout(&engine)
            .unwrap();

        assert_eq!(out, "$FOO\n");
    }

    #[test]
    fn test_mock_expectation_overrides_emulation() {
        let mut engine = MockEngine::new();
        engine.expect(
            CommandPattern::Exact("go version".into()),
            ExecOutput::success("go version go1.22.0 linux/amd64\n"),
        );

        let out = Container::from_image("golang:latest")
            .with_exec(["go", "version"])
            .stdout(&engine)
            .unwrap();

        assert!(out.starts_with("go version go1.22.0"));
    }

    #[test]
    fn test_go_project_fixture() {
        let project = create_go_project();
        assert!(project.path().join("go.mod").exists());
        assert!(project.path().join("main.go").exists());
    }
}
