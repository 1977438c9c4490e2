//! Subprocess execution utilities.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{bail, Context, Result};

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Execute the command and wait for completion, capturing output.
    pub fn exec(&self) -> Result<Output> {
        tracing::debug!("running `{}`", self.display_command());

        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        Ok(output)
    }

    /// Execute and require success; returns trimmed stdout.
    pub fn exec_and_check(&self) -> Result<String> {
        let output = self.exec()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "`{}` failed with exit code {:?}\n{}",
                self.display_command(),
                output.status.code(),
                stderr.trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find a docker-compatible container CLI.
pub fn find_container_cli() -> Option<PathBuf> {
    // Check GOBUILD_ENGINE environment variable first
    if let Ok(engine) = std::env::var("GOBUILD_ENGINE") {
        if let Some(path) = find_executable(&engine) {
            return Some(path);
        }
    }

    for cli in &["docker", "podman"] {
        if let Some(path) = find_executable(cli) {
            return Some(path);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn test_process_builder() {
        let stdout = ProcessBuilder::new("echo").arg("hello").exec_and_check().unwrap();
        assert_eq!(stdout, "hello");
    }

    #[test]
    #[cfg(unix)]
    fn test_exec_and_check_reports_failure() {
        let err = ProcessBuilder::new("sh")
            .args(["-c", "echo oops >&2; exit 3"])
            .exec_and_check()
            .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("Some(3)"));
        assert!(msg.contains("oops"));
    }

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("docker").args(["run", "--rm", "golang:latest"]);

        assert_eq!(pb.display_command(), "docker run --rm golang:latest");
        assert_eq!(pb.get_args().len(), 3);
    }
}
