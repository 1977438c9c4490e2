//! Implementation of `gobuild selftest`.
//!
//! Runs end-to-end checks of the environment composer against a real
//! engine. Checks are independent and run in parallel; the run fails with
//! the first failure observed.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tempfile::TempDir;
use tracing::{debug, info};

use crate::builder::{BuildOptions, GoEnv};
use crate::core::container::Container;
use crate::core::directory::Directory;
use crate::engine::Engine;

const GO_MOD: &str = "module example.com/selftest\n\ngo 1.21\n";

const MAIN_GO: &str = r#"package main

func main() {
	println("hello")
}
"#;

const MAIN_TEST_GO: &str = r#"package main

import "testing"

func TestHello(t *testing.T) {
	t.Log("hello")
}
"#;

/// Options for the self-test.
#[derive(Debug, Clone, Default)]
pub struct SelftestOptions {
    /// Go module to test with; a built-in one is used when unset
    pub testdata: Option<PathBuf>,

    /// Show a progress bar
    pub progress: bool,
}

/// Outcome of a successful self-test.
#[derive(Debug, Clone)]
pub struct SelftestSummary {
    pub checks: usize,
    pub elapsed: Duration,
}

type CheckFn<E> = fn(&E, &Directory) -> Result<()>;

struct Check<E> {
    name: &'static str,
    run: CheckFn<E>,
}

fn checks<E: Engine>() -> Vec<Check<E>> {
    vec![
        Check { name: "default container", run: default_container },
        Check { name: "custom version", run: custom_version },
        Check { name: "custom image", run: custom_image },
        Check { name: "custom container", run: custom_container },
        Check { name: "env variable", run: env_variable },
        Check { name: "env variable on version", run: env_variable_on_version },
        Check { name: "env variable with source", run: env_variable_with_source },
        Check { name: "build and run", run: build_and_run },
        Check { name: "build artifact", run: build_artifact },
        Check { name: "test", run: go_test },
    ]
}

fn expect_output(what: &str, wanted: &str, got: &str) -> Result<()> {
    if got != wanted {
        bail!("unexpected {}: wanted {:?}, got {:?}", what, wanted, got);
    }
    Ok(())
}

fn default_container<E: Engine>(engine: &E, _src: &Directory) -> Result<()> {
    GoEnv::default().exec(["go", "version"], None, "")?.sync(engine)?;
    Ok(())
}

fn custom_version<E: Engine>(engine: &E, _src: &Directory) -> Result<()> {
    GoEnv::from_version("latest")
        .exec(["go", "version"], None, "")?
        .sync(engine)?;
    Ok(())
}

fn custom_image<E: Engine>(engine: &E, _src: &Directory) -> Result<()> {
    GoEnv::from_image("golang:latest")
        .exec(["go", "version"], None, "")?
        .sync(engine)?;
    Ok(())
}

fn custom_container<E: Engine>(engine: &E, _src: &Directory) -> Result<()> {
    GoEnv::from_container(Container::from_image("golang:latest"))
        .exec(["go", "version"], None, "")?
        .sync(engine)?;
    Ok(())
}

fn env_variable<E: Engine>(engine: &E, _src: &Directory) -> Result<()> {
    let out = GoEnv::default()
        .with_env_variable("FOO", "bar", false)
        .exec(["bash", "-c", "echo $FOO"], None, "")?
        .stdout(engine)?;
    expect_output("output", "bar\n", &out)
}

fn env_variable_on_version<E: Engine>(engine: &E, _src: &Directory) -> Result<()> {
    let out = GoEnv::from_version("latest")
        .with_env_variable("FOO", "bar", false)
        .exec(["bash", "-c", "echo $FOO"], None, "")?
        .stdout(engine)?;
    expect_output("output", "bar\n", &out)
}

fn env_variable_with_source<E: Engine>(engine: &E, src: &Directory) -> Result<()> {
    let out = GoEnv::from_version("latest")
        .with_source(src.clone())
        .with_env_variable("FOO", "bar", false)
        .exec(["bash", "-c", "echo $FOO"], "")?
        .stdout(engine)?;
    expect_output("output", "bar\n", &out)
}

fn build_and_run<E: Engine>(engine: &E, src: &Directory) -> Result<()> {
    let ctr = GoEnv::default().exec(["go", "build", "-o", "/app", "."], Some(src.clone()), "")?;
    ctr.sync(engine)?;

    let out = ctr.with_exec(["/app"]).stderr(engine)?;
    expect_output("output", "hello\n", &out)
}

fn build_artifact<E: Engine>(engine: &E, src: &Directory) -> Result<()> {
    let binary = GoEnv::default()
        .build(src.clone(), &BuildOptions::new().pkg(".").trimpath(true))?
        .contents(engine)?;
    if binary.is_empty() {
        bail!("built binary is empty");
    }
    Ok(())
}

fn go_test<E: Engine>(engine: &E, src: &Directory) -> Result<()> {
    let out = GoEnv::default()
        .with_source(src.clone())
        .exec(["go", "test", "-v"], "")?
        .stdout(engine)?;
    if !out.contains("hello") {
        bail!("unexpected output to contain \"hello\", got {:?}", out);
    }
    Ok(())
}

/// Write the built-in test module into `dir`.
pub fn write_testdata(dir: &Path) -> Result<()> {
    let files = [
        ("go.mod", GO_MOD),
        ("main.go", MAIN_GO),
        ("main_test.go", MAIN_TEST_GO),
    ];
    for (name, contents) in files {
        std::fs::write(dir.join(name), contents)
            .with_context(|| format!("failed to write {}", dir.join(name).display()))?;
    }
    Ok(())
}

/// Run every check against `engine`.
pub fn selftest<E: Engine + Sync>(engine: &E, opts: &SelftestOptions) -> Result<SelftestSummary> {
    let start = Instant::now();

    // Keeps the generated module alive until all checks finish
    let _scratch;
    let testdata = match opts.testdata {
        Some(ref dir) => dir.clone(),
        None => {
            let tmp = TempDir::new().context("failed to create test module")?;
            write_testdata(tmp.path())?;
            let path = tmp.path().to_path_buf();
            _scratch = tmp;
            path
        }
    };
    if !testdata.is_dir() {
        bail!("test module not found: {}", testdata.display());
    }
    let src = Directory::host(&testdata);

    let checks = checks::<E>();
    info!("running {} checks", checks.len());

    let pb = if opts.progress {
        let pb = ProgressBar::new(checks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let result = checks.par_iter().try_for_each(|check| {
        debug!("check `{}` started", check.name);
        let outcome =
            (check.run)(engine, &src).with_context(|| format!("check `{}` failed", check.name));
        if let Some(ref pb) = pb {
            pb.set_message(check.name);
            pb.inc(1);
        }
        outcome
    });

    if let Some(pb) = pb {
        match result {
            Ok(()) => pb.finish_with_message("done"),
            Err(_) => pb.abandon_with_message("failed"),
        }
    }
    result?;

    Ok(SelftestSummary {
        checks: checks.len(),
        elapsed: start.elapsed(),
    })
}
