//! High-level operations.
//!
//! This module contains the implementation of gobuild commands.

pub mod go_build;
pub mod selftest;

pub use go_build::{
    compose_build, compose_env, compose_exec, docker_engine, go_build, go_exec,
    resolve_build_options, BuildResult, EnvOptions, GoBuildOptions, GoExecOptions, Plan,
};
pub use selftest::{selftest, write_testdata, SelftestOptions, SelftestSummary};
