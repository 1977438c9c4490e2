//! gobuild - Immutable build environments for Go
//!
//! This crate composes containerized Go toolchain environments as immutable
//! values, renders build options into a `go build` command line, and
//! realizes the result against a container engine to retrieve artifacts.

pub mod builder;
pub mod core;
pub mod engine;
pub mod ops;
pub mod util;

/// Test utilities and a mock engine for gobuild unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides an in-memory engine and Go project fixtures.
#[cfg(test)]
pub mod test_support;

pub use builder::{BuildOptions, GoEnv, GoOptions, WithSource};
pub use core::{
    Artifact, CacheMount, CacheSharingMode, CacheVolume, Container, Directory, Error, ImageRef,
    Platform, Result,
};
pub use engine::{DockerEngine, Engine, PlanEngine};
pub use util::context::GlobalContext;
