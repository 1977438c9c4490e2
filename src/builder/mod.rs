//! Go build environments.
//!
//! This module composes containers for running the Go toolchain and turns
//! build options into a `go build` invocation.

pub mod build;
pub mod go;
pub mod with_source;

pub use build::{BuildOptions, BINARY_PATH};
pub use go::{GoEnv, GoOptions, SOURCE_WORKDIR};
pub use with_source::WithSource;
