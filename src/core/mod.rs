//! Core data structures for gobuild.
//!
//! This module contains the leaf types the environment composer is built on:
//! - Target platforms (`os/arch[/variant]`)
//! - Cache volumes, sharing modes and mounts
//! - Image references and source directories
//! - The immutable [`Container`] operation log

pub mod cache;
pub mod container;
pub mod directory;
pub mod error;
pub mod image;
pub mod platform;

pub use cache::{
    CacheMount, CacheSharingMode, CacheVolume, BUILD_CACHE_PATH, DEFAULT_BUILD_CACHE_VOLUME,
    DEFAULT_MODULE_CACHE_VOLUME, MODULE_CACHE_PATH,
};
pub use container::{Artifact, Container, Op};
pub use directory::Directory;
pub use error::{Error, Result};
pub use image::ImageRef;
pub use platform::Platform;
