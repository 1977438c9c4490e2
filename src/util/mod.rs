//! Shared utilities

pub mod config;
pub mod context;
pub mod hash;
pub mod process;

pub use config::Config;
pub use context::GlobalContext;
