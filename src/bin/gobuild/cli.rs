//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// gobuild - Build Go programs in immutable container environments
#[derive(Parser)]
#[command(name = "gobuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a binary from a Go module
    Build(BuildArgs),

    /// Run a command in the Go environment
    Exec(ExecArgs),

    /// Print the composed build container as JSON without running it
    Plan(PlanArgs),

    /// Check the environment end to end against the container engine
    Selftest(SelftestArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Options that shape the environment.
#[derive(Args, Debug, Clone)]
pub struct EnvArgs {
    /// Full base image reference (e.g. golang:1.22-alpine)
    #[arg(long, conflicts_with = "go_version")]
    pub image: Option<String>,

    /// Tag of the official golang image (e.g. 1.22)
    #[arg(long)]
    pub go_version: Option<String>,

    /// Do not mount the module and build cache volumes
    #[arg(long)]
    pub no_cache: bool,

    /// Set CGO_ENABLED=1
    #[arg(long, conflicts_with = "no_cgo")]
    pub cgo: bool,

    /// Set CGO_ENABLED=0
    #[arg(long)]
    pub no_cgo: bool,

    /// Set an environment variable (KEY=VALUE, repeatable)
    #[arg(short, long = "env", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub env: Vec<(String, String)>,
}

/// Options that shape a `go build`.
#[derive(Args, Debug, Clone)]
pub struct BuildFlags {
    /// Source directory (defaults to the enclosing module)
    pub source: Option<PathBuf>,

    /// Package to compile (e.g. ./cmd/server)
    #[arg(long)]
    pub pkg: Option<String>,

    /// Build tags, comma separated
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Remove file system paths from the binary
    #[arg(long)]
    pub trimpath: bool,

    /// Target platform (os/arch[/variant], e.g. linux/arm64/v7)
    #[arg(long, env = "GOBUILD_PLATFORM")]
    pub platform: Option<String>,

    /// Extra argument for go build (repeatable)
    #[arg(long = "raw-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub raw_args: Vec<String>,

    #[command(flatten)]
    pub env: EnvArgs,
}

#[derive(Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub flags: BuildFlags,

    /// Write the binary to this path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the steps that would run instead of running them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct ExecArgs {
    /// Mount this source directory and run in it
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Target platform (os/arch[/variant])
    #[arg(long, env = "GOBUILD_PLATFORM")]
    pub platform: Option<String>,

    /// Print the steps that would run instead of running them
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub env: EnvArgs,

    /// Command and arguments
    #[arg(last = true, required = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub flags: BuildFlags,
}

#[derive(Args)]
pub struct SelftestArgs {
    /// Go module to test with (a built-in module is used by default)
    #[arg(long)]
    pub testdata: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("invalid KEY=VALUE: no `=` found in `{}`", s)),
    }
}
