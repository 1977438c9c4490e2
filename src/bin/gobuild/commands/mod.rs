//! Command implementations

pub mod build;
pub mod completions;
pub mod exec;
pub mod plan;
pub mod selftest;

use gobuild::builder::BuildOptions;
use gobuild::ops::{EnvOptions, GoBuildOptions};
use gobuild::util::GlobalContext;

use crate::cli::{BuildFlags, EnvArgs};

/// Map environment flags to operation options.
pub fn env_options(args: &EnvArgs) -> EnvOptions {
    let cgo = match (args.cgo, args.no_cgo) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    };

    EnvOptions {
        image: args.image.clone(),
        version: args.go_version.clone(),
        no_cache: args.no_cache,
        cgo,
        env: args.env.clone(),
    }
}

/// Map build flags to operation options, resolving the source directory.
pub fn build_options(ctx: &GlobalContext, flags: &BuildFlags) -> GoBuildOptions {
    let mut build = BuildOptions::new()
        .tags(flags.tags.iter().filter(|t| !t.is_empty()).cloned())
        .trimpath(flags.trimpath)
        .raw_args(flags.raw_args.iter().cloned());
    if let Some(ref pkg) = flags.pkg {
        build = build.pkg(pkg.clone());
    }
    if let Some(ref platform) = flags.platform {
        build = build.platform(platform.clone());
    }

    GoBuildOptions {
        env: env_options(&flags.env),
        source: ctx.source_dir(flags.source.as_deref()),
        build,
        output: None,
    }
}
