//! `gobuild plan` command
//!
//! Prints the composed build container, its fingerprint and the rendered
//! steps as JSON. Nothing is executed and no engine is required.

use anyhow::{Context, Result};

use crate::cli::PlanArgs;
use gobuild::ops::{compose_build, Plan};
use gobuild::util::GlobalContext;

pub fn execute(args: PlanArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let config = ctx.load_config();

    let opts = super::build_options(&ctx, &args.flags);
    let artifact = compose_build(&config, &opts)?;
    let plan = Plan::of(artifact.container())?;

    let json = serde_json::to_string_pretty(&plan).context("failed to serialize plan")?;
    println!("{}", json);

    Ok(())
}
