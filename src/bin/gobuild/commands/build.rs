//! `gobuild build` command

use anyhow::Result;

use crate::cli::BuildArgs;
use gobuild::ops::{compose_build, docker_engine, go_build, Plan};
use gobuild::util::GlobalContext;

pub fn execute(args: BuildArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;

    // Load configuration (global + project)
    let config = ctx.load_config();

    let mut opts = super::build_options(&ctx, &args.flags);
    opts.output = args.output;

    if args.dry_run {
        let artifact = compose_build(&config, &opts)?;
        let plan = Plan::of(artifact.container())?;
        for step in &plan.steps {
            println!("{}", step);
        }
        println!("# artifact {}", artifact.path());
        return Ok(());
    }

    let engine = docker_engine(&config)?;
    let result = go_build(&engine, &config, &opts)?;

    match result.output {
        Some(path) => eprintln!("    Finished {}", path.display()),
        None => eprintln!(
            "    Finished {} (use --output to export it)",
            result.artifact.path()
        ),
    }

    Ok(())
}
