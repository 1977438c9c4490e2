//! `gobuild exec` command

use std::io::Write;

use anyhow::Result;

use crate::cli::ExecArgs;
use gobuild::ops::{compose_exec, docker_engine, go_exec, GoExecOptions, Plan};
use gobuild::util::GlobalContext;

pub fn execute(args: ExecArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let config = ctx.load_config();

    let opts = GoExecOptions {
        env: super::env_options(&args.env),
        source: args.source.map(|s| ctx.source_dir(Some(s.as_path()))),
        platform: args.platform,
        args: args.args,
    };

    if args.dry_run {
        let plan = Plan::of(&compose_exec(&config, &opts)?)?;
        for step in &plan.steps {
            println!("{}", step);
        }
        return Ok(());
    }

    let engine = docker_engine(&config)?;
    let output = go_exec(&engine, &config, &opts)?;

    std::io::stdout().write_all(output.stdout.as_bytes())?;
    std::io::stderr().write_all(output.stderr.as_bytes())?;

    Ok(())
}
