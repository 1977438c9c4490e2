//! `gobuild selftest` command

use anyhow::Result;

use crate::cli::SelftestArgs;
use gobuild::ops::{docker_engine, selftest, SelftestOptions};
use gobuild::util::GlobalContext;

pub fn execute(args: SelftestArgs, verbose: bool) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let config = ctx.load_config();
    let engine = docker_engine(&config)?;

    let opts = SelftestOptions {
        testdata: args.testdata.map(|p| ctx.source_dir(Some(p.as_path()))),
        // Progress bar and debug logs interleave badly
        progress: !verbose,
    };

    let summary = selftest(&engine, &opts)?;
    eprintln!(
        "    Finished {} check(s) in {:.2}s",
        summary.checks,
        summary.elapsed.as_secs_f64()
    );

    Ok(())
}
