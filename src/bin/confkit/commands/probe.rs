//! `confkit probe` command

use anyhow::Result;

use crate::cli::ProbeArgs;
use confkit::ops::{format_probe_report, probe, probe_json, ProbeOptions, Project};
use confkit::GlobalContext;

pub fn execute(args: ProbeArgs, gctx: &GlobalContext) -> Result<()> {
    let project = Project::load(gctx)?;
    let opts = ProbeOptions {
        args: args.settings,
        save: !args.no_save,
    };

    let outcome = probe(&project, &opts)?;
    if args.json {
        println!("{}", probe_json(&outcome)?);
    } else {
        print!("{}", format_probe_report(&outcome));
    }
    Ok(())
}
