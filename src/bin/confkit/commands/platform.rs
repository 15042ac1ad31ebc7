//! `confkit platform` command

use anyhow::Result;

use crate::cli::PlatformArgs;
use confkit::ops::{format_platform_report, platform_report, Project};
use confkit::probe::{CompilerChecker, ProbeContext};
use confkit::GlobalContext;

pub fn execute(args: PlatformArgs, gctx: &GlobalContext) -> Result<()> {
    // Works outside a project too; the project only adds tool overrides.
    let (config, ctx) = match Project::load(gctx) {
        Ok(project) => {
            let ctx = project.probe_context();
            (project.config, ctx)
        }
        Err(_) => (
            gctx.load_config(),
            ProbeContext::new(Box::new(CompilerChecker::detect())),
        ),
    };

    let report = platform_report(&ctx, &config);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_platform_report(&report, gctx.is_verbose()));
    }
    Ok(())
}
