//! `confkit variants` command

use anyhow::Result;

use crate::cli::VariantsArgs;
use confkit::ops::{format_variants, variant_builds, Project};
use confkit::GlobalContext;

pub fn execute(args: VariantsArgs, gctx: &GlobalContext) -> Result<()> {
    let project = Project::load(gctx)?;
    let ctx = project.probe_context();

    let builds = variant_builds(&project, &ctx, &args.settings)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&builds)?);
    } else {
        print!("{}", format_variants(&builds, gctx.is_verbose()));
    }
    Ok(())
}
