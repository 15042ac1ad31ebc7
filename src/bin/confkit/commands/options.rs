//! `confkit options` command

use anyhow::Result;
use terminal_size::{terminal_size, Width};

use crate::cli::OptionsArgs;
use confkit::core::registry::DEFAULT_HELP_WIDTH;
use confkit::ops::{options_help, Project};
use confkit::GlobalContext;

pub fn execute(args: OptionsArgs, gctx: &GlobalContext) -> Result<()> {
    let project = Project::load(gctx)?;
    let width = args.width.unwrap_or_else(|| {
        terminal_size()
            .map(|(Width(w), _)| w as usize)
            .unwrap_or(DEFAULT_HELP_WIDTH)
    });

    print!("{}", options_help(&project, &args.settings, width)?);
    Ok(())
}
