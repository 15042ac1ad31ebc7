//! `confkit dist` command

use anyhow::Result;

use crate::cli::DistArgs;
use confkit::ops::{dist, DistOptions, Project};
use confkit::GlobalContext;

pub fn execute(args: DistArgs, gctx: &GlobalContext) -> Result<()> {
    let project = Project::load(gctx)?;
    let formats = if args.install_only {
        Vec::new()
    } else {
        args.format.into_iter().map(Into::into).collect()
    };
    let install_root = args.install.map(|dir| {
        if dir.is_absolute() {
            dir
        } else {
            gctx.cwd().join(dir)
        }
    });

    let opts = DistOptions {
        formats,
        arch: args.arch,
        install_root,
    };
    for artifact in dist(&project, &opts)? {
        println!("{}", artifact.display());
    }
    Ok(())
}
