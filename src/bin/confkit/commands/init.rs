//! `confkit init` command

use anyhow::Result;

use crate::cli::InitArgs;
use confkit::ops::init_project;
use confkit::GlobalContext;

pub fn execute(args: InitArgs, gctx: &GlobalContext) -> Result<()> {
    let path = match args.path {
        Some(path) if path.is_absolute() => path,
        Some(path) => gctx.cwd().join(path),
        None => gctx.cwd().to_path_buf(),
    };
    init_project(&path, args.name.as_deref())?;
    println!("Created Confkit.toml in {}", path.display());
    Ok(())
}
