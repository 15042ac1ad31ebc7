//! confkit CLI - probe for C/C++ libraries and package the results

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use confkit::util::diagnostic;
use confkit::{GlobalContext, OptionError};

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color;

    if let Err(e) = run(cli) {
        // Option failures carry their own hints
        match e.chain().find_map(|c| c.downcast_ref::<OptionError>()) {
            Some(option_err) => diagnostic::emit(&option_err.to_diagnostic(), color),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("confkit=debug")
    } else {
        EnvFilter::new("confkit=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let mut gctx = GlobalContext::new()?;
    gctx.set_verbose(cli.verbose);
    gctx.set_color(!cli.no_color);

    // Execute command
    match cli.command {
        Commands::Init(args) => commands::init::execute(args, &gctx),
        Commands::Probe(args) => commands::probe::execute(args, &gctx),
        Commands::Options(args) => commands::options::execute(args, &gctx),
        Commands::Variants(args) => commands::variants::execute(args, &gctx),
        Commands::Dist(args) => commands::dist::execute(args, &gctx),
        Commands::Platform(args) => commands::platform::execute(args, &gctx),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
