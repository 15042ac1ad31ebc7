//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use confkit::ops::DistFormat;

/// confkit - probe for C/C++ libraries and package the results
#[derive(Parser)]
#[command(name = "confkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a Confkit.toml in a directory
    Init(InitArgs),

    /// Probe for every declared option and save the settings
    Probe(ProbeArgs),

    /// Show help for every option with its current value
    Options(OptionsArgs),

    /// List the variant combinations to build
    Variants(VariantsArgs),

    /// Install the package and build distributable archives
    Dist(DistArgs),

    /// Show the detected platform, architectures and tools
    Platform(PlatformArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Project name (defaults to directory name)
    #[arg(long)]
    pub name: Option<String>,

    /// Directory to initialize (defaults to current directory)
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct ProbeArgs {
    /// Settings overrides
    #[arg(value_name = "KEY=VALUE")]
    pub settings: Vec<String>,

    /// Print the results as JSON
    #[arg(long)]
    pub json: bool,

    /// Do not write the settings cache
    #[arg(long)]
    pub no_save: bool,
}

#[derive(Args)]
pub struct OptionsArgs {
    /// Settings overrides
    #[arg(value_name = "KEY=VALUE")]
    pub settings: Vec<String>,

    /// Wrap help at this width (defaults to the terminal width)
    #[arg(long)]
    pub width: Option<usize>,
}

#[derive(Args)]
pub struct VariantsArgs {
    /// Settings overrides, e.g. var_type=debug
    #[arg(value_name = "KEY=VALUE")]
    pub settings: Vec<String>,

    /// Print the combinations as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FormatArg {
    /// Binary tarball of the installed tree
    Targz,
    /// Binary rpm via rpmbuild
    Rpm,
    /// Source tarball
    Source,
    /// pkg-config file
    Pc,
}

impl From<FormatArg> for DistFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Targz => DistFormat::TarGz,
            FormatArg::Rpm => DistFormat::Rpm,
            FormatArg::Source => DistFormat::Source,
            FormatArg::Pc => DistFormat::Pc,
        }
    }
}

#[derive(Args)]
pub struct DistArgs {
    /// Distribution formats to build
    #[arg(short, long, value_enum, default_value = "targz")]
    pub format: Vec<FormatArg>,

    /// Also install the package below this directory
    #[arg(long, value_name = "DIR")]
    pub install: Option<PathBuf>,

    /// Only install, build no archives
    #[arg(long, requires = "install")]
    pub install_only: bool,

    /// rpm architecture (defaults to the host's)
    #[arg(long)]
    pub arch: Option<String>,
}

#[derive(Args)]
pub struct PlatformArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
