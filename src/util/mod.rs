//! Shared utilities

use regex::Regex;

pub mod config;
pub mod context;
pub mod diagnostic;
pub mod fs;
pub mod platform;
pub mod process;
pub mod version;

pub use config::Config;
pub use context::GlobalContext;
pub use diagnostic::Diagnostic;
pub use platform::{Arch, Platform};
pub use version::DottedVersion;

/// Compile one of the crate's fixed patterns, for use in `LazyLock` statics.
pub(crate) fn compile_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in patterns are valid regexes")
}
