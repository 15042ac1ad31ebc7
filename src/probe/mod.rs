//! Probing the host: helper-tool parsers and trial builds.
//!
//! Everything an option needs to look at the machine travels in a
//! [`ProbeContext`], so options never consult global state.

pub mod checker;
pub mod parser;

pub use checker::{
    check_header, check_lib, check_lib_with_header, detect_valid_archs, Checker,
    CompilerChecker, Lang,
};
pub use parser::{ConfigCmdParser, FlagExtractor, FlagSource, FlagSyntax, PkgConfigParser};

use crate::util::platform::{Arch, Platform};

/// Host facts and tools shared by every option during processing.
#[derive(Debug)]
pub struct ProbeContext {
    platform: Platform,
    arch: Arch,
    verbose: bool,
    pkg_config: String,
    checker: Box<dyn Checker>,
}

impl ProbeContext {
    /// Context for the host platform using the given checker.
    pub fn new(checker: Box<dyn Checker>) -> Self {
        ProbeContext {
            platform: Platform::host(),
            arch: Arch::host(),
            verbose: false,
            pkg_config: "pkg-config".to_string(),
            checker,
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_arch(mut self, arch: Arch) -> Self {
        self.arch = arch;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// pkg-config compatible tool used by pkg-config based options.
    pub fn with_pkg_config(mut self, tool: impl Into<String>) -> Self {
        self.pkg_config = tool.into();
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn pkg_config(&self) -> &str {
        &self.pkg_config
    }

    pub fn checker(&self) -> &dyn Checker {
        self.checker.as_ref()
    }

    pub fn flag_syntax(&self) -> FlagSyntax {
        FlagSyntax::for_platform(self.platform)
    }
}
