//! Compiler settings for one build, rendered as flags.
//!
//! An [`EnvBuilder`] records debug, optimization and warning levels plus a
//! handful of switches (exceptions, RTTI, profiling, the MSVC runtime, the
//! target architecture). [`EnvBuilder::apply`] turns them into `CCFLAGS`,
//! `CXXFLAGS`, `CPPDEFINES` and `LINKFLAGS` in the spelling of the
//! platform's compiler family.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::core::env::{keys, BuildEnv};
use crate::core::errors::OptionError;
use crate::core::registry::OptionRegistry;
use crate::options::{parse_bool, BoolOption, EnumOption, SeparatorOption, SimpleOption};
use crate::probe::FlagSyntax;
use crate::util::compile_regex;
use crate::util::platform::{Arch, Platform};

static DARWIN_SDK_VERSION: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"MacOSX(10\..*?)u?\.sdk"));

/// How much of something to turn on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    #[default]
    None,
    Minimal,
    Standard,
    Extensive,
    Maximum,
}

impl Level {
    pub const NAMES: [&'static str; 5] = ["none", "minimal", "standard", "extensive", "maximum"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::None => "none",
            Level::Minimal => "minimal",
            Level::Standard => "standard",
            Level::Extensive => "extensive",
            Level::Maximum => "maximum",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Level::None),
            "minimal" => Ok(Level::Minimal),
            "standard" => Ok(Level::Standard),
            "extensive" => Ok(Level::Extensive),
            "maximum" => Ok(Level::Maximum),
            other => Err(format!("unknown level: {}", other)),
        }
    }
}

/// Modifiers for the optimization level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptTag {
    ReduceSize,
    FastMath,
}

/// Modifiers for the warning level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarnTag {
    AsError,
    Strict,
}

/// MSVC C runtime flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsvcRuntime {
    MultiThreadedDll,
    MultiThreadedDebugDll,
    MultiThreaded,
    MultiThreadedDebug,
}

impl MsvcRuntime {
    pub fn flag(&self) -> &'static str {
        match self {
            MsvcRuntime::MultiThreadedDll => "/MD",
            MsvcRuntime::MultiThreadedDebugDll => "/MDd",
            MsvcRuntime::MultiThreaded => "/MT",
            MsvcRuntime::MultiThreadedDebug => "/MTd",
        }
    }
}

/// Flags produced by an [`EnvBuilder`] for one platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompilerFlags {
    pub ccflags: Vec<String>,
    pub cxxflags: Vec<String>,
    pub cppdefines: Vec<String>,
    pub linkflags: Vec<String>,
    pub arflags: Vec<String>,
}

impl CompilerFlags {
    fn cc<I: IntoIterator<Item = S>, S: Into<String>>(&mut self, flags: I) {
        self.ccflags.extend(flags.into_iter().map(Into::into));
    }

    fn cxx<I: IntoIterator<Item = S>, S: Into<String>>(&mut self, flags: I) {
        self.cxxflags.extend(flags.into_iter().map(Into::into));
    }

    fn link<I: IntoIterator<Item = S>, S: Into<String>>(&mut self, flags: I) {
        self.linkflags.extend(flags.into_iter().map(Into::into));
    }

    fn define(&mut self, define: &str) {
        if !self.cppdefines.iter().any(|d| d == define) {
            self.cppdefines.push(define.to_string());
        }
    }
}

/// Compiler settings for a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvBuilder {
    platform: Platform,
    debug_level: Level,
    opt_level: Level,
    opt_tags: Vec<OptTag>,
    warning_level: Level,
    warning_tags: Vec<WarnTag>,
    profiling: bool,
    exceptions: bool,
    structured_exceptions: bool,
    rtti: bool,
    cpu_arch: Option<Arch>,
    msvc_runtime: Option<MsvcRuntime>,
    darwin_universal: bool,
    darwin_sdk: Option<String>,

    // Levels used when a setting is enabled without an explicit level
    default_debug_level: Level,
    default_opt_level: Level,
    default_warning_level: Level,
}

impl Default for EnvBuilder {
    fn default() -> Self {
        EnvBuilder::new(Platform::host())
    }
}

impl EnvBuilder {
    pub fn new(platform: Platform) -> Self {
        EnvBuilder {
            platform,
            debug_level: Level::None,
            opt_level: Level::None,
            opt_tags: Vec::new(),
            warning_level: Level::Minimal,
            warning_tags: Vec::new(),
            profiling: false,
            exceptions: true,
            structured_exceptions: false,
            rtti: true,
            cpu_arch: None,
            msvc_runtime: None,
            darwin_universal: false,
            darwin_sdk: None,
            default_debug_level: Level::Standard,
            default_opt_level: Level::Standard,
            default_warning_level: Level::Standard,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn set_platform(&mut self, platform: Platform) {
        self.platform = platform;
    }

    pub fn debug_level(&self) -> Level {
        self.debug_level
    }

    pub fn opt_level(&self) -> Level {
        self.opt_level
    }

    pub fn warning_level(&self) -> Level {
        self.warning_level
    }

    pub fn msvc_runtime(&self) -> Option<MsvcRuntime> {
        self.msvc_runtime
    }

    /// Turn on debug info, at the default level when `level` is `None`.
    pub fn enable_debug(&mut self, level: Option<Level>) {
        self.debug_level = level.unwrap_or(self.default_debug_level);
    }

    pub fn disable_debug(&mut self) {
        self.debug_level = Level::None;
    }

    pub fn enable_opt(&mut self, level: Option<Level>, tags: &[OptTag]) {
        self.opt_level = level.unwrap_or(self.default_opt_level);
        self.opt_tags = tags.to_vec();
    }

    pub fn disable_opt(&mut self) {
        self.opt_level = Level::None;
        self.opt_tags.clear();
    }

    pub fn enable_warnings(&mut self, level: Option<Level>, tags: &[WarnTag]) {
        self.warning_level = level.unwrap_or(self.default_warning_level);
        self.warning_tags = tags.to_vec();
    }

    pub fn disable_warnings(&mut self) {
        self.warning_level = Level::None;
        self.warning_tags.clear();
    }

    pub fn enable_profiling(&mut self, on: bool) {
        self.profiling = on;
    }

    pub fn enable_exceptions(&mut self, on: bool) {
        self.exceptions = on;
    }

    /// MSVC only: asynchronous (SEH) exception handling.
    pub fn enable_structured_exceptions(&mut self, on: bool) {
        self.structured_exceptions = on;
    }

    pub fn enable_rtti(&mut self, on: bool) {
        self.rtti = on;
    }

    pub fn set_cpu_arch(&mut self, arch: Option<Arch>) {
        self.cpu_arch = arch;
    }

    pub fn set_msvc_runtime(&mut self, runtime: Option<MsvcRuntime>) {
        self.msvc_runtime = runtime;
    }

    pub fn darwin_enable_universal(&mut self, on: bool) {
        self.darwin_universal = on;
    }

    pub fn darwin_set_sdk(&mut self, sdk: Option<String>) {
        self.darwin_sdk = sdk.filter(|s| !s.is_empty());
    }

    /// Register the `default_*_level` options (and the Darwin ones on
    /// Darwin) after a separator.
    pub fn add_options(&self, registry: &mut OptionRegistry) -> Result<(), OptionError> {
        registry.add_option(SeparatorOption::new("\nEnvironment builder defaults"))?;
        let levels = [
            ("default_debug_level", "Default debug level for variant builds."),
            ("default_opt_level", "Default optimization level for variant builds."),
            ("default_warning_level", "Default warning level for variant builds."),
        ];
        for (key, help) in levels {
            registry.add_option(EnumOption::new(
                key,
                help,
                Level::Standard.as_str(),
                &Level::NAMES,
            ))?;
        }

        if self.platform == Platform::Darwin {
            registry.add_option(BoolOption::new(
                "darwin_universal",
                "Build universal binaries.",
                false,
            ))?;
            registry.add_option(
                SimpleOption::new("darwin_sdk", "Darwin platform SDK.").with_default(""),
            )?;
        }
        Ok(())
    }

    /// Pick up the values the options settled on. Missing or unreadable
    /// entries keep the current setting.
    pub fn read_options(&mut self, env: &BuildEnv) {
        let level = |key: &str| {
            env.get(key)
                .and_then(|v| v.to_string().parse::<Level>().ok())
        };
        if let Some(l) = level("default_debug_level") {
            self.default_debug_level = l;
        }
        if let Some(l) = level("default_opt_level") {
            self.default_opt_level = l;
        }
        if let Some(l) = level("default_warning_level") {
            self.default_warning_level = l;
        }

        if self.platform == Platform::Darwin {
            if let Some(on) = env.get("darwin_universal").and_then(|v| parse_bool(v).ok()) {
                self.darwin_universal = on;
            }
            if let Some(sdk) = env.get("darwin_sdk") {
                self.darwin_set_sdk(Some(sdk.to_string()));
            }
        }
    }

    /// The flags these settings produce.
    pub fn flags(&self) -> CompilerFlags {
        let mut flags = CompilerFlags::default();
        match FlagSyntax::for_platform(self.platform) {
            FlagSyntax::Gnu => self.gnu_flags(&mut flags),
            FlagSyntax::Msvc => self.msvc_flags(&mut flags),
        }

        if self.opt_level != Level::None && self.debug_level == Level::None {
            flags.define("NDEBUG");
        }
        flags
    }

    /// Append the flags to `env`.
    pub fn apply(&self, env: &mut BuildEnv) {
        let flags = self.flags();
        env.append(keys::CCFLAGS, flags.ccflags);
        env.append(keys::CXXFLAGS, flags.cxxflags);
        env.append_unique(keys::CPPDEFINES, flags.cppdefines);
        env.append(keys::LINKFLAGS, flags.linkflags);
        if !flags.arflags.is_empty() {
            env.append_unique(keys::ARFLAGS, flags.arflags);
        }
    }

    fn gnu_flags(&self, flags: &mut CompilerFlags) {
        if self.opt_level != Level::None {
            if self.opt_tags.contains(&OptTag::ReduceSize) {
                flags.cc(["-Os"]);
            } else {
                match self.opt_level {
                    Level::Minimal => flags.cc(["-O1"]),
                    Level::Standard => flags.cc(["-O2"]),
                    _ => flags.cc(["-O3"]),
                }
            }
            if self.opt_tags.contains(&OptTag::FastMath) {
                flags.cc(["-ffast-math"]);
            }
        }

        if self.debug_level != Level::None {
            flags.cc(["-g", "-fno-inline"]);
            flags.cxx(["-fno-implicit-inline-templates", "-fno-default-inline"]);
        }

        match self.warning_level {
            Level::None => flags.cc(["-w"]),
            Level::Minimal => {}
            Level::Standard => flags.cc(["-Wall"]),
            Level::Extensive | Level::Maximum => flags.cc(["-Wall", "-Wextra"]),
        }
        if self.warning_tags.contains(&WarnTag::AsError) {
            flags.cc(["-Werror"]);
        }
        if self.warning_tags.contains(&WarnTag::Strict) {
            flags.cc(["-pedantic"]);
        }

        if !self.exceptions {
            flags.cxx(["-fno-exceptions"]);
        }
        if !self.rtti {
            flags.cxx(["-fno-rtti"]);
        }
        if self.profiling {
            flags.cc(["-pg"]);
            flags.link(["-pg"]);
        }

        match self.platform {
            Platform::Linux => flags.cc(["-pipe"]),
            Platform::Darwin => {
                flags.cc(["-pipe"]);
                if let Some(sdk) = &self.darwin_sdk {
                    flags.cc(["-isysroot", sdk.as_str()]);
                    flags.link(["-isysroot", sdk.as_str()]);
                    if let Some(caps) = DARWIN_SDK_VERSION.captures(sdk) {
                        let min = format!("-mmacosx-version-min={}", &caps[1]);
                        flags.cc([min.as_str()]);
                        flags.link([min.as_str()]);
                    }
                }
            }
            _ => {}
        }

        let arch = if self.platform == Platform::Darwin && self.darwin_universal {
            Some(Arch::Universal)
        } else {
            self.cpu_arch
        };
        if let Some(arch_flags) = arch.and_then(|a| a.compile_flags(self.platform)) {
            flags.cc(arch_flags.iter().copied());
            flags.link(arch_flags);
        }
    }

    fn msvc_flags(&self, flags: &mut CompilerFlags) {
        if self.opt_level != Level::None {
            if self.opt_tags.contains(&OptTag::ReduceSize) {
                flags.cc(["/O1"]);
            } else {
                match self.opt_level {
                    Level::Minimal => flags.cc(["/Ot", "/Og"]),
                    Level::Standard => flags.cc(["/O2"]),
                    _ => flags.cc(["/Ox"]),
                }
            }
            if self.opt_tags.contains(&OptTag::FastMath) {
                flags.cc(["/fp:fast"]);
            }
            flags.link(["/RELEASE"]);
        }

        if self.debug_level != Level::None {
            flags.cc(["/Od", "/Ob0", "/Z7"]);
            flags.link(["/DEBUG"]);
        }

        match self.warning_level {
            Level::None => flags.cc(["/W0"]),
            Level::Minimal => flags.cc(["/W1"]),
            Level::Standard => flags.cc(["/W2"]),
            Level::Extensive => flags.cc(["/W3"]),
            Level::Maximum => flags.cc(["/Wall"]),
        }
        if self.warning_tags.contains(&WarnTag::AsError) {
            flags.cc(["/WX"]);
        }
        if self.warning_tags.contains(&WarnTag::Strict) {
            flags.cc(["/Za"]);
        }

        if let Some(runtime) = self.msvc_runtime {
            flags.cc([runtime.flag()]);
        }
        if self.exceptions {
            flags.cc([if self.structured_exceptions { "/EHa" } else { "/EHsc" }]);
        }
        flags.cc([if self.rtti { "/GR" } else { "/GR-" }]);

        flags.define("_WINDOWS");
        if self.cpu_arch == Some(Arch::X64) {
            flags.define("WIN64");
            flags.link(["/MACHINE:X64"]);
            flags.arflags.push("/MACHINE:X64".to_string());
        } else {
            flags.define("WIN32");
            flags.link(["/MACHINE:X86"]);
            flags.arflags.push("/MACHINE:X86".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::Settings;
    use crate::probe::ProbeContext;
    use crate::test_support::MockChecker;

    #[test]
    fn test_gnu_debug_and_opt_differ() {
        let mut debug = EnvBuilder::new(Platform::Linux);
        debug.enable_debug(None);
        let mut opt = EnvBuilder::new(Platform::Linux);
        opt.enable_opt(None, &[]);

        let d = debug.flags();
        assert_eq!(d.ccflags, vec!["-g", "-fno-inline", "-pipe"]);
        assert_eq!(
            d.cxxflags,
            vec!["-fno-implicit-inline-templates", "-fno-default-inline"]
        );
        assert!(d.cppdefines.is_empty());

        let o = opt.flags();
        assert_eq!(o.ccflags, vec!["-O2", "-pipe"]);
        assert_eq!(o.cppdefines, vec!["NDEBUG"]);
    }

    #[test]
    fn test_gnu_levels_and_tags() {
        let mut b = EnvBuilder::new(Platform::FreeBsd);
        b.enable_opt(Some(Level::Maximum), &[OptTag::FastMath]);
        b.enable_warnings(Some(Level::Extensive), &[WarnTag::AsError, WarnTag::Strict]);
        b.enable_exceptions(false);
        b.enable_rtti(false);
        b.enable_profiling(true);

        let f = b.flags();
        assert_eq!(
            f.ccflags,
            vec!["-O3", "-ffast-math", "-Wall", "-Wextra", "-Werror", "-pedantic", "-pg"]
        );
        assert_eq!(f.cxxflags, vec!["-fno-exceptions", "-fno-rtti"]);
        assert_eq!(f.linkflags, vec!["-pg"]);

        b.enable_opt(Some(Level::Minimal), &[OptTag::ReduceSize]);
        b.disable_warnings();
        let f = b.flags();
        assert_eq!(f.ccflags[..2], ["-Os", "-w"]);
    }

    #[test]
    fn test_gnu_arch_flags() {
        let mut b = EnvBuilder::new(Platform::Linux);
        b.set_cpu_arch(Some(Arch::Ia32));
        let f = b.flags();
        assert_eq!(f.ccflags, vec!["-pipe", "-m32"]);
        assert_eq!(f.linkflags, vec!["-m32"]);
    }

    #[test]
    fn test_darwin_sdk_and_universal() {
        let mut b = EnvBuilder::new(Platform::Darwin);
        b.darwin_set_sdk(Some("/Developer/SDKs/MacOSX10.4u.sdk".to_string()));
        b.darwin_enable_universal(true);
        b.set_cpu_arch(Some(Arch::X64));

        let f = b.flags();
        assert!(f
            .ccflags
            .windows(2)
            .any(|w| w == ["-isysroot", "/Developer/SDKs/MacOSX10.4u.sdk"]));
        assert!(f.ccflags.contains(&"-mmacosx-version-min=10.4".to_string()));
        assert!(f.ccflags.windows(2).any(|w| w == ["-arch", "ppc"]));
        assert!(!f.ccflags.contains(&"x86_64".to_string()));
    }

    #[test]
    fn test_msvc_flags() {
        let mut b = EnvBuilder::new(Platform::Win32);
        b.enable_debug(None);
        b.set_msvc_runtime(Some(MsvcRuntime::MultiThreadedDebugDll));
        b.set_cpu_arch(Some(Arch::X64));

        let f = b.flags();
        assert_eq!(
            f.ccflags,
            vec!["/Od", "/Ob0", "/Z7", "/W1", "/MDd", "/EHsc", "/GR"]
        );
        assert_eq!(f.linkflags, vec!["/DEBUG", "/MACHINE:X64"]);
        assert_eq!(f.cppdefines, vec!["_WINDOWS", "WIN64"]);
        assert_eq!(f.arflags, vec!["/MACHINE:X64"]);

        let mut b = EnvBuilder::new(Platform::Win32);
        b.enable_opt(Some(Level::Extensive), &[]);
        b.enable_structured_exceptions(true);
        b.enable_rtti(false);
        let f = b.flags();
        assert_eq!(f.ccflags, vec!["/Ox", "/W1", "/EHa", "/GR-"]);
        assert_eq!(f.linkflags, vec!["/RELEASE", "/MACHINE:X86"]);
        assert_eq!(f.cppdefines, vec!["_WINDOWS", "WIN32", "NDEBUG"]);
    }

    #[test]
    fn test_apply_appends_to_env() {
        let mut b = EnvBuilder::new(Platform::Win32);
        b.enable_opt(None, &[]);
        let mut env = BuildEnv::new(Platform::Win32);
        env.append(keys::CPPDEFINES, ["WIN32"]);
        b.apply(&mut env);

        assert_eq!(env.get_list(keys::CPPDEFINES), vec!["WIN32", "_WINDOWS", "NDEBUG"]);
        assert_eq!(env.get_list(keys::ARFLAGS), vec!["/MACHINE:X86"]);
        assert!(env.get_list(keys::CCFLAGS).contains(&"/O2".to_string()));
    }

    #[test]
    fn test_default_levels_from_options() {
        let builder = EnvBuilder::new(Platform::Linux);
        let mut registry = OptionRegistry::new();
        builder.add_options(&mut registry).unwrap();
        assert!(registry.get("darwin_sdk").is_none());

        let mut settings = Settings::new();
        settings.set("default_opt_level", "minimal");
        settings.set("default_debug_level", "none");
        let mut env = BuildEnv::new(Platform::Linux);
        let ctx = ProbeContext::new(Box::new(MockChecker::new()));
        registry.process_with(&settings, &mut env, &ctx, true).unwrap();

        let mut builder = builder;
        builder.read_options(&env);
        builder.enable_opt(None, &[]);
        assert_eq!(builder.opt_level(), Level::Minimal);
        assert_eq!(builder.flags().ccflags[0], "-O1");

        builder.enable_debug(None);
        assert_eq!(builder.debug_level(), Level::None);
        assert_eq!(builder.warning_level(), Level::Minimal);
    }

    #[test]
    fn test_darwin_options_registered_on_darwin() {
        let builder = EnvBuilder::new(Platform::Darwin);
        let mut registry = OptionRegistry::new();
        builder.add_options(&mut registry).unwrap();
        assert!(registry.get("darwin_universal").is_some());
        assert!(registry.get("darwin_sdk").is_some());
        assert!("bogus".parse::<Level>().is_err());
    }
}
