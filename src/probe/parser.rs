//! Extract compiler and linker flags from helper-tool output.
//!
//! Two front-ends share one set of extraction rules:
//! - [`ConfigCmdParser`] for `foo-config --cflags` style scripts
//! - [`PkgConfigParser`] for `pkg-config <module> --cflags-only-I` style tools
//!
//! A parser whose tool is missing (or whose query fails) is *invalid*:
//! every extraction returns an empty list instead of an error, and callers
//! treat that as "not found".

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::util::compile_regex;
use crate::util::platform::Platform;
use crate::util::process::{find_executable, ProcessBuilder};
use crate::util::version::DottedVersion;

/// Which family of command-line flags a tool speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagSyntax {
    /// `-I`, `-l`, `-L`, `-D`
    Gnu,
    /// `/I`, `foo.lib`, `/LIBPATH:`, `/D`
    Msvc,
}

impl FlagSyntax {
    pub fn for_platform(platform: Platform) -> Self {
        if platform.is_win32() {
            FlagSyntax::Msvc
        } else {
            FlagSyntax::Gnu
        }
    }
}

// A value is either a double-quoted string or a run of non-blanks.
static GNU_INCLUDE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r#"(?:\s|^)-I\s*("[^"]+"|\S*)"#));
static GNU_LIB: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"(?:\s|^)-l(\S*)"));
static GNU_LIBPATH: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r#"(?:\s|^)-L\s*("[^"]+"|\S*)"#));
static GNU_DEFINE: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"(?:\s|^)-D(\S*)"));

static MSVC_INCLUDE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r#"(?:\s|^)[-/]I\s*("[^"]+"|\S*)"#));
static MSVC_LIBPATH: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r#"(?i)(?:\s|^)/LIBPATH:("[^"]+"|\S*)"#));
static MSVC_DEFINE: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"(?:\s|^)[-/]D(\S*)"));

static FRAMEWORK: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"-framework\s+(\S+)"));
static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)"));

/// Expand `$VAR` and `${VAR}` references. Unknown variables are kept as is.
pub fn expand_env_vars(text: &str) -> String {
    ENV_VAR
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Regex-driven flag extraction for one [`FlagSyntax`].
#[derive(Debug, Clone, Copy)]
pub struct FlagExtractor {
    syntax: FlagSyntax,
}

impl FlagExtractor {
    pub fn new(syntax: FlagSyntax) -> Self {
        FlagExtractor { syntax }
    }

    pub fn syntax(&self) -> FlagSyntax {
        self.syntax
    }

    fn capture_all(re: &Regex, text: &str) -> Vec<String> {
        re.captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| expand_env_vars(unquote(m.as_str())))
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// Include directories.
    pub fn includes(&self, text: &str) -> Vec<String> {
        match self.syntax {
            FlagSyntax::Gnu => Self::capture_all(&GNU_INCLUDE, text),
            FlagSyntax::Msvc => Self::capture_all(&MSVC_INCLUDE, text),
        }
    }

    /// Library names without prefix or extension.
    pub fn libs(&self, text: &str) -> Vec<String> {
        match self.syntax {
            FlagSyntax::Gnu => Self::capture_all(&GNU_LIB, text),
            FlagSyntax::Msvc => text
                .split_whitespace()
                .filter(|t| !t.starts_with('/') && !t.starts_with('-'))
                .filter_map(|t| {
                    let split = t.len().checked_sub(4)?;
                    let (stem, ext) = (t.get(..split)?, t.get(split..)?);
                    ext.eq_ignore_ascii_case(".lib")
                        .then(|| expand_env_vars(stem))
                })
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }

    /// Library search directories.
    pub fn lib_paths(&self, text: &str) -> Vec<String> {
        match self.syntax {
            FlagSyntax::Gnu => Self::capture_all(&GNU_LIBPATH, text),
            FlagSyntax::Msvc => Self::capture_all(&MSVC_LIBPATH, text),
        }
    }

    /// Preprocessor defines (`NAME` or `NAME=VALUE`).
    pub fn defines(&self, text: &str) -> Vec<String> {
        match self.syntax {
            FlagSyntax::Gnu => Self::capture_all(&GNU_DEFINE, text),
            FlagSyntax::Msvc => Self::capture_all(&MSVC_DEFINE, text),
        }
    }

    /// Darwin framework names.
    pub fn frameworks(&self, text: &str) -> Vec<String> {
        Self::capture_all(&FRAMEWORK, text)
    }

    /// Flags that are not include, define, library or framework flags.
    pub fn other_flags(&self, text: &str) -> Vec<String> {
        let mut flags = Vec::new();
        let mut tokens = text.split_whitespace();
        while let Some(token) = tokens.next() {
            if token == "-framework" || self.takes_separate_value(token) {
                tokens.next();
                continue;
            }
            if !(token.starts_with('-') || token.starts_with('/')) || self.is_known(token) {
                continue;
            }
            flags.push(expand_env_vars(token));
        }
        flags
    }

    /// A bare include or library path flag whose path is the next token.
    fn takes_separate_value(&self, token: &str) -> bool {
        match self.syntax {
            FlagSyntax::Gnu => token == "-I" || token == "-L",
            FlagSyntax::Msvc => token.eq_ignore_ascii_case("/I") || token == "-I",
        }
    }

    fn is_known(&self, token: &str) -> bool {
        match self.syntax {
            FlagSyntax::Gnu => ["-I", "-l", "-L", "-D"].iter().any(|p| token.starts_with(p)),
            FlagSyntax::Msvc => {
                let upper = token.to_ascii_uppercase();
                ["/I", "-I", "/D", "-D", "/LIBPATH:"]
                    .iter()
                    .any(|p| upper.starts_with(p))
                    || upper.ends_with(".LIB")
            }
        }
    }
}

/// Common query surface of the two parser front-ends.
pub trait FlagSource {
    /// Whether the tool exists and answered every query so far.
    fn is_valid(&self) -> bool;
    fn includes(&self) -> Vec<String>;
    fn defines(&self) -> Vec<String>;
    fn libs(&self) -> Vec<String>;
    fn lib_paths(&self) -> Vec<String>;
    fn frameworks(&self) -> Vec<String>;
    /// Linker flags other than libraries, search paths and frameworks.
    fn link_flags(&self) -> Vec<String>;
    /// Compiler flags other than includes and defines.
    fn cxx_flags(&self) -> Vec<String>;
    fn version(&self) -> Option<DottedVersion>;
}

/// Runs a tool and returns stdout, flipping `valid` off on any failure.
fn run_query(program: &ProcessBuilder, valid: &Cell<bool>) -> String {
    if !valid.get() {
        return String::new();
    }
    match program.read_stdout() {
        Ok(out) => out,
        Err(e) => {
            tracing::debug!("query failed: {:#}", e);
            valid.set(false);
            String::new()
        }
    }
}

/// Parser for `*-config` helper scripts (`sdl-config`, `cppunit-config`, ...).
#[derive(Debug)]
pub struct ConfigCmdParser {
    command: PathBuf,
    interpreter: Option<PathBuf>,
    extractor: FlagExtractor,
    valid: Cell<bool>,
}

impl ConfigCmdParser {
    /// Parser for an executable helper. A bare name is looked up in PATH.
    pub fn new(command: impl AsRef<Path>, syntax: FlagSyntax) -> Self {
        let command = command.as_ref();
        let resolved = find_executable(&command.to_string_lossy());
        if resolved.is_none() {
            tracing::debug!("config command `{}` not found", command.display());
        }
        ConfigCmdParser {
            valid: Cell::new(resolved.is_some()),
            command: resolved.unwrap_or_else(|| command.to_path_buf()),
            interpreter: None,
            extractor: FlagExtractor::new(syntax),
        }
    }

    /// Parser for a helper script run through an interpreter
    /// (`python foo-config.py`).
    pub fn with_interpreter(
        script: impl AsRef<Path>,
        interpreter: &str,
        syntax: FlagSyntax,
    ) -> Self {
        let script = script.as_ref().to_path_buf();
        let interpreter = find_executable(interpreter);
        ConfigCmdParser {
            valid: Cell::new(script.is_file() && interpreter.is_some()),
            command: script,
            interpreter,
            extractor: FlagExtractor::new(syntax),
        }
    }

    pub fn command(&self) -> &Path {
        &self.command
    }

    /// Run the helper with whitespace-separated `args` and return stdout.
    pub fn query(&self, args: &str) -> String {
        let pb = match &self.interpreter {
            Some(interp) => ProcessBuilder::new(interp).arg(&self.command),
            None => ProcessBuilder::new(&self.command),
        };
        run_query(&pb.args(args.split_whitespace()), &self.valid)
    }
}

impl FlagSource for ConfigCmdParser {
    fn is_valid(&self) -> bool {
        self.valid.get()
    }

    fn includes(&self) -> Vec<String> {
        self.extractor.includes(&self.query("--cflags"))
    }

    fn defines(&self) -> Vec<String> {
        self.extractor.defines(&self.query("--cflags"))
    }

    fn libs(&self) -> Vec<String> {
        self.extractor.libs(&self.query("--libs"))
    }

    fn lib_paths(&self) -> Vec<String> {
        self.extractor.lib_paths(&self.query("--libs"))
    }

    fn frameworks(&self) -> Vec<String> {
        self.extractor.frameworks(&self.query("--libs"))
    }

    fn link_flags(&self) -> Vec<String> {
        self.extractor.other_flags(&self.query("--libs"))
    }

    fn cxx_flags(&self) -> Vec<String> {
        self.extractor.other_flags(&self.query("--cflags"))
    }

    fn version(&self) -> Option<DottedVersion> {
        DottedVersion::find_in(&self.query("--version"))
    }
}

/// Parser for pkg-config compatible tools (pkg-config, pkgconf, flagpoll).
#[derive(Debug)]
pub struct PkgConfigParser {
    tool: PathBuf,
    module_args: Vec<String>,
    extractor: FlagExtractor,
    valid: Cell<bool>,
}

impl PkgConfigParser {
    /// Parser for an installed module, e.g. `PkgConfigParser::new("pkg-config", "sdl2", ..)`.
    pub fn new(tool: &str, module: &str, syntax: FlagSyntax) -> Self {
        Self::build(tool, vec![module.to_string()], true, syntax)
    }

    /// Parser for an explicit `.pc` file instead of a module name.
    pub fn from_file(tool: &str, pc_file: &Path, syntax: FlagSyntax) -> Self {
        let is_flagpoll = Path::new(tool)
            .file_stem()
            .is_some_and(|s| s.to_string_lossy().eq_ignore_ascii_case("flagpoll"));
        let arg = if is_flagpoll {
            format!("--from-file={}", pc_file.display())
        } else {
            pc_file.display().to_string()
        };
        Self::build(tool, vec![arg], pc_file.is_file(), syntax)
    }

    fn build(tool: &str, module_args: Vec<String>, precondition: bool, syntax: FlagSyntax) -> Self {
        let resolved = find_executable(tool);
        let parser = PkgConfigParser {
            valid: Cell::new(precondition && resolved.is_some()),
            tool: resolved.unwrap_or_else(|| PathBuf::from(tool)),
            module_args,
            extractor: FlagExtractor::new(syntax),
        };
        if parser.valid.get() && !parser.module_exists() {
            tracing::debug!("`{}` does not know {:?}", tool, parser.module_args);
            parser.valid.set(false);
        }
        parser
    }

    fn module_exists(&self) -> bool {
        let pb = ProcessBuilder::new(&self.tool)
            .args(&self.module_args)
            .arg("--exists");
        match pb.exec() {
            // flagpoll answers on stdout; pkg-config only via exit status.
            Ok(out) => out.status.success() && String::from_utf8_lossy(&out.stdout).trim() != "no",
            Err(_) => false,
        }
    }

    /// Run the tool for this module with the given flag.
    pub fn query(&self, flag: &str) -> String {
        let pb = ProcessBuilder::new(&self.tool)
            .args(&self.module_args)
            .args(flag.split_whitespace());
        run_query(&pb, &self.valid)
    }
}

impl FlagSource for PkgConfigParser {
    fn is_valid(&self) -> bool {
        self.valid.get()
    }

    fn includes(&self) -> Vec<String> {
        self.extractor.includes(&self.query("--cflags-only-I"))
    }

    fn defines(&self) -> Vec<String> {
        self.extractor.defines(&self.query("--cflags"))
    }

    fn libs(&self) -> Vec<String> {
        self.extractor.libs(&self.query("--libs-only-l"))
    }

    fn lib_paths(&self) -> Vec<String> {
        self.extractor.lib_paths(&self.query("--libs-only-L"))
    }

    fn frameworks(&self) -> Vec<String> {
        self.extractor.frameworks(&self.query("--libs-only-other"))
    }

    fn link_flags(&self) -> Vec<String> {
        self.extractor.other_flags(&self.query("--libs-only-other"))
    }

    fn cxx_flags(&self) -> Vec<String> {
        self.extractor.other_flags(&self.query("--cflags-only-other"))
    }

    fn version(&self) -> Option<DottedVersion> {
        DottedVersion::find_in(&self.query("--modversion"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gnu_extraction() {
        let ex = FlagExtractor::new(FlagSyntax::Gnu);
        let cflags = "-I/usr/include/SDL -D_GNU_SOURCE=1 -D_REENTRANT -pthread";
        let libs = "-L/usr/lib -Wl,-rpath,/usr/lib -lSDL -lpthread";

        assert_eq!(ex.includes(cflags), vec!["/usr/include/SDL"]);
        assert_eq!(ex.defines(cflags), vec!["_GNU_SOURCE=1", "_REENTRANT"]);
        assert_eq!(ex.libs(libs), vec!["SDL", "pthread"]);
        assert_eq!(ex.lib_paths(libs), vec!["/usr/lib"]);
        assert_eq!(ex.other_flags(libs), vec!["-Wl,-rpath,/usr/lib"]);
        assert_eq!(ex.other_flags(cflags), vec!["-pthread"]);
    }

    #[test]
    fn test_separate_path_is_not_an_extra_flag() {
        let ex = FlagExtractor::new(FlagSyntax::Gnu);
        let cflags = "-I /usr/include -pthread -L /usr/lib -fPIC";
        assert_eq!(ex.other_flags(cflags), vec!["-pthread", "-fPIC"]);
        assert_eq!(ex.includes(cflags), vec!["/usr/include"]);
        assert_eq!(ex.lib_paths(cflags), vec!["/usr/lib"]);

        let ex = FlagExtractor::new(FlagSyntax::Msvc);
        assert_eq!(ex.other_flags(r"/I C:\sdk\include /EHsc"), vec!["/EHsc"]);
    }

    #[test]
    fn test_flag_must_start_a_token() {
        let ex = FlagExtractor::new(FlagSyntax::Gnu);
        assert!(ex.libs("--enable-lfoo").is_empty());
        assert!(ex.includes("x-Ifoo").is_empty());
    }

    #[test]
    fn test_msvc_extraction() {
        let ex = FlagExtractor::new(FlagSyntax::Msvc);
        let cflags = r#"/I"C:\Program Files\SDL\include" /IC:\boost /DWIN32 /EHsc"#;
        let libs = r#"/LIBPATH:"C:\Program Files\SDL\lib" /libpath:C:\boost\lib SDL.lib SDLmain.lib"#;

        assert_eq!(
            ex.includes(cflags),
            vec![r"C:\Program Files\SDL\include", r"C:\boost"]
        );
        assert_eq!(ex.defines(cflags), vec!["WIN32"]);
        assert_eq!(
            ex.lib_paths(libs),
            vec![r"C:\Program Files\SDL\lib", r"C:\boost\lib"]
        );
        assert_eq!(ex.libs(libs), vec!["SDL", "SDLmain"]);
        assert_eq!(ex.other_flags(cflags), vec!["/EHsc"]);
    }

    #[test]
    fn test_frameworks() {
        let ex = FlagExtractor::new(FlagSyntax::Gnu);
        let libs = "-L/opt/local/lib -lSDLmain -framework Cocoa -framework OpenGL -Wl,-dead_strip";
        assert_eq!(ex.frameworks(libs), vec!["Cocoa", "OpenGL"]);
        assert_eq!(ex.other_flags(libs), vec!["-Wl,-dead_strip"]);
    }

    #[test]
    fn test_env_var_expansion() {
        std::env::set_var("CONFKIT_TEST_PREFIX", "/opt/test");
        let ex = FlagExtractor::new(FlagSyntax::Gnu);
        assert_eq!(
            ex.includes("-I${CONFKIT_TEST_PREFIX}/include -I$CONFKIT_TEST_PREFIX/x"),
            vec!["/opt/test/include", "/opt/test/x"]
        );
        assert_eq!(expand_env_vars("$CONFKIT_TEST_UNSET_VAR/a"), "$CONFKIT_TEST_UNSET_VAR/a");
    }

    #[test]
    fn test_missing_command_yields_empty_results() {
        let parser = ConfigCmdParser::new("/nonexistent/bin/nothing-config", FlagSyntax::Gnu);
        assert!(!parser.is_valid());
        assert!(parser.includes().is_empty());
        assert!(parser.libs().is_empty());
        assert!(parser.lib_paths().is_empty());
        assert!(parser.defines().is_empty());
        assert!(parser.frameworks().is_empty());
        assert!(parser.link_flags().is_empty());
        assert!(parser.version().is_none());
    }

    #[test]
    fn test_missing_pkg_config_tool_is_invalid() {
        let parser = PkgConfigParser::new("confkit-no-such-pkg-config", "sdl2", FlagSyntax::Gnu);
        assert!(!parser.is_valid());
        assert!(parser.libs().is_empty());
        assert!(parser.version().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_config_script_queries() {
        let tmp = tempfile::TempDir::new().unwrap();
        let script = crate::test_support::write_config_script(
            tmp.path(),
            "fake-config",
            "2.0.4",
            "-I/opt/fake/include -DFAKE_SHARED",
            "-L/opt/fake/lib -lfake -lm",
        );

        let parser = ConfigCmdParser::new(&script, FlagSyntax::Gnu);
        assert!(parser.is_valid());
        assert_eq!(parser.includes(), vec!["/opt/fake/include"]);
        assert_eq!(parser.defines(), vec!["FAKE_SHARED"]);
        assert_eq!(parser.libs(), vec!["fake", "m"]);
        assert_eq!(parser.lib_paths(), vec!["/opt/fake/lib"]);
        assert_eq!(parser.version().unwrap().to_string(), "2.0.4");
    }

    #[cfg(unix)]
    #[test]
    fn test_script_through_interpreter() {
        let tmp = tempfile::TempDir::new().unwrap();
        let script = crate::test_support::write_config_script(
            tmp.path(),
            "tool-config",
            "0.9",
            "-I/opt/tool/include",
            "-ltool",
        );

        let parser = ConfigCmdParser::with_interpreter(&script, "sh", FlagSyntax::Gnu);
        assert!(parser.is_valid());
        assert_eq!(parser.libs(), vec!["tool"]);

        let missing = ConfigCmdParser::with_interpreter(&script, "confkit-no-such-interp", FlagSyntax::Gnu);
        assert!(!missing.is_valid());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_query_marks_invalid() {
        let tmp = tempfile::TempDir::new().unwrap();
        let script = crate::test_support::write_script(tmp.path(), "broken-config", "exit 3");

        let parser = ConfigCmdParser::new(&script, FlagSyntax::Gnu);
        assert!(parser.is_valid());
        assert!(parser.libs().is_empty());
        assert!(!parser.is_valid());
    }
}
