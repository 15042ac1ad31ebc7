//! Test utilities and mocks for confkit unit tests.
//!
//! Trial builds and helper tools are the two things option code touches on
//! the host. [`MockChecker`] answers trial builds from a fixed inventory
//! and [`write_config_script`] drops a fake `*-config` helper on disk.
//!
//! # Example
//!
//! ```rust,ignore
//! use confkit::test_support::{MockChecker, write_config_script};
//!
//! #[test]
//! fn test_example() {
//!     let checker = MockChecker::new().with_header("zlib.h").with_lib("z");
//!     let ctx = ProbeContext::new(Box::new(checker));
//!     // Run options against ctx...
//! }
//! ```

pub mod fixtures;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::core::env::{keys, BuildEnv};
use crate::core::errors::OptionError;
use crate::core::option::{BuildOption, OptionHelp, OptionKind};
use crate::core::settings::{Settings, Value};
use crate::probe::{Checker, Lang, ProbeContext};

pub use fixtures::*;

/// A [`Checker`] that knows a fixed set of headers, libraries and flags.
///
/// A trial build succeeds when every `#include <...>` names a known header,
/// every `CCFLAGS` entry is a known flag and, when linking, every `LIBS`
/// entry is a known library.
#[derive(Debug, Clone, Default)]
pub struct MockChecker {
    headers: BTreeSet<String>,
    libs: BTreeSet<String>,
    flags: BTreeSet<String>,
}

impl MockChecker {
    pub fn new() -> Self {
        MockChecker::default()
    }

    pub fn with_header(mut self, header: &str) -> Self {
        self.headers.insert(header.to_string());
        self
    }

    pub fn with_lib(mut self, lib: &str) -> Self {
        self.libs.insert(lib.to_string());
        self
    }

    pub fn with_flag(mut self, flag: &str) -> Self {
        self.flags.insert(flag.to_string());
        self
    }
}

impl Checker for MockChecker {
    fn try_build(&self, env: &BuildEnv, source: &str, _lang: Lang, link: bool) -> bool {
        let headers_ok = source
            .lines()
            .filter_map(|l| l.trim().strip_prefix("#include <"))
            .filter_map(|l| l.strip_suffix('>'))
            .all(|h| self.headers.contains(h));
        let flags_ok = env
            .get_list(keys::CCFLAGS)
            .iter()
            .all(|f| self.flags.contains(f));
        let libs_ok = !link
            || env
                .get_list(keys::LIBS)
                .iter()
                .all(|l| self.libs.contains(l));
        headers_ok && flags_ok && libs_ok
    }
}

/// A scriptable package option for registry tests.
///
/// `validate` records the `LIBS` it was given in `seen_libs`, so tests can
/// check which dependencies were applied before it.
#[derive(Debug, Clone)]
pub struct FakeOption {
    name: String,
    keys: Vec<String>,
    help: OptionHelp,
    dependencies: Vec<String>,
    libs: Vec<String>,
    failing: bool,
    required: bool,
    available: bool,
    pub seen_libs: Vec<String>,
}

impl FakeOption {
    pub fn new(name: &str) -> Self {
        FakeOption {
            name: name.to_string(),
            keys: vec![name.to_string()],
            help: format!("Fake package {}", name).into(),
            dependencies: Vec::new(),
            libs: Vec::new(),
            failing: false,
            required: false,
            available: false,
            seen_libs: Vec::new(),
        }
    }

    pub fn depends_on(mut self, name: &str) -> Self {
        self.dependencies.push(name.to_string());
        self
    }

    pub fn with_lib(mut self, lib: &str) -> Self {
        self.libs.push(lib.to_string());
        self
    }

    /// Make validation fail.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

impl BuildOption for FakeOption {
    fn name(&self) -> &str {
        &self.name
    }

    fn keys(&self) -> &[String] {
        &self.keys
    }

    fn help(&self) -> &OptionHelp {
        &self.help
    }

    fn kind(&self) -> OptionKind {
        OptionKind::Package
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    fn is_required(&self) -> bool {
        self.required
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn seed_initial(&mut self, _settings: &Settings) -> Result<(), OptionError> {
        Ok(())
    }

    fn validate(&mut self, env: &BuildEnv, _ctx: &ProbeContext) -> Result<(), OptionError> {
        self.seen_libs = env.get_list(keys::LIBS);
        if self.failing {
            self.available = false;
            return Err(OptionError::not_found(&self.name, "fake package"));
        }
        self.available = true;
        Ok(())
    }

    fn apply(&self, env: &mut BuildEnv) {
        env.append(keys::LIBS, &self.libs);
    }

    fn settings(&self) -> Vec<(String, Value)> {
        Vec::new()
    }
}

/// Write an executable shell script `dir/name` running `body`.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Write a fake `*-config` helper answering `--version`, `--cflags`,
/// `--libs` and `--prefix` (the parent of `dir`).
#[cfg(unix)]
pub fn write_config_script(
    dir: &Path,
    name: &str,
    version: &str,
    cflags: &str,
    libs: &str,
) -> PathBuf {
    let prefix = dir.parent().unwrap_or(dir);
    let body = format!(
        r#"for arg in "$@"; do
  case "$arg" in
    --version) echo "{version}" ;;
    --cflags) echo "{cflags}" ;;
    --libs) echo "{libs}" ;;
    --prefix) echo "{prefix}" ;;
    *) exit 1 ;;
  esac
done"#,
        prefix = prefix.display()
    );
    write_script(dir, name, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::platform::Platform;

    #[test]
    fn test_mock_checker_rules() {
        let checker = MockChecker::new().with_header("zlib.h").with_lib("z");
        let mut env = BuildEnv::new(Platform::Linux);

        assert!(checker.try_build(&env, "#include <zlib.h>\n", Lang::C, false));
        assert!(!checker.try_build(&env, "#include <png.h>\n", Lang::C, false));

        env.append(keys::LIBS, ["z", "png"]);
        assert!(checker.try_build(&env, "", Lang::C, false));
        assert!(!checker.try_build(&env, "", Lang::C, true));
    }

    #[cfg(unix)]
    #[test]
    fn test_config_script_answers() {
        use crate::util::process::ProcessBuilder;

        let tmp = tempfile::TempDir::new().unwrap();
        let bin = tmp.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let script = write_config_script(&bin, "foo-config", "2.1", "-I/foo", "-lfoo");

        let out = ProcessBuilder::new(&script).arg("--version").read_stdout().unwrap();
        assert_eq!(out, "2.1");
        let prefix = ProcessBuilder::new(&script).arg("--prefix").read_stdout().unwrap();
        assert_eq!(PathBuf::from(prefix), tmp.path());
        assert!(!ProcessBuilder::new(&script).arg("--bogus").succeeds());
    }
}
