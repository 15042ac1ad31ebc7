//! Header/library packages found under a base directory.

use std::path::{Path, PathBuf};

use crate::core::env::{keys, BuildEnv};
use crate::core::errors::OptionError;
use crate::core::option::{BuildOption, OptionHelp, OptionKind};
use crate::core::settings::{Settings, Value};
use crate::probe::{check_header, check_lib, check_lib_with_header, Lang, ProbeContext};

/// How the configured library names are linked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Libraries {
    /// Every library is needed.
    All(Vec<String>),
    /// Candidate names in order of preference; the first that links wins.
    FirstOf(Vec<String>),
}

impl Libraries {
    fn is_empty(&self) -> bool {
        match self {
            Libraries::All(libs) | Libraries::FirstOf(libs) => libs.is_empty(),
        }
    }
}

/// A package described by a base directory plus optional include and
/// library directories, verified with a trial build.
///
/// Keys are `<name>`, `<name>_incdir` and `<name>_libdir`.
#[derive(Debug, Clone)]
pub struct StandardPackageOption {
    name: String,
    keys: Vec<String>,
    help: OptionHelp,
    header: Option<String>,
    libraries: Libraries,
    symbol: Option<String>,
    lang: Lang,
    required: bool,
    dependencies: Vec<String>,
    linker_flags: Vec<String>,
    verbose: bool,

    base_dir: Option<PathBuf>,
    inc_dirs: Option<Vec<String>>,
    lib_dirs: Option<Vec<String>>,
    found_libs: Vec<String>,
    available: bool,
}

impl StandardPackageOption {
    pub fn new(name: &str, help: impl Into<OptionHelp>) -> Self {
        StandardPackageOption {
            name: name.to_string(),
            keys: vec![
                name.to_string(),
                format!("{}_incdir", name),
                format!("{}_libdir", name),
            ],
            help: help.into(),
            header: None,
            libraries: Libraries::All(Vec::new()),
            symbol: None,
            lang: Lang::Cxx,
            required: false,
            dependencies: Vec::new(),
            linker_flags: Vec::new(),
            verbose: false,
            base_dir: None,
            inc_dirs: None,
            lib_dirs: None,
            found_libs: Vec::new(),
            available: false,
        }
    }

    /// Header whose presence validates the package.
    pub fn with_header(mut self, header: &str) -> Self {
        self.header = Some(header.to_string());
        self
    }

    pub fn with_libraries(mut self, libraries: Libraries) -> Self {
        self.libraries = libraries;
        self
    }

    pub fn with_library(self, library: &str) -> Self {
        self.with_libraries(Libraries::All(vec![library.to_string()]))
    }

    /// Symbol looked up when only a library is checked.
    pub fn with_symbol(mut self, symbol: &str) -> Self {
        self.symbol = Some(symbol.to_string());
        self
    }

    pub fn with_lang(mut self, lang: Lang) -> Self {
        self.lang = lang;
        self
    }

    pub fn with_linker_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.linker_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn depends_on(mut self, name: &str) -> Self {
        self.dependencies.push(name.to_string());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn inc_dirs(&self) -> &[String] {
        self.inc_dirs.as_deref().unwrap_or(&[])
    }

    pub fn lib_dirs(&self) -> &[String] {
        self.lib_dirs.as_deref().unwrap_or(&[])
    }

    /// Libraries that passed validation and will be linked.
    pub fn found_libs(&self) -> &[String] {
        &self.found_libs
    }

    fn apply_paths(&self, env: &mut BuildEnv) {
        if let Some(dirs) = &self.inc_dirs {
            env.append(keys::CPPPATH, dirs);
        }
        if let Some(dirs) = &self.lib_dirs {
            env.append(keys::LIBPATH, dirs);
        }
        if !self.linker_flags.is_empty() {
            env.append(keys::LINKFLAGS, &self.linker_flags);
        }
    }

    /// Link `libs` in order, returning whether the last one resolves.
    fn check_all(&self, ctx: &ProbeContext, env: &BuildEnv, libs: &[String]) -> bool {
        let Some((last, rest)) = libs.split_last() else {
            return false;
        };
        let mut env = env.clone();
        env.append(keys::LIBS, rest);

        match &self.header {
            Some(header) => check_lib_with_header(ctx.checker(), &env, last, header, self.lang, None),
            None => check_lib(ctx.checker(), &env, last, self.symbol.as_deref(), self.lang),
        }
    }

    /// Run the trial build that decides availability, recording the
    /// libraries that made it through.
    fn run_checks(&mut self, ctx: &ProbeContext, env: &BuildEnv) -> bool {
        match &self.libraries {
            Libraries::All(libs) if !libs.is_empty() => {
                let ok = self.check_all(ctx, env, libs);
                if ok {
                    self.found_libs = libs.clone();
                }
                ok
            }
            Libraries::FirstOf(candidates) if !candidates.is_empty() => {
                let hit = candidates
                    .iter()
                    .find(|lib| self.check_all(ctx, env, std::slice::from_ref(*lib)))
                    .cloned();
                match hit {
                    Some(lib) => {
                        tracing::debug!("{}: using library {}", self.name, lib);
                        self.found_libs = vec![lib];
                        true
                    }
                    None => false,
                }
            }
            _ => match (&self.header, &self.base_dir) {
                (Some(header), _) => check_header(ctx.checker(), env, header, self.lang),
                (None, Some(base)) => base.is_dir(),
                (None, None) => false,
            },
        }
    }

    fn clear(&mut self) {
        self.base_dir = None;
        self.inc_dirs = None;
        self.lib_dirs = None;
        self.found_libs.clear();
        self.available = false;
    }

    fn describe_check(&self) -> String {
        let libs = match &self.libraries {
            Libraries::All(libs) => libs.join(" "),
            Libraries::FirstOf(libs) => libs.join(" or "),
        };
        match (&self.header, self.libraries.is_empty()) {
            (Some(h), true) => format!("header <{}>", h),
            (Some(h), false) => format!("header <{}> with library {}", h, libs),
            (None, false) => format!("library {}", libs),
            (None, true) => "base directory".to_string(),
        }
    }
}

/// Read a directory list written either as a list or comma-separated.
fn split_dirs(value: &Value) -> Vec<String> {
    match value {
        Value::List(_) => value.to_strings(),
        other => other
            .to_string()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
    }
}

impl BuildOption for StandardPackageOption {
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

    fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    fn start(&mut self) {
        tracing::info!("Checking for {}", self.name);
    }

    fn seed_initial(&mut self, settings: &Settings) -> Result<(), OptionError> {
        if let Some(base) = settings.get_string(&self.keys[0]) {
            if self.verbose {
                tracing::debug!("{} specified or cached: {}", self.keys[0], base);
            }
            self.base_dir = Some(PathBuf::from(base));
        }
        if let Some(inc) = settings.get(&self.keys[1]) {
            self.inc_dirs = Some(split_dirs(inc));
        }
        if let Some(lib) = settings.get(&self.keys[2]) {
            self.lib_dirs = Some(split_dirs(lib));
        }
        Ok(())
    }

    fn probe(&mut self, ctx: &ProbeContext) -> Result<(), OptionError> {
        let Some(base) = &self.base_dir else {
            return Ok(());
        };

        if self.inc_dirs.is_none() {
            let inc = base.join("include");
            if inc.is_dir() {
                self.inc_dirs = Some(vec![inc.display().to_string()]);
            }
        }
        if self.lib_dirs.is_none() {
            let preferred = base.join(ctx.arch().lib_dir_name());
            let fallback = base.join("lib");
            self.lib_dirs = [preferred, fallback]
                .into_iter()
                .find(|dir| dir.is_dir())
                .map(|dir| vec![dir.display().to_string()]);
        }
        Ok(())
    }

    fn validate(&mut self, env: &BuildEnv, ctx: &ProbeContext) -> Result<(), OptionError> {
        let mut check_env = env.clone();
        self.apply_paths(&mut check_env);

        if self.run_checks(ctx, &check_env) {
            self.available = true;
            return Ok(());
        }

        let err = if self.header.is_none() && self.libraries.is_empty() {
            OptionError::not_found(&self.name, "base directory")
        } else {
            OptionError::CompileCheckFailed {
                option: self.name.clone(),
                check: self.describe_check(),
            }
        };
        self.clear();
        Err(err)
    }

    fn apply(&self, env: &mut BuildEnv) {
        self.apply_paths(env);
        if !self.found_libs.is_empty() {
            env.append(keys::LIBS, &self.found_libs);
        }
    }

    fn settings(&self) -> Vec<(String, Value)> {
        let mut out = Vec::new();
        if let Some(base) = &self.base_dir {
            out.push((self.keys[0].clone(), Value::from(base.display().to_string())));
        }
        if let Some(dirs) = &self.inc_dirs {
            out.push((self.keys[1].clone(), Value::from(dirs.clone())));
        }
        if let Some(dirs) = &self.lib_dirs {
            out.push((self.keys[2].clone(), Value::from(dirs.clone())));
        }
        out
    }
}
