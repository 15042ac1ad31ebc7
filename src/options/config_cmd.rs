//! Packages that ship a `*-config` helper (`sdl-config`, `cppunit-config`).

use std::path::{Path, PathBuf};

use crate::core::env::{keys, BuildEnv};
use crate::core::errors::OptionError;
use crate::core::option::{BuildOption, OptionHelp, OptionKind};
use crate::core::settings::{Settings, Value};
use crate::probe::{ConfigCmdParser, FlagSource, ProbeContext};
use crate::util::process::{find_executable, ProcessBuilder};
use crate::util::version::{version_at_least, DottedVersion};

/// A package whose flags come from its config helper.
///
/// The single key names the base directory; the helper is expected at
/// `<base>/bin/<command>`. Without a base directory the helper is looked up
/// in PATH and asked for its `--prefix`.
#[derive(Debug)]
pub struct ConfigCmdOption {
    name: String,
    keys: Vec<String>,
    help: OptionHelp,
    command: String,
    required_version: Option<DottedVersion>,
    required: bool,
    header: Option<String>,
    dependencies: Vec<String>,

    base_dir: Option<PathBuf>,
    command_path: Option<PathBuf>,
    includes: Vec<String>,
    defines: Vec<String>,
    cxx_flags: Vec<String>,
    libs: Vec<String>,
    lib_paths: Vec<String>,
    link_flags: Vec<String>,
    available: bool,
}

impl ConfigCmdOption {
    pub fn new(name: &str, key: &str, command: &str) -> Self {
        ConfigCmdOption {
            name: name.to_string(),
            keys: vec![key.to_string()],
            help: format!(
                "Base directory for {}. bin, include and lib should be under this dir",
                name
            )
            .into(),
            command: command.to_string(),
            required_version: None,
            required: false,
            header: None,
            dependencies: Vec::new(),
            base_dir: None,
            command_path: None,
            includes: Vec::new(),
            defines: Vec::new(),
            cxx_flags: Vec::new(),
            libs: Vec::new(),
            lib_paths: Vec::new(),
            link_flags: Vec::new(),
            available: false,
        }
    }

    pub fn with_help(mut self, help: &str) -> Self {
        self.help = help.into();
        self
    }

    pub fn with_min_version(mut self, version: DottedVersion) -> Self {
        self.required_version = Some(version);
        self
    }

    /// Header, relative to `<base>/include`, that must exist.
    pub fn with_header(mut self, header: &str) -> Self {
        self.header = Some(header.to_string());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn depends_on(mut self, name: &str) -> Self {
        self.dependencies.push(name.to_string());
        self
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    fn clear(&mut self) {
        self.base_dir = None;
        self.command_path = None;
        self.includes.clear();
        self.defines.clear();
        self.cxx_flags.clear();
        self.libs.clear();
        self.lib_paths.clear();
        self.link_flags.clear();
        self.available = false;
    }

    fn check(&mut self, ctx: &ProbeContext) -> Result<(), OptionError> {
        let (Some(base), Some(command)) = (&self.base_dir, &self.command_path) else {
            return Err(OptionError::not_found(&self.name, format!("`{}`", self.command)));
        };
        if !base.is_dir() {
            return Err(OptionError::not_found(
                &self.name,
                format!("base directory {}", base.display()),
            ));
        }
        if !command.is_file() {
            return Err(OptionError::not_found(
                &self.name,
                format!("`{}`", command.display()),
            ));
        }

        let parser = ConfigCmdParser::new(command, ctx.flag_syntax());
        let version = parser.version();
        if let Some(required) = &self.required_version {
            let found = version.clone().unwrap_or_default();
            if !version_at_least(&found, required) {
                return Err(OptionError::VersionTooOld {
                    option: self.name.clone(),
                    required: required.to_string(),
                    found: found.to_string(),
                });
            }
        }

        if let Some(header) = &self.header {
            let path = base.join("include").join(header);
            if !path.is_file() {
                return Err(OptionError::not_found(
                    &self.name,
                    format!("header {}", path.display()),
                ));
            }
        }

        let includes = parser.includes();
        let defines = parser.defines();
        let cxx_flags = parser.cxx_flags();
        let libs = parser.libs();
        let lib_paths = parser.lib_paths();
        let mut link_flags = parser.link_flags();
        for framework in parser.frameworks() {
            link_flags.push("-framework".to_string());
            link_flags.push(framework);
        }
        if !parser.is_valid() {
            return Err(OptionError::not_found(
                &self.name,
                format!("working `{}`", command.display()),
            ));
        }

        if let Some(version) = version {
            tracing::info!("{} version: {}", self.name, version);
        }
        self.includes = includes;
        self.defines = defines;
        self.cxx_flags = cxx_flags;
        self.libs = libs;
        self.lib_paths = lib_paths;
        self.link_flags = link_flags;
        Ok(())
    }
}

impl BuildOption for ConfigCmdOption {
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

    fn start(&mut self) {
        tracing::info!("Checking for {}", self.name);
    }

    fn seed_initial(&mut self, settings: &Settings) -> Result<(), OptionError> {
        if let Some(base) = settings.get_string(&self.keys[0]) {
            let base = PathBuf::from(base);
            tracing::debug!("{} specified or cached: {}", self.keys[0], base.display());
            self.command_path = Some(base.join("bin").join(&self.command));
            self.base_dir = Some(base);
        }
        Ok(())
    }

    fn probe(&mut self, _ctx: &ProbeContext) -> Result<(), OptionError> {
        if self.base_dir.is_some() {
            return Ok(());
        }

        let Some(command) = find_executable(&self.command) else {
            return Err(OptionError::not_found(&self.name, format!("`{}`", self.command)));
        };
        tracing::debug!("found {}", command.display());

        let prefix = ProcessBuilder::new(&command)
            .arg("--prefix")
            .read_stdout()
            .map_err(|_| OptionError::not_found(&self.name, format!("{} --prefix", self.command)))?;
        let base = PathBuf::from(prefix);
        if !base.is_dir() {
            return Err(OptionError::not_found(
                &self.name,
                format!("directory {} reported by {}", base.display(), self.command),
            ));
        }

        tracing::debug!("{} found at {}", self.name, base.display());
        self.base_dir = Some(base);
        self.command_path = Some(command);
        Ok(())
    }

    fn validate(&mut self, _env: &BuildEnv, ctx: &ProbeContext) -> Result<(), OptionError> {
        match self.check(ctx) {
            Ok(()) => {
                self.available = true;
                Ok(())
            }
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }

    fn apply(&self, env: &mut BuildEnv) {
        env.append(keys::CPPPATH, &self.includes);
        env.append_unique(keys::CPPDEFINES, &self.defines);
        env.append(keys::CXXFLAGS, &self.cxx_flags);
        env.append(keys::LIBS, &self.libs);
        env.append(keys::LIBPATH, &self.lib_paths);
        env.append(keys::LINKFLAGS, &self.link_flags);
    }

    fn settings(&self) -> Vec<(String, Value)> {
        self.base_dir
            .iter()
            .map(|b| (self.keys[0].clone(), Value::from(b.display().to_string())))
            .collect()
    }
}
