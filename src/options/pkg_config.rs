//! Packages described by a pkg-config compatible module.

use std::path::PathBuf;

use crate::core::env::{keys, BuildEnv};
use crate::core::errors::OptionError;
use crate::core::option::{BuildOption, OptionHelp, OptionKind};
use crate::core::settings::{Settings, Value};
use crate::probe::{check_header, check_lib, FlagSource, Lang, PkgConfigParser, ProbeContext};
use crate::util::version::{version_at_least, DottedVersion};

/// Flags discovered for a module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Found {
    version: Option<DottedVersion>,
    includes: Vec<String>,
    defines: Vec<String>,
    libs: Vec<String>,
    lib_paths: Vec<String>,
    link_flags: Vec<String>,
    cxx_flags: Vec<String>,
}

/// A package located through `pkg-config` (or pkgconf, flagpoll).
///
/// The single key, `<Name>PcFile`, optionally points at an explicit `.pc`
/// file; otherwise the module is looked up by name.
#[derive(Debug)]
pub struct PkgConfigOption {
    name: String,
    keys: Vec<String>,
    help: OptionHelp,
    module: String,
    required_version: Option<DottedVersion>,
    required: bool,
    use_cpp_path: bool,
    compile_test: bool,
    header: Option<String>,
    dependencies: Vec<String>,

    pc_file: Option<PathBuf>,
    parser: Option<PkgConfigParser>,
    found: Option<Found>,
    include_prefix: String,
}

impl PkgConfigOption {
    pub fn new(name: &str, module: &str) -> Self {
        let key = format!("{}PcFile", name.replace(' ', ""));
        PkgConfigOption {
            name: name.to_string(),
            keys: vec![key],
            help: format!("Location of the {} .pc file", name).into(),
            module: module.to_string(),
            required_version: None,
            required: false,
            use_cpp_path: true,
            compile_test: false,
            header: None,
            dependencies: Vec::new(),
            pc_file: None,
            parser: None,
            found: None,
            include_prefix: "-I".to_string(),
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

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Put include directories in `CPPPATH` (the default) or pass them
    /// as `CXXFLAGS` with the platform's include prefix.
    pub fn use_cpp_path(mut self, use_cpp_path: bool) -> Self {
        self.use_cpp_path = use_cpp_path;
        self
    }

    /// Also compile `header` and link each library after the query.
    pub fn with_compile_test(mut self, header: Option<&str>) -> Self {
        self.compile_test = true;
        self.header = header.map(String::from);
        self
    }

    pub fn depends_on(mut self, name: &str) -> Self {
        self.dependencies.push(name.to_string());
        self
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn version(&self) -> Option<&DottedVersion> {
        self.found.as_ref().and_then(|f| f.version.as_ref())
    }

    fn query(&self, parser: &PkgConfigParser) -> Result<Found, OptionError> {
        let version = parser.version();
        if !parser.is_valid() {
            return Err(OptionError::not_found(
                &self.name,
                format!("pkg-config module `{}`", self.module),
            ));
        }

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

        let mut link_flags = parser.link_flags();
        for framework in parser.frameworks() {
            link_flags.push("-framework".to_string());
            link_flags.push(framework);
        }

        Ok(Found {
            version,
            includes: parser.includes(),
            defines: parser.defines(),
            libs: parser.libs(),
            lib_paths: parser.lib_paths(),
            link_flags,
            cxx_flags: parser.cxx_flags(),
        })
    }

    fn compile_check(&self, ctx: &ProbeContext, env: &BuildEnv) -> Result<(), OptionError> {
        let mut env = env.clone();
        self.apply(&mut env);
        let failed = |check: String| OptionError::CompileCheckFailed {
            option: self.name.clone(),
            check,
        };

        if let Some(header) = &self.header {
            if !check_header(ctx.checker(), &env, header, Lang::Cxx) {
                return Err(failed(format!("compile with <{}>", header)));
            }
        }
        let libs = self.found.as_ref().map(|f| f.libs.clone()).unwrap_or_default();
        for lib in libs {
            if !check_lib(ctx.checker(), &env, &lib, None, Lang::Cxx) {
                return Err(failed(format!("link {}", lib)));
            }
        }
        Ok(())
    }
}

impl BuildOption for PkgConfigOption {
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
        self.found.is_some()
    }

    fn start(&mut self) {
        tracing::info!("Checking for {}", self.module);
    }

    fn seed_initial(&mut self, settings: &Settings) -> Result<(), OptionError> {
        if let Some(file) = settings.get_string(&self.keys[0]) {
            tracing::debug!("{} specified or cached: {}", self.keys[0], file);
            self.pc_file = Some(PathBuf::from(file));
        }
        Ok(())
    }

    fn probe(&mut self, ctx: &ProbeContext) -> Result<(), OptionError> {
        let parser = match &self.pc_file {
            Some(file) => PkgConfigParser::from_file(ctx.pkg_config(), file, ctx.flag_syntax()),
            None => PkgConfigParser::new(ctx.pkg_config(), &self.module, ctx.flag_syntax()),
        };
        tracing::debug!(
            "{}: {}",
            self.module,
            if parser.is_valid() { "found" } else { "not found" }
        );
        self.include_prefix = ctx.platform().include_prefix().to_string();
        self.parser = Some(parser);
        Ok(())
    }

    fn validate(&mut self, env: &BuildEnv, ctx: &ProbeContext) -> Result<(), OptionError> {
        self.found = None;
        let Some(parser) = &self.parser else {
            return Err(OptionError::not_found(&self.name, "pkg-config"));
        };

        let found = self.query(parser)?;
        if let Some(version) = &found.version {
            tracing::info!("{} version: {} [OK]", self.module, version);
        }
        self.found = Some(found);

        if self.compile_test {
            if let Err(e) = self.compile_check(ctx, env) {
                self.found = None;
                return Err(e);
            }
        }
        Ok(())
    }

    fn apply(&self, env: &mut BuildEnv) {
        let Some(found) = &self.found else {
            return;
        };

        if self.use_cpp_path {
            env.append_unique(keys::CPPPATH, &found.includes);
        } else {
            env.append_unique(
                keys::CXXFLAGS,
                found
                    .includes
                    .iter()
                    .map(|p| format!("{}{}", self.include_prefix, p)),
            );
        }
        env.append_unique(keys::CXXFLAGS, &found.cxx_flags);
        env.append_unique(keys::CPPDEFINES, &found.defines);
        env.append_unique(keys::LIBS, &found.libs);
        env.append_unique(keys::LIBPATH, &found.lib_paths);
        env.append_unique(keys::LINKFLAGS, &found.link_flags);
    }

    fn settings(&self) -> Vec<(String, Value)> {
        self.pc_file
            .iter()
            .map(|f| (self.keys[0].clone(), Value::from(f.display().to_string())))
            .collect()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::{write_script, MockChecker};
    use crate::util::platform::Platform;
    use tempfile::TempDir;

    /// A fake pkg-config that knows a single module, `cppdom`.
    fn fake_pkg_config(dir: &std::path::Path) -> String {
        let body = r#"
module=""
for arg in "$@"; do
  case "$arg" in
    --*) ;;
    *) module="$arg" ;;
  esac
done
[ "$module" = "cppdom" ] || exit 1
for arg in "$@"; do
  case "$arg" in
    --exists) exit 0 ;;
    --modversion) echo "1.0.3" ;;
    --cflags-only-I) echo "-I/opt/cppdom/include" ;;
    --cflags-only-other) echo "-pthread" ;;
    --cflags) echo "-I/opt/cppdom/include -DCPPDOM_DLL" ;;
    --libs-only-l) echo "-lcppdom" ;;
    --libs-only-L) echo "-L/opt/cppdom/lib" ;;
    --libs-only-other) echo "-framework Cocoa -pthread" ;;
  esac
done
"#;
        write_script(dir, "pkg-config", body).display().to_string()
    }

    fn ctx(tool: &str, checker: MockChecker) -> ProbeContext {
        ProbeContext::new(Box::new(checker))
            .with_platform(Platform::Linux)
            .with_pkg_config(tool)
    }

    fn run(opt: &mut PkgConfigOption, ctx: &ProbeContext) -> Result<(), OptionError> {
        opt.seed_initial(&Settings::new())?;
        opt.probe(ctx)?;
        opt.validate(&BuildEnv::new(Platform::Linux), ctx)
    }

    #[test]
    fn test_found_module_applies_flags() {
        let tmp = TempDir::new().unwrap();
        let ctx = ctx(&fake_pkg_config(tmp.path()), MockChecker::new());

        let mut opt = PkgConfigOption::new("Cpp Dom", "cppdom")
            .with_min_version("0.9".parse().unwrap());
        assert_eq!(opt.keys(), ["CppDomPcFile"]);
        run(&mut opt, &ctx).unwrap();
        assert!(opt.is_available());
        assert_eq!(opt.version().map(|v| v.to_string()), Some("1.0.3".to_string()));

        let mut env = BuildEnv::new(Platform::Linux);
        opt.apply(&mut env);
        opt.apply(&mut env);
        assert_eq!(env.get_list(keys::CPPPATH), vec!["/opt/cppdom/include"]);
        assert_eq!(env.get_list(keys::CPPDEFINES), vec!["CPPDOM_DLL"]);
        assert_eq!(env.get_list(keys::LIBS), vec!["cppdom"]);
        assert_eq!(env.get_list(keys::LIBPATH), vec!["/opt/cppdom/lib"]);
        assert_eq!(
            env.get_list(keys::LINKFLAGS),
            vec!["-pthread", "-framework", "Cocoa"]
        );
        assert_eq!(env.get_list(keys::CXXFLAGS), vec!["-pthread"]);
    }

    #[test]
    fn test_includes_as_cxxflags() {
        let tmp = TempDir::new().unwrap();
        let ctx = ctx(&fake_pkg_config(tmp.path()), MockChecker::new());

        let mut opt = PkgConfigOption::new("CppDom", "cppdom").use_cpp_path(false);
        run(&mut opt, &ctx).unwrap();

        let mut env = BuildEnv::new(Platform::Linux);
        opt.apply(&mut env);
        assert!(env.get_list(keys::CPPPATH).is_empty());
        assert_eq!(
            env.get_list(keys::CXXFLAGS),
            vec!["-I/opt/cppdom/include", "-pthread"]
        );
    }

    #[test]
    fn test_version_too_old() {
        let tmp = TempDir::new().unwrap();
        let ctx = ctx(&fake_pkg_config(tmp.path()), MockChecker::new());

        let mut opt = PkgConfigOption::new("CppDom", "cppdom")
            .with_min_version("1.2".parse().unwrap());
        let err = run(&mut opt, &ctx).unwrap_err();
        assert!(matches!(err, OptionError::VersionTooOld { .. }));
        assert!(!opt.is_available());
    }

    #[test]
    fn test_unknown_module_and_missing_tool() {
        let tmp = TempDir::new().unwrap();
        let ctx = ctx(&fake_pkg_config(tmp.path()), MockChecker::new());
        let mut opt = PkgConfigOption::new("Vapor", "vpr");
        let err = run(&mut opt, &ctx).unwrap_err();
        assert!(matches!(err, OptionError::ProbeNotFound { .. }));

        let ctx = super::tests::ctx("/nonexistent/pkg-config", MockChecker::new());
        let mut opt = PkgConfigOption::new("CppDom", "cppdom");
        assert!(run(&mut opt, &ctx).is_err());
    }

    #[test]
    fn test_compile_test_links_every_lib() {
        let tmp = TempDir::new().unwrap();
        let tool = fake_pkg_config(tmp.path());

        let ok = ctx(&tool, MockChecker::new().with_header("cppdom/cppdom.h").with_lib("cppdom"));
        let mut opt = PkgConfigOption::new("CppDom", "cppdom").with_compile_test(Some("cppdom/cppdom.h"));
        run(&mut opt, &ok).unwrap();

        let bad = ctx(&tool, MockChecker::new().with_header("cppdom/cppdom.h"));
        let mut opt = PkgConfigOption::new("CppDom", "cppdom").with_compile_test(Some("cppdom/cppdom.h"));
        let err = run(&mut opt, &bad).unwrap_err();
        assert!(matches!(err, OptionError::CompileCheckFailed { .. }));
        assert!(!opt.is_available());
    }
}
