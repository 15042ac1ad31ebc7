//! Trial builds: does this header compile, does this library link?

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tempfile::TempDir;

use crate::core::env::{keys, BuildEnv};
use crate::util::platform::{Arch, Platform};
use crate::util::process::{find_c_compiler, find_cxx_compiler, ProcessBuilder};

/// Source language of a trial build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    C,
    #[serde(alias = "c++", alias = "cpp")]
    Cxx,
}

impl Lang {
    fn extension(&self) -> &'static str {
        match self {
            Lang::C => "c",
            Lang::Cxx => "cpp",
        }
    }
}

/// Compiles small test programs against a [`BuildEnv`].
pub trait Checker: fmt::Debug {
    /// Compile `source`, and link it when `link` is set. Any failure,
    /// including a missing compiler, is reported as `false`.
    fn try_build(&self, env: &BuildEnv, source: &str, lang: Lang, link: bool) -> bool;
}

/// Check that `header` can be included.
pub fn check_header(checker: &dyn Checker, env: &BuildEnv, header: &str, lang: Lang) -> bool {
    let source = format!("#include <{}>\nint main(void) {{ return 0; }}\n", header);
    checker.try_build(env, &source, lang, false)
}

fn symbol_decl(symbol: &str, lang: Lang) -> String {
    match lang {
        Lang::C => format!("char {}();\n", symbol),
        Lang::Cxx => format!("extern \"C\" char {}();\n", symbol),
    }
}

/// Check that `lib` links, optionally resolving `symbol` from it.
pub fn check_lib(
    checker: &dyn Checker,
    env: &BuildEnv,
    lib: &str,
    symbol: Option<&str>,
    lang: Lang,
) -> bool {
    let mut env = env.clone();
    env.append(keys::LIBS, [lib]);

    let source = match symbol {
        Some(sym) => format!(
            "{}int main(void) {{ {}(); return 0; }}\n",
            symbol_decl(sym, lang),
            sym
        ),
        None => "int main(void) { return 0; }\n".to_string(),
    };
    checker.try_build(&env, &source, lang, true)
}

/// Check that `header` compiles and `lib` links in the same program.
pub fn check_lib_with_header(
    checker: &dyn Checker,
    env: &BuildEnv,
    lib: &str,
    header: &str,
    lang: Lang,
    call: Option<&str>,
) -> bool {
    let mut env = env.clone();
    env.append(keys::LIBS, [lib]);

    let source = format!(
        "#include <{}>\nint main(void) {{ {}; return 0; }}\n",
        header,
        call.unwrap_or("")
    );
    checker.try_build(&env, &source, lang, true)
}

/// Architectures the compiler can target, host first.
pub fn detect_valid_archs(checker: &dyn Checker, platform: Platform, host: Arch) -> Vec<Arch> {
    let mut valid = Vec::new();
    if host != Arch::Unknown {
        valid.push(host);
    }

    for arch in Arch::candidates(platform, host) {
        if valid.contains(&arch) {
            continue;
        }
        let Some(flags) = arch.compile_flags(platform) else {
            continue;
        };
        let mut env = BuildEnv::new(platform);
        env.append(keys::CCFLAGS, flags.iter().copied());
        env.append(keys::LINKFLAGS, flags.iter().copied());

        let ok = checker.try_build(&env, "int main(void) { return 0; }\n", Lang::C, true);
        tracing::debug!("arch {}: {}", arch, if ok { "yes" } else { "no" });
        if ok {
            valid.push(arch);
        }
    }
    valid
}

/// Runs the system C/C++ compiler in a scratch directory.
#[derive(Debug, Clone, Default)]
pub struct CompilerChecker {
    cc: Option<PathBuf>,
    cxx: Option<PathBuf>,
}

impl CompilerChecker {
    /// Use the compilers found in `CC`/`CXX` or PATH.
    pub fn detect() -> Self {
        CompilerChecker {
            cc: find_c_compiler(),
            cxx: find_cxx_compiler(),
        }
    }

    pub fn with_cc(mut self, cc: impl Into<PathBuf>) -> Self {
        self.cc = Some(cc.into());
        self
    }

    pub fn with_cxx(mut self, cxx: impl Into<PathBuf>) -> Self {
        self.cxx = Some(cxx.into());
        self
    }

    fn compiler(&self, lang: Lang) -> Option<&Path> {
        match lang {
            Lang::C => self.cc.as_deref(),
            Lang::Cxx => self.cxx.as_deref(),
        }
    }

    fn command(
        &self,
        compiler: &Path,
        env: &BuildEnv,
        dir: &Path,
        src: &Path,
        lang: Lang,
        link: bool,
    ) -> ProcessBuilder {
        let msvc = compiler
            .file_stem()
            .is_some_and(|s| s.to_string_lossy().eq_ignore_ascii_case("cl"));
        let mut pb = ProcessBuilder::new(compiler).cwd(dir);
        let inc = if msvc { "/I" } else { "-I" };
        let def = if msvc { "/D" } else { "-D" };

        if msvc {
            pb = pb.arg("/nologo");
        }
        pb = pb.args(env.get_list(keys::CCFLAGS));
        if lang == Lang::Cxx {
            pb = pb.args(env.get_list(keys::CXXFLAGS));
        }
        for path in env.get_list(keys::CPPPATH) {
            pb = pb.arg(format!("{}{}", inc, path));
        }
        for define in env.get_list(keys::CPPDEFINES) {
            pb = pb.arg(format!("{}{}", def, define));
        }

        if !link {
            let flag = if msvc { "/c" } else { "-c" };
            return pb.arg(flag).arg(src);
        }

        pb = pb.arg(src);
        if msvc {
            pb = pb.arg("/link");
            for path in env.get_list(keys::LIBPATH) {
                pb = pb.arg(format!("/LIBPATH:{}", path));
            }
            for lib in env.get_list(keys::LIBS) {
                pb = pb.arg(format!("{}.lib", lib));
            }
        } else {
            pb = pb.arg("-o").arg(dir.join("conftest"));
            for path in env.get_list(keys::LIBPATH) {
                pb = pb.arg(format!("-L{}", path));
            }
            for lib in env.get_list(keys::LIBS) {
                pb = pb.arg(format!("-l{}", lib));
            }
        }
        pb.args(env.get_list(keys::LINKFLAGS))
    }

    fn run(&self, env: &BuildEnv, source: &str, lang: Lang, link: bool) -> Result<bool> {
        let Some(compiler) = self.compiler(lang) else {
            tracing::debug!("no compiler available for {:?}", lang);
            return Ok(false);
        };

        let dir = TempDir::new().context("failed to create trial build directory")?;
        let src = dir.path().join(format!("conftest.{}", lang.extension()));
        std::fs::write(&src, source)
            .with_context(|| format!("failed to write {}", src.display()))?;

        let output = self.command(compiler, env, dir.path(), &src, lang, link).exec()?;
        if !output.status.success() {
            tracing::debug!(
                "trial build failed:\n{}",
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(output.status.success())
    }
}

impl Checker for CompilerChecker {
    fn try_build(&self, env: &BuildEnv, source: &str, lang: Lang, link: bool) -> bool {
        self.run(env, source, lang, link).unwrap_or_else(|e| {
            tracing::debug!("trial build error: {:#}", e);
            false
        })
    }
}
