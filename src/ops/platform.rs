//! Host facts and tool availability for `confkit platform`.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::probe::{detect_valid_archs, ProbeContext};
use crate::util::config::Config;
use crate::util::process::{find_c_compiler, find_cxx_compiler, find_executable, ProcessBuilder};

/// Result of looking for one tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCheck {
    /// Name of the tool
    pub name: String,

    /// Where it was found
    pub path: Option<PathBuf>,

    /// First line of its version output
    pub version: Option<String>,

    /// Whether probing needs it
    pub required: bool,
}

impl ToolCheck {
    fn found(&self) -> bool {
        self.path.is_some()
    }
}

/// What confkit sees on this machine.
#[derive(Debug, Clone, Serialize)]
pub struct PlatformReport {
    pub platform: String,
    pub arch: String,
    /// Architectures the C compiler can target
    pub valid_archs: Vec<String>,
    pub tools: Vec<ToolCheck>,
}

impl PlatformReport {
    pub fn all_required_found(&self) -> bool {
        self.tools.iter().filter(|t| t.required).all(ToolCheck::found)
    }
}

fn tool_version(path: &Path, flag: &str) -> Option<String> {
    ProcessBuilder::new(path)
        .arg(flag)
        .read_stdout()
        .ok()
        .and_then(|out| out.lines().next().map(str::to_string))
}

fn check_tool(name: &str, path: Option<PathBuf>, version_flag: &str, required: bool) -> ToolCheck {
    let version = path.as_ref().and_then(|p| tool_version(p, version_flag));
    ToolCheck {
        name: name.to_string(),
        path,
        version,
        required,
    }
}

/// Collect host facts. Architecture detection runs trial builds through
/// the context's checker.
pub fn platform_report(ctx: &ProbeContext, config: &Config) -> PlatformReport {
    let valid_archs = detect_valid_archs(ctx.checker(), ctx.platform(), ctx.arch())
        .iter()
        .map(|a| a.as_str().to_string())
        .collect();

    let cc = config.probe.cc.clone().or_else(find_c_compiler);
    let cxx = config.probe.cxx.clone().or_else(find_cxx_compiler);
    let rpmbuild = config.dist.rpmbuild.as_deref().unwrap_or("rpmbuild");

    let tools = vec![
        check_tool("C compiler", cc, "--version", true),
        check_tool("C++ compiler", cxx, "--version", true),
        check_tool(
            config.pkg_config_tool(),
            find_executable(config.pkg_config_tool()),
            "--version",
            false,
        ),
        check_tool("rpmbuild", find_executable(rpmbuild), "--version", false),
    ];

    PlatformReport {
        platform: ctx.platform().to_string(),
        arch: ctx.arch().to_string(),
        valid_archs,
        tools,
    }
}

/// Format the report for terminal output.
pub fn format_platform_report(report: &PlatformReport, verbose: bool) -> String {
    let mut output = String::new();

    writeln!(output, "Platform: {}", report.platform).unwrap();
    writeln!(output, "Arch:     {}", report.arch).unwrap();
    if report.valid_archs.is_empty() {
        writeln!(output, "Targets:  (none detected)").unwrap();
    } else {
        writeln!(output, "Targets:  {}", report.valid_archs.join(", ")).unwrap();
    }
    writeln!(output).unwrap();

    writeln!(output, "Tools:").unwrap();
    for tool in &report.tools {
        let status = if tool.found() { "[OK]" } else { "[!!]" };
        let required = if tool.required { "" } else { " (optional)" };
        writeln!(output, "  {} {}{}", status, tool.name, required).unwrap();

        if verbose {
            if let Some(path) = &tool.path {
                writeln!(output, "      Path: {}", path.display()).unwrap();
            }
            if let Some(version) = &tool.version {
                writeln!(output, "      Version: {}", version).unwrap();
            }
        }
    }
    if !report.all_required_found() {
        writeln!(output).unwrap();
        writeln!(output, "Trial builds need a C and a C++ compiler; set CC/CXX or [probe] cc/cxx").unwrap();
    }
    output
}
