//! Implementation of `confkit variants`.

use std::fmt::Write;

use anyhow::Result;

use crate::core::env::BuildEnv;
use crate::core::registry::OptionRegistry;
use crate::core::variant::VariantBuild;
use crate::ops::project::Project;
use crate::probe::ProbeContext;

/// The combinations to build, after narrowing the axes with cached and
/// command-line `var_<axis>` selections.
pub fn variant_builds(
    project: &Project,
    ctx: &ProbeContext,
    args: &[String],
) -> Result<Vec<VariantBuild>> {
    let mut variants = project.variant_set(ctx);
    if variants.axes().is_empty() {
        return Ok(Vec::new());
    }

    let mut registry = OptionRegistry::new()
        .with_files(vec![project.cache_file()])
        .with_args(project.setting_args(args));
    variants.add_options(&mut registry)?;

    let mut env = BuildEnv::new(ctx.platform());
    registry.process(&mut env, ctx, true)?;
    variants.read_options(&env);

    Ok(variants.builds(ctx.platform()))
}

/// One line per combination, with naming details when `verbose`.
pub fn format_variants(builds: &[VariantBuild], verbose: bool) -> String {
    let mut output = String::new();
    if builds.is_empty() {
        writeln!(output, "No variant axes declared").unwrap();
        return output;
    }

    for build in builds {
        writeln!(output, "{:>3}: {}", build.pass, build.combo).unwrap();
        if verbose {
            writeln!(output, "     dir: {}", build.combo_dir).unwrap();
            if !build.lib_subdir.is_empty() {
                writeln!(output, "     lib subdir: {}", build.lib_subdir).unwrap();
            }
            if !build.runtime_suffix.is_empty() {
                writeln!(output, "     runtime suffix: {}", build.runtime_suffix).unwrap();
            }
            if !build.arch_flags.is_empty() {
                writeln!(output, "     arch flags: {}", build.arch_flags.join(" ")).unwrap();
            }
            if !build.flags.ccflags.is_empty() {
                writeln!(output, "     CCFLAGS: {}", build.flags.ccflags.join(" ")).unwrap();
            }
            if !build.flags.cppdefines.is_empty() {
                writeln!(output, "     CPPDEFINES: {}", build.flags.cppdefines.join(" ")).unwrap();
            }
        }
    }
    writeln!(output, "\n{} combination(s)", builds.len()).unwrap();
    output
}
