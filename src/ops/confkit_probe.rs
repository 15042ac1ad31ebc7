//! Implementation of `confkit probe` and `confkit options`.
//!
//! Probing loads the settings cache plus command-line overrides, runs every
//! declared option through the dependency fix-point, applies the available
//! ones to a fresh [`BuildEnv`] and, unless told otherwise, writes the
//! settings back so the next run starts from them.

use std::fmt::Write;
use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use crate::core::env::BuildEnv;
use crate::core::option::OptionKind;
use crate::core::registry::{ApplyFilter, OptionRegistry, ProcessReport};
use crate::core::settings::Value;
use crate::core::variant::{Combination, VariantSet};
use crate::ops::project::Project;
use crate::probe::ProbeContext;

/// Options for a probe run.
#[derive(Debug, Clone, Default)]
pub struct ProbeOptions {
    /// `KEY=VALUE` overrides
    pub args: Vec<String>,

    /// Write the settings cache afterwards
    pub save: bool,
}

/// Everything a probe run produced.
#[derive(Debug)]
pub struct ProbeOutcome {
    pub registry: OptionRegistry,
    pub report: ProcessReport,
    pub env: BuildEnv,
    pub variants: VariantSet,
    pub cache_file: PathBuf,
    pub saved: bool,
}

/// Probe with a context built from the project configuration.
pub fn probe(project: &Project, opts: &ProbeOptions) -> Result<ProbeOutcome> {
    let ctx = project.probe_context();
    probe_with(project, &ctx, opts)
}

/// Probe with an explicit context.
pub fn probe_with(project: &Project, ctx: &ProbeContext, opts: &ProbeOptions) -> Result<ProbeOutcome> {
    let mut variants = project.variant_set(ctx);
    let cache_file = project.cache_file();

    let mut registry = project
        .manifest
        .registry(&variants)?
        .with_files(vec![cache_file.clone()])
        .with_args(project.setting_args(&opts.args));
    registry.set_verbose(ctx.is_verbose());

    tracing::debug!(
        "probing {} options for {}",
        registry.len(),
        project.name()
    );

    let mut env = BuildEnv::new(ctx.platform());
    let report = registry.process(&mut env, ctx, true)?;
    registry.apply(
        &mut env,
        &ApplyFilter::Selected {
            kinds: vec![OptionKind::Package],
            names: Vec::new(),
        },
    );
    variants.read_options(&env);

    let saved = if opts.save {
        registry.save(&cache_file)?;
        tracing::debug!("saved settings to {}", cache_file.display());
        true
    } else {
        false
    };

    Ok(ProbeOutcome {
        registry,
        report,
        env,
        variants,
        cache_file,
        saved,
    })
}

/// Option help with the values a probe run settled on.
pub fn options_help(project: &Project, args: &[String], width: usize) -> Result<String> {
    let outcome = probe(
        project,
        &ProbeOptions {
            args: args.to_vec(),
            save: false,
        },
    )?;
    Ok(outcome.registry.help_text(&outcome.env, width))
}

/// Human-readable summary of a probe run.
pub fn format_probe_report(outcome: &ProbeOutcome) -> String {
    let mut output = String::new();

    writeln!(output, "Options:").unwrap();
    for option in outcome.registry.iter() {
        if option.kind() != OptionKind::Package {
            continue;
        }
        let status = if option.is_available() {
            "[OK]"
        } else if outcome.report.blocked.iter().any(|b| b.name == option.name()) {
            "[--]"
        } else {
            "[!!]"
        };
        let required = if option.is_required() { " (required)" } else { "" };
        writeln!(output, "  {} {}{}", status, option.name(), required).unwrap();
    }
    for blocked in &outcome.report.blocked {
        writeln!(
            output,
            "      {} waits on: {}",
            blocked.name,
            blocked.missing.join(", ")
        )
        .unwrap();
    }
    writeln!(output).unwrap();

    writeln!(output, "Build environment:").unwrap();
    for (key, value) in outcome.env.iter() {
        writeln!(output, "  {} = {}", key, value).unwrap();
    }

    let combos = outcome.variants.combinations();
    if !outcome.variants.axes().is_empty() {
        writeln!(output).unwrap();
        writeln!(output, "Variants: {} combination(s)", combos.len()).unwrap();
    }

    if outcome.saved {
        writeln!(output).unwrap();
        writeln!(output, "Settings saved to {}", outcome.cache_file.display()).unwrap();
    }
    output
}

#[derive(Serialize)]
struct JsonReport<'a> {
    report: &'a ProcessReport,
    env: serde_json::Map<String, serde_json::Value>,
    settings: serde_json::Map<String, serde_json::Value>,
    variants: Vec<Combination>,
    cache_file: &'a PathBuf,
    saved: bool,
}

fn value_to_json(value: &Value) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

/// Machine-readable form of a probe run.
pub fn probe_json(outcome: &ProbeOutcome) -> Result<String> {
    let env = outcome
        .env
        .iter()
        .map(|(k, v)| (k.clone(), value_to_json(v)))
        .collect();
    let settings = outcome
        .registry
        .collect_settings()
        .iter()
        .map(|(k, v)| (k.clone(), value_to_json(v)))
        .collect();

    let report = JsonReport {
        report: &outcome.report,
        env,
        settings,
        variants: outcome.variants.combinations(),
        cache_file: &outcome.cache_file,
        saved: outcome.saved,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}
