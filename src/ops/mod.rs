//! High-level operations.
//!
//! This module contains the implementation of confkit commands.

pub mod confkit_dist;
pub mod confkit_init;
pub mod confkit_probe;
pub mod confkit_variants;
pub mod platform;
pub mod project;

pub use confkit_dist::{dist, DistFormat, DistOptions};
pub use confkit_init::init_project;
pub use confkit_probe::{
    format_probe_report, options_help, probe, probe_json, probe_with, ProbeOptions, ProbeOutcome,
};
pub use confkit_variants::{format_variants, variant_builds};
pub use platform::{format_platform_report, platform_report, PlatformReport, ToolCheck};
pub use project::Project;
