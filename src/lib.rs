//! confkit - probe a machine for C/C++ libraries and package the results
//!
//! This crate provides the core library functionality for confkit:
//! option objects that look for installed packages and splice their flags
//! into a build environment, the dependency-ordered processor that runs
//! them, variant enumeration and distribution packaging.

pub mod core;
pub mod dist;
pub mod ops;
pub mod options;
pub mod probe;
pub mod util;

/// Test utilities and mocks for confkit unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a scripted trial-build checker, fake
/// options and helper scripts, and project fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{
    BuildEnv, BuildOption, Manifest, OptionError, OptionRegistry, Settings, Value, VariantSet,
};
pub use dist::{Package, Packager};
pub use probe::ProbeContext;
pub use util::context::GlobalContext;
