//! Core data structures for confkit.
//!
//! This module contains the foundational types used throughout confkit:
//! - The build environment options write into
//! - The option trait, its registry and the settings cache
//! - Variant axes and combinations, and the compiler flags each variant gets
//! - The Confkit.toml manifest

pub mod env;
pub mod env_builder;
pub mod errors;
pub mod manifest;
pub mod option;
pub mod registry;
pub mod settings;
pub mod variant;

pub use env::BuildEnv;
pub use env_builder::{CompilerFlags, EnvBuilder, Level};
pub use errors::OptionError;
pub use manifest::{Manifest, MANIFEST_NAME};
pub use option::{BuildOption, OptionHelp, OptionKind};
pub use registry::{ApplyFilter, OptionRegistry, ProcessReport};
pub use settings::{Settings, Value};
pub use variant::{Combination, VariantAxis, VariantBuild, VariantSet};
