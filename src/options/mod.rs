//! The concrete option kinds.
//!
//! Value options ([`SimpleOption`], [`BoolOption`], [`EnumOption`],
//! [`ListOption`]) take what the user or the cache supplies. Package
//! options ([`StandardPackageOption`], [`PkgConfigOption`],
//! [`ConfigCmdOption`]) look at the machine and become available only when
//! validation passes. [`SeparatorOption`] only structures help output.

pub mod boolean;
pub mod config_cmd;
pub mod enumerated;
pub mod list;
pub mod package;
pub mod pkg_config;
pub mod separator;
pub mod simple;

pub use boolean::{parse_bool, BoolOption};
pub use config_cmd::ConfigCmdOption;
pub use enumerated::EnumOption;
pub use list::ListOption;
pub use package::{Libraries, StandardPackageOption};
pub use pkg_config::PkgConfigOption;
pub use separator::SeparatorOption;
pub use simple::SimpleOption;
