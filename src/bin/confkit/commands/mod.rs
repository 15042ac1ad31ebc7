//! Command implementations

pub mod completions;
pub mod dist;
pub mod init;
pub mod options;
pub mod platform;
pub mod probe;
pub mod variants;
