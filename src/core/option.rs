//! The option abstraction.
//!
//! An option is one detectable or configurable build input. The registry
//! drives every option through the same lifecycle:
//!
//! ```text
//! start -> seed_initial -> probe -> validate -> complete -> apply
//! ```
//!
//! `seed_initial` reads previously persisted or user-supplied settings,
//! `probe` looks at the machine only for what is still unknown, and
//! `validate` checks the result. An option whose validation fails clears
//! its discovered state and reports itself unavailable, so options that
//! depend on it are never processed.

use std::fmt;

use serde::Serialize;

use crate::core::env::BuildEnv;
use crate::core::errors::OptionError;
use crate::core::settings::{Settings, Value};
use crate::probe::ProbeContext;

/// Broad category of an option, used to filter [`apply`](BuildOption::apply).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Simple,
    Bool,
    Enum,
    List,
    Separator,
    Package,
}

impl OptionKind {
    /// Kinds whose value comes straight from the user rather than a probe.
    pub const SIMPLE_KINDS: [OptionKind; 4] = [
        OptionKind::Simple,
        OptionKind::Bool,
        OptionKind::List,
        OptionKind::Enum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKind::Simple => "simple",
            OptionKind::Bool => "bool",
            OptionKind::Enum => "enum",
            OptionKind::List => "list",
            OptionKind::Separator => "separator",
            OptionKind::Package => "package",
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Help text: one string for the whole option or one per key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionHelp {
    Single(String),
    PerKey(Vec<String>),
}

impl OptionHelp {
    /// Help for the key at `index`. A single help string covers every key.
    pub fn for_key(&self, index: usize) -> &str {
        match self {
            OptionHelp::Single(text) => text,
            OptionHelp::PerKey(texts) => texts.get(index).map(String::as_str).unwrap_or(""),
        }
    }
}

impl From<&str> for OptionHelp {
    fn from(text: &str) -> Self {
        OptionHelp::Single(text.to_string())
    }
}

impl From<String> for OptionHelp {
    fn from(text: String) -> Self {
        OptionHelp::Single(text)
    }
}

impl From<Vec<String>> for OptionHelp {
    fn from(texts: Vec<String>) -> Self {
        OptionHelp::PerKey(texts)
    }
}

/// True for names usable as construction variables.
pub fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A unit of build configuration that can be discovered and applied.
pub trait BuildOption: fmt::Debug {
    /// Identity used for dependencies and lookups.
    fn name(&self) -> &str;

    /// Construction variables this option reads and writes.
    fn keys(&self) -> &[String];

    fn help(&self) -> &OptionHelp;

    fn kind(&self) -> OptionKind;

    /// Names of options that must be available before this one runs.
    fn dependencies(&self) -> &[String] {
        &[]
    }

    /// Whether a failed validation should stop processing.
    fn is_required(&self) -> bool {
        false
    }

    fn is_available(&self) -> bool;

    fn set_verbose(&mut self, _verbose: bool) {}

    /// Announce that processing begins.
    fn start(&mut self) {
        tracing::debug!("processing option {}", self.name());
    }

    /// Seed state from persisted or command-line settings.
    fn seed_initial(&mut self, settings: &Settings) -> Result<(), OptionError>;

    /// Probe the system for anything `seed_initial` did not provide.
    fn probe(&mut self, _ctx: &ProbeContext) -> Result<(), OptionError> {
        Ok(())
    }

    /// Check the discovered state against `env`, which already carries the
    /// flags of every available dependency. On failure the option must
    /// clear its state and become unavailable before returning the error.
    fn validate(&mut self, _env: &BuildEnv, _ctx: &ProbeContext) -> Result<(), OptionError> {
        Ok(())
    }

    /// Signal that processing finished.
    fn complete(&mut self) {}

    /// Write this option's flags into `env`.
    fn apply(&self, env: &mut BuildEnv);

    /// Current `(key, value)` pairs to persist. Unset keys are omitted.
    fn settings(&self) -> Vec<(String, Value)>;

    /// Render an environment value for help output.
    fn display_value(&self, value: &Value) -> String {
        value.to_string()
    }

    /// The value persisted for the key at `index`.
    fn value(&self, index: usize) -> Option<Value> {
        let key = self.keys().get(index)?;
        self.settings()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("SdlDir"));
        assert!(is_valid_key("_private"));
        assert!(is_valid_key("var_type2"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("2fast"));
        assert!(!is_valid_key("has-dash"));
        assert!(!is_valid_key("has space"));
    }

    #[test]
    fn test_help_for_key() {
        let single = OptionHelp::from("Base directory");
        assert_eq!(single.for_key(0), "Base directory");
        assert_eq!(single.for_key(2), "Base directory");

        let per_key = OptionHelp::from(vec!["base".to_string(), "include".to_string()]);
        assert_eq!(per_key.for_key(1), "include");
        assert_eq!(per_key.for_key(5), "");
    }
}
