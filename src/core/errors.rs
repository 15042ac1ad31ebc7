//! Option processing errors and their diagnostics.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error raised while probing, validating or configuring an option.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum OptionError {
    #[error("{option}: could not find {what}")]
    #[diagnostic(
        code(confkit::probe::not_found),
        help("Install the package or point the option at its location")
    )]
    ProbeNotFound { option: String, what: String },

    #[error("{option}: found version {found}, need at least {required}")]
    #[diagnostic(code(confkit::probe::version_too_old))]
    VersionTooOld {
        option: String,
        required: String,
        found: String,
    },

    #[error("{option}: trial build failed ({check})")]
    #[diagnostic(code(confkit::probe::compile_failed))]
    CompileCheckFailed { option: String, check: String },

    #[error("{option}: dependencies not available: {}", .missing.join(", "))]
    #[diagnostic(code(confkit::options::dependency_unsatisfied))]
    DependencyUnsatisfied { option: String, missing: Vec<String> },

    #[error("{option}: invalid value `{value}`: {reason}")]
    #[diagnostic(code(confkit::options::invalid_value))]
    InvalidValue {
        option: String,
        value: String,
        reason: String,
    },

    #[error("`{key}` is not a valid construction variable name")]
    #[diagnostic(
        code(confkit::options::invalid_key),
        help("Keys must start with a letter or `_` and contain only letters, digits and `_`")
    )]
    InvalidKey { key: String },

    #[error("an option named `{name}` is already registered")]
    #[diagnostic(code(confkit::options::duplicate))]
    Duplicate { name: String },
}

impl OptionError {
    /// Name of the option the error belongs to.
    pub fn option(&self) -> &str {
        match self {
            OptionError::ProbeNotFound { option, .. }
            | OptionError::VersionTooOld { option, .. }
            | OptionError::CompileCheckFailed { option, .. }
            | OptionError::DependencyUnsatisfied { option, .. }
            | OptionError::InvalidValue { option, .. } => option,
            OptionError::InvalidKey { key } => key,
            OptionError::Duplicate { name } => name,
        }
    }

    pub fn invalid_value(
        option: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        OptionError::InvalidValue {
            option: option.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(option: impl Into<String>, what: impl Into<String>) -> Self {
        OptionError::ProbeNotFound {
            option: option.into(),
            what: what.into(),
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            OptionError::ProbeNotFound { option, what } => {
                Diagnostic::error(format!("could not find {} for `{}`", what, option))
                    .with_suggestion(suggestions::COMMAND_NOT_FOUND)
            }

            OptionError::VersionTooOld {
                option,
                required,
                found,
            } => Diagnostic::error(format!("`{}` is too old", option))
                .with_context(format!("found version {}", found))
                .with_context(format!("required version {} or newer", required))
                .with_suggestion(format!("Install {} {} or newer", option, required)),

            OptionError::CompileCheckFailed { option, check } => {
                Diagnostic::error(format!("trial build for `{}` failed", option))
                    .with_context(check.clone())
                    .with_suggestion(suggestions::COMPILE_FAILED)
            }

            OptionError::DependencyUnsatisfied { option, missing } => {
                let mut diag =
                    Diagnostic::error(format!("`{}` could not be processed", option));
                for dep in missing {
                    diag = diag.with_context(format!("requires `{}`, which is unavailable", dep));
                }
                diag.with_suggestion(suggestions::BLOCKED)
            }

            OptionError::InvalidValue {
                option,
                value,
                reason,
            } => Diagnostic::error(format!("invalid value for `{}`", option))
                .with_context(format!("`{}`: {}", value, reason))
                .with_suggestion(suggestions::STALE_CACHE),

            OptionError::InvalidKey { key } => {
                Diagnostic::error(format!("illegal construction variable `{}`", key))
            }

            OptionError::Duplicate { name } => {
                Diagnostic::error(format!("option `{}` declared twice", name))
                    .with_suggestion("Rename one of the options")
            }
        }
    }
}
