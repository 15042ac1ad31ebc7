//! User-facing diagnostic messages.
//!
//! Every probe failure should tell the user what was looked for, where,
//! and which setting would point confkit at the right place.

use std::fmt;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when a helper command cannot be found.
    pub const COMMAND_NOT_FOUND: &str =
        "Install the development package or pass its location as KEY=/path";

    /// Suggestion when a trial build fails.
    pub const COMPILE_FAILED: &str = "Re-run with --verbose to see the compiler output";

    /// Suggestion when an option is blocked on another option.
    pub const BLOCKED: &str = "Make the missing dependency available or mark this option optional";

    /// Suggestion when a cache value no longer parses.
    pub const STALE_CACHE: &str = "Delete the settings cache file and probe again";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Settings or installs that would fix it
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    fn with_severity(message: impl Into<String>, severity: Severity) -> Self {
        Diagnostic {
            message: message.into(),
            severity,
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Self::with_severity(message, Severity::Error)
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_severity(message, Severity::Warning)
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Render for the terminal, with ANSI colors when `color` is set.
    pub fn format(&self, color: bool) -> String {
        let paint = |code: &str, text: &str| {
            if color {
                format!("\x1b[1;{}m{}\x1b[0m", code, text)
            } else {
                text.to_string()
            }
        };
        let severity = match self.severity {
            Severity::Error => paint("31", "error"),
            Severity::Warning => paint("33", "warning"),
        };

        let mut output = format!("{}: {}\n", severity, self.message);
        for line in &self.context {
            output.push_str(&format!("  = {}\n", line));
        }
        match self.suggestions.as_slice() {
            [] => {}
            [only] => output.push_str(&format!("{}: {}\n", paint("32", "help"), only)),
            many => {
                output.push_str(&format!("{}: try one of:\n", paint("32", "help")));
                for suggestion in many {
                    output.push_str(&format!("  - {}\n", suggestion));
                }
            }
        }
        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}
