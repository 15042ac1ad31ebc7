//! Persisted option settings.
//!
//! The cache file is a list of `key = value` assignments whose values are
//! written as Python-style literals:
//!
//! ```text
//! # confkit settings
//! SdlDir = '/opt/sdl'
//! BuildTests = True
//! Jobs = 4
//! var_type = ['debug', 'optimized']
//! ```
//!
//! Command-line overrides (`KEY=VALUE`) are layered on top as raw strings.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single setting value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    /// The value as a string slice, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Flatten into strings: a scalar becomes a one-element list.
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            Value::List(items) => items.iter().flat_map(Value::to_strings).collect(),
            Value::Str(s) => vec![s.clone()],
            other => vec![other.to_string()],
        }
    }

    /// Whether the value carries no information worth persisting.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Str(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Render as a literal that [`parse_literal`] reads back.
    pub fn to_literal(&self) -> String {
        match self {
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Str(s) => {
                let mut out = String::with_capacity(s.len() + 2);
                out.push('\'');
                for c in s.chars() {
                    match c {
                        '\\' => out.push_str("\\\\"),
                        '\'' => out.push_str("\\'"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\t' => out.push_str("\\t"),
                        c => out.push(c),
                    }
                }
                out.push('\'');
                out
            }
            Value::List(items) => {
                let inner: Vec<String> = items.iter().map(Value::to_literal).collect();
                format!("[{}]", inner.join(", "))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                let inner: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "[{}]", inner.join(", "))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items.into_iter().map(Value::Str).collect())
    }
}

/// Error reading a settings file.
#[derive(Debug, Error, PartialEq)]
#[error("line {line}: {message}")]
pub struct ParseSettingsError {
    pub line: usize,
    pub message: String,
}

/// Settings keyed by construction variable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    values: BTreeMap<String, Value>,
}

impl Settings {
    pub fn new() -> Self {
        Settings::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String form of a setting. Lists are comma-joined.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| match v {
            Value::List(_) => v.to_strings().join(","),
            other => other.to_string(),
        })
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Overlay another set of settings (other takes precedence).
    pub fn merge(&mut self, other: Settings) {
        self.values.extend(other.values);
    }

    /// Parse the text of a settings file.
    pub fn parse(text: &str) -> Result<Self, ParseSettingsError> {
        let mut settings = Settings::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let err = |message: String| ParseSettingsError {
                line: idx + 1,
                message,
            };

            let (key, rest) = line
                .split_once('=')
                .ok_or_else(|| err("expected `key = value`".to_string()))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(err("missing key".to_string()));
            }

            // `None` means "unset" and is skipped.
            if let Some(value) = parse_literal(rest.trim()).map_err(err)? {
                settings.set(key, value);
            }
        }

        Ok(settings)
    }

    /// Load a settings file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings: {}", path.display()))?;
        Settings::parse(&text)
            .with_context(|| format!("failed to parse settings: {}", path.display()))
    }

    /// Merge every existing file in order. Missing files are skipped.
    pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut settings = Settings::new();
        for path in paths {
            let path = path.as_ref();
            if path.exists() {
                tracing::debug!("loading settings from {}", path.display());
                settings.merge(Settings::load(path)?);
            }
        }
        Ok(settings)
    }

    /// Apply `KEY=VALUE` overrides. Values stay raw strings.
    pub fn apply_args<S: AsRef<str>>(&mut self, args: &[S]) -> Result<(), ParseSettingsError> {
        for (idx, arg) in args.iter().enumerate() {
            let arg = arg.as_ref();
            let (key, value) = arg.split_once('=').ok_or_else(|| ParseSettingsError {
                line: idx + 1,
                message: format!("expected KEY=VALUE, got `{}`", arg),
            })?;
            self.set(key.trim(), value.to_string());
        }
        Ok(())
    }
}

/// Render `key = literal` lines, skipping empty values.
pub fn render_settings(entries: &[(String, Value)]) -> String {
    let mut out = String::from("# confkit settings\n");
    for (key, value) in entries {
        if value.is_empty() {
            continue;
        }
        out.push_str(&format!("{} = {}\n", key, value.to_literal()));
    }
    out
}

/// Parse one literal. Returns `Ok(None)` for `None`.
pub fn parse_literal(text: &str) -> Result<Option<Value>, String> {
    let mut parser = LiteralParser {
        chars: text.chars().collect(),
        pos: 0,
    };
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos != parser.chars.len() {
        return Err(format!("unexpected trailing input in `{}`", text));
    }
    Ok(value)
}

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
}

impl LiteralParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> Result<Option<Value>, String> {
        self.skip_ws();
        match self.peek() {
            Some(q @ ('\'' | '"')) => self.string(q).map(|s| Some(Value::Str(s))),
            Some('[') => self.list().map(|l| Some(Value::List(l))),
            Some(c) if c.is_ascii_digit() || c == '-' => self.int().map(|i| Some(Value::Int(i))),
            Some(c) if c.is_ascii_alphabetic() => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_alphanumeric()) {
                    self.pos += 1;
                }
                let word: String = self.chars[start..self.pos].iter().collect();
                match word.as_str() {
                    "True" => Ok(Some(Value::Bool(true))),
                    "False" => Ok(Some(Value::Bool(false))),
                    "None" => Ok(None),
                    other => Err(format!("unknown literal `{}`", other)),
                }
            }
            Some(c) => Err(format!("unexpected character `{}`", c)),
            None => Err("missing value".to_string()),
        }
    }

    fn string(&mut self, quote: char) -> Result<String, String> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err("unterminated string".to_string()),
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some('\\') => {
                    self.pos += 1;
                    let escaped = self.peek().ok_or("unterminated escape")?;
                    out.push(match escaped {
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        other => other,
                    });
                    self.pos += 1;
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn int(&mut self) -> Result<i64, String> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse()
            .map_err(|_| format!("invalid integer `{}`", text))
    }

    fn list(&mut self) -> Result<Vec<Value>, String> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(']') {
                self.pos += 1;
                return Ok(items);
            }
            if let Some(item) = self.value()? {
                items.push(item);
            }
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {}
                Some(c) => return Err(format!("expected `,` or `]`, found `{}`", c)),
                None => return Err("unterminated list".to_string()),
            }
        }
    }
}
