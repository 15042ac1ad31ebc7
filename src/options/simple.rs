//! Single-key options whose value is supplied by the user.

use std::fmt;

use crate::core::env::BuildEnv;
use crate::core::errors::OptionError;
use crate::core::option::{BuildOption, OptionHelp, OptionKind};
use crate::core::settings::{Settings, Value};
use crate::probe::ProbeContext;

/// Checks a converted value; the error string becomes the failure reason.
pub type Validator = Box<dyn Fn(&str, &Value) -> Result<(), String>>;

/// Converts a raw setting into the value stored in the environment.
pub type Converter = Box<dyn Fn(&Value) -> Result<Value, String>>;

/// Computes a value when none was supplied.
pub type Finder = Box<dyn Fn(&str, &ProbeContext) -> Option<Value>>;

/// A plain `KEY=value` option.
pub struct SimpleOption {
    keys: Vec<String>,
    help: OptionHelp,
    default: Option<Value>,
    value: Option<Value>,
    finder: Option<Finder>,
    converter: Option<Converter>,
    validator: Option<Validator>,
}

impl SimpleOption {
    pub fn new(key: &str, help: &str) -> Self {
        SimpleOption {
            keys: vec![key.to_string()],
            help: help.into(),
            default: None,
            value: None,
            finder: None,
            converter: None,
            validator: None,
        }
    }

    /// Value used when neither settings nor a finder provide one.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_finder(mut self, finder: Finder) -> Self {
        self.finder = Some(finder);
        self
    }

    pub fn with_converter(mut self, converter: Converter) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    fn key(&self) -> &str {
        &self.keys[0]
    }
}

impl fmt::Debug for SimpleOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleOption")
            .field("key", &self.key())
            .field("default", &self.default)
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

impl BuildOption for SimpleOption {
    fn name(&self) -> &str {
        self.key()
    }

    fn keys(&self) -> &[String] {
        &self.keys
    }

    fn help(&self) -> &OptionHelp {
        &self.help
    }

    fn kind(&self) -> OptionKind {
        OptionKind::Simple
    }

    fn is_available(&self) -> bool {
        true
    }

    fn seed_initial(&mut self, settings: &Settings) -> Result<(), OptionError> {
        if let Some(value) = settings.get(self.key()) {
            self.value = Some(value.clone());
        }
        Ok(())
    }

    fn probe(&mut self, ctx: &ProbeContext) -> Result<(), OptionError> {
        if self.value.is_none() {
            self.value = match &self.finder {
                Some(finder) => finder(self.key(), ctx),
                None => None,
            }
            .or_else(|| self.default.clone());
        }
        Ok(())
    }

    fn validate(&mut self, _env: &BuildEnv, _ctx: &ProbeContext) -> Result<(), OptionError> {
        let Some(value) = self.value.take() else {
            return Ok(());
        };

        let converted = match &self.converter {
            Some(convert) => convert(&value)
                .map_err(|reason| OptionError::invalid_value(self.key(), value.to_string(), reason))?,
            None => value,
        };
        if let Some(validate) = &self.validator {
            validate(self.key(), &converted).map_err(|reason| {
                OptionError::invalid_value(self.key(), converted.to_string(), reason)
            })?;
        }
        self.value = Some(converted);
        Ok(())
    }

    fn apply(&self, env: &mut BuildEnv) {
        if let Some(value) = &self.value {
            env.set(self.key(), value.clone());
        }
    }

    fn settings(&self) -> Vec<(String, Value)> {
        self.value
            .iter()
            .map(|v| (self.key().to_string(), v.clone()))
            .collect()
    }
}
