use std::collections::BTreeMap;

use crate::core::env::BuildEnv;
use crate::core::errors::OptionError;
use crate::core::option::{BuildOption, OptionHelp, OptionKind};
use crate::core::settings::{Settings, Value};
use crate::probe::ProbeContext;

/// One choice out of a fixed set. Each choice may map to a different
/// value written into the environment.
#[derive(Debug, Clone)]
pub struct EnumOption {
    keys: Vec<String>,
    base_help: String,
    help: OptionHelp,
    default: String,
    allowed: Vec<String>,
    mapping: BTreeMap<String, Value>,
    value: Option<String>,
}

impl EnumOption {
    /// An empty `allowed` list means the mapping keys define the choices.
    pub fn new(key: &str, help: &str, default: &str, allowed: &[&str]) -> Self {
        let mut option = EnumOption {
            keys: vec![key.to_string()],
            base_help: help.to_string(),
            help: OptionHelp::from(help),
            default: default.to_string(),
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
            mapping: BTreeMap::new(),
            value: None,
        };
        option.refresh_help();
        option
    }

    pub fn with_mapping(mut self, choice: &str, value: impl Into<Value>) -> Self {
        self.mapping.insert(choice.to_string(), value.into());
        self.refresh_help();
        self
    }

    pub fn allowed(&self) -> Vec<&str> {
        if self.allowed.is_empty() {
            self.mapping.keys().map(String::as_str).collect()
        } else {
            self.allowed.iter().map(String::as_str).collect()
        }
    }

    pub fn choice(&self) -> Option<&str> {
        self.value.as_deref()
    }

    fn refresh_help(&mut self) {
        self.help = format!("{} ({})", self.base_help, self.allowed().join("|")).into();
    }
}

impl BuildOption for EnumOption {
    fn name(&self) -> &str {
        &self.keys[0]
    }

    fn keys(&self) -> &[String] {
        &self.keys
    }

    fn help(&self) -> &OptionHelp {
        &self.help
    }

    fn kind(&self) -> OptionKind {
        OptionKind::Enum
    }

    fn is_available(&self) -> bool {
        true
    }

    fn seed_initial(&mut self, settings: &Settings) -> Result<(), OptionError> {
        if let Some(value) = settings.get_string(self.name()) {
            self.value = Some(value);
        }
        Ok(())
    }

    fn probe(&mut self, _ctx: &ProbeContext) -> Result<(), OptionError> {
        if self.value.is_none() {
            self.value = Some(self.default.clone());
        }
        Ok(())
    }

    fn validate(&mut self, _env: &BuildEnv, _ctx: &ProbeContext) -> Result<(), OptionError> {
        let valid = match self.value.as_deref() {
            Some(v) => v.is_empty() || self.allowed().contains(&v),
            None => true,
        };
        if valid {
            return Ok(());
        }

        let value = self.value.take().unwrap_or_default();
        let reason = format!("expected one of {}", self.allowed().join(", "));
        Err(OptionError::invalid_value(self.name(), value, reason))
    }

    fn apply(&self, env: &mut BuildEnv) {
        if let Some(choice) = &self.value {
            let value = self
                .mapping
                .get(choice)
                .cloned()
                .unwrap_or_else(|| Value::from(choice.as_str()));
            env.set(self.name(), value);
        }
    }

    fn settings(&self) -> Vec<(String, Value)> {
        self.value
            .iter()
            .map(|v| (self.name().to_string(), Value::from(v.as_str())))
            .collect()
    }

    /// Environment values are shown as the choice that produced them.
    fn display_value(&self, value: &Value) -> String {
        self.mapping
            .iter()
            .find(|(_, mapped)| *mapped == value)
            .map(|(choice, _)| choice.clone())
            .unwrap_or_else(|| value.to_string())
    }
}
