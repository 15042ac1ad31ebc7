use crate::core::env::BuildEnv;
use crate::core::errors::OptionError;
use crate::core::option::{BuildOption, OptionHelp, OptionKind};
use crate::core::settings::{Settings, Value};
use crate::probe::ProbeContext;

const TRUE_STRINGS: [&str; 7] = ["y", "yes", "true", "t", "1", "on", "all"];
const FALSE_STRINGS: [&str; 7] = ["n", "no", "false", "f", "0", "off", "none"];

/// Interpret a truth value written by a user or read from the cache.
pub fn parse_bool(value: &Value) -> Result<bool, String> {
    let text = match value {
        Value::Bool(b) => return Ok(*b),
        Value::Int(0) => return Ok(false),
        Value::Int(1) => return Ok(true),
        Value::Str(s) => s.to_ascii_lowercase(),
        other => return Err(format!("`{}` is not a boolean", other)),
    };

    if TRUE_STRINGS.contains(&text.as_str()) {
        Ok(true)
    } else if FALSE_STRINGS.contains(&text.as_str()) {
        Ok(false)
    } else {
        Err(format!("`{}` is not a boolean", text))
    }
}

/// A yes/no switch.
#[derive(Debug, Clone)]
pub struct BoolOption {
    keys: Vec<String>,
    help: OptionHelp,
    default: bool,
    value: Option<Value>,
}

impl BoolOption {
    pub fn new(key: &str, help: &str, default: bool) -> Self {
        BoolOption {
            keys: vec![key.to_string()],
            help: format!("{} (yes|no)", help).into(),
            default,
            value: None,
        }
    }

    /// The resolved switch, once validated.
    pub fn enabled(&self) -> Option<bool> {
        match self.value {
            Some(Value::Bool(b)) => Some(b),
            _ => None,
        }
    }
}

impl BuildOption for BoolOption {
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
        OptionKind::Bool
    }

    fn is_available(&self) -> bool {
        true
    }

    fn seed_initial(&mut self, settings: &Settings) -> Result<(), OptionError> {
        if let Some(value) = settings.get(self.name()) {
            self.value = Some(value.clone());
        }
        Ok(())
    }

    fn probe(&mut self, _ctx: &ProbeContext) -> Result<(), OptionError> {
        if self.value.is_none() {
            self.value = Some(Value::Bool(self.default));
        }
        Ok(())
    }

    fn validate(&mut self, _env: &BuildEnv, _ctx: &ProbeContext) -> Result<(), OptionError> {
        let Some(value) = self.value.take() else {
            return Ok(());
        };
        match parse_bool(&value) {
            Ok(b) => {
                self.value = Some(Value::Bool(b));
                Ok(())
            }
            Err(reason) => Err(OptionError::invalid_value(
                self.name(),
                value.to_string(),
                reason,
            )),
        }
    }

    fn apply(&self, env: &mut BuildEnv) {
        if let Some(value) = &self.value {
            env.set(self.name(), value.clone());
        }
    }

    fn settings(&self) -> Vec<(String, Value)> {
        self.value
            .iter()
            .map(|v| (self.name().to_string(), v.clone()))
            .collect()
    }

    fn display_value(&self, value: &Value) -> String {
        match parse_bool(value) {
            Ok(true) => "yes".to_string(),
            Ok(false) => "no".to_string(),
            Err(_) => value.to_string(),
        }
    }
}
