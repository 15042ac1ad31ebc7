use crate::core::env::BuildEnv;
use crate::core::errors::OptionError;
use crate::core::option::{BuildOption, OptionHelp, OptionKind};
use crate::core::settings::{Settings, Value};
use crate::probe::ProbeContext;

/// Any subset of a fixed list of elements.
///
/// Users write `all` or a comma-separated list; the cache stores `all`
/// whenever every element is selected.
#[derive(Debug, Clone)]
pub struct ListOption {
    keys: Vec<String>,
    help: OptionHelp,
    elems: Vec<String>,
    default: Vec<String>,
    raw: Option<Value>,
    value: Option<Vec<String>>,
}

impl ListOption {
    pub fn new<S: AsRef<str>>(key: &str, help: &str, elems: &[S], default: &[S]) -> Self {
        let elems: Vec<String> = elems.iter().map(|e| e.as_ref().to_string()).collect();
        let quoted: Vec<String> = elems.iter().map(|e| format!("'{}'", e)).collect();
        ListOption {
            keys: vec![key.to_string()],
            help: format!("{} -- ('all'|[{}])", help, quoted.join(", ")).into(),
            elems,
            default: default.iter().map(|e| e.as_ref().to_string()).collect(),
            raw: None,
            value: None,
        }
    }

    pub fn elems(&self) -> &[String] {
        &self.elems
    }

    /// The selected elements, once validated.
    pub fn selected(&self) -> Option<&[String]> {
        self.value.as_deref()
    }

    fn expand(&self, raw: &Value) -> Result<Vec<String>, String> {
        let items = match raw {
            Value::Str(s) if s == "all" => return Ok(self.elems.clone()),
            Value::Str(s) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            Value::List(_) => raw.to_strings(),
            other => return Err(format!("`{}` is not a list", other)),
        };

        match items.iter().find(|item| !self.elems.contains(item)) {
            Some(bad) => Err(format!("item `{}` is not allowed", bad)),
            None => Ok(items),
        }
    }
}

impl BuildOption for ListOption {
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
        OptionKind::List
    }

    fn is_available(&self) -> bool {
        true
    }

    fn seed_initial(&mut self, settings: &Settings) -> Result<(), OptionError> {
        if let Some(value) = settings.get(self.name()) {
            self.raw = Some(value.clone());
        }
        Ok(())
    }

    fn probe(&mut self, _ctx: &ProbeContext) -> Result<(), OptionError> {
        if self.raw.is_none() {
            self.value = Some(self.default.clone());
        }
        Ok(())
    }

    fn validate(&mut self, _env: &BuildEnv, _ctx: &ProbeContext) -> Result<(), OptionError> {
        let Some(raw) = self.raw.take() else {
            return Ok(());
        };
        match self.expand(&raw) {
            Ok(items) => {
                self.value = Some(items);
                Ok(())
            }
            Err(reason) => {
                self.value = None;
                Err(OptionError::invalid_value(self.name(), raw.to_string(), reason))
            }
        }
    }

    fn apply(&self, env: &mut BuildEnv) {
        if let Some(items) = &self.value {
            env.set(self.name(), Value::from(items.clone()));
        }
    }

    fn settings(&self) -> Vec<(String, Value)> {
        let Some(items) = &self.value else {
            return Vec::new();
        };
        let value = if *items == self.elems {
            Value::from("all")
        } else {
            Value::from(items.clone())
        };
        vec![(self.name().to_string(), value)]
    }
}
