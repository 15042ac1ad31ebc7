use crate::core::env::BuildEnv;
use crate::core::errors::OptionError;
use crate::core::option::{BuildOption, OptionHelp, OptionKind};
use crate::core::settings::{Settings, Value};

/// A heading in the help output. Holds no state.
#[derive(Debug, Clone)]
pub struct SeparatorOption {
    keys: Vec<String>,
    help: OptionHelp,
}

impl SeparatorOption {
    pub fn new(text: &str) -> Self {
        SeparatorOption {
            keys: vec!["separator".to_string()],
            help: text.into(),
        }
    }
}

impl BuildOption for SeparatorOption {
    fn name(&self) -> &str {
        "separator"
    }

    fn keys(&self) -> &[String] {
        &self.keys
    }

    fn help(&self) -> &OptionHelp {
        &self.help
    }

    fn kind(&self) -> OptionKind {
        OptionKind::Separator
    }

    fn is_available(&self) -> bool {
        true
    }

    fn start(&mut self) {}

    fn seed_initial(&mut self, _settings: &Settings) -> Result<(), OptionError> {
        Ok(())
    }

    fn apply(&self, _env: &mut BuildEnv) {}

    fn settings(&self) -> Vec<(String, Value)> {
        Vec::new()
    }
}
