//! Ordered option collection and the dependency fix-point processor.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::env::BuildEnv;
use crate::core::errors::OptionError;
use crate::core::option::{is_valid_key, BuildOption, OptionKind};
use crate::core::settings::{render_settings, Settings, Value};
use crate::options::simple::{Converter, SimpleOption, Validator};
use crate::probe::ProbeContext;
use crate::util::fs::write_string;

/// Help text width used when the terminal size is unknown.
pub const DEFAULT_HELP_WIDTH: usize = 80;

/// Which options [`OptionRegistry::apply`] touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyFilter {
    All,
    /// An option is applied if its kind OR its name matches.
    Selected {
        kinds: Vec<OptionKind>,
        names: Vec<String>,
    },
}

impl ApplyFilter {
    /// The simple, bool, list and enum kinds.
    pub fn simple() -> Self {
        ApplyFilter::Selected {
            kinds: OptionKind::SIMPLE_KINDS.to_vec(),
            names: Vec::new(),
        }
    }

    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ApplyFilter::Selected {
            kinds: Vec::new(),
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    fn matches(&self, option: &dyn BuildOption) -> bool {
        match self {
            ApplyFilter::All => true,
            ApplyFilter::Selected { kinds, names } => {
                kinds.contains(&option.kind()) || names.iter().any(|n| n == option.name())
            }
        }
    }
}

/// An option left pending because its dependencies never became available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockedOption {
    pub name: String,
    pub missing: Vec<String>,
}

/// Outcome of [`OptionRegistry::process`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessReport {
    /// Options that ran through the lifecycle, in processing order
    pub processed: Vec<String>,
    /// Processed options that ended up available
    pub available: Vec<String>,
    /// Options that never ran
    pub blocked: Vec<BlockedOption>,
    /// Number of passes over the pending list
    pub passes: usize,
}

impl ProcessReport {
    pub fn is_available(&self, name: &str) -> bool {
        self.available.iter().any(|n| n == name)
    }
}

/// Ordered collection of options plus the settings sources they read.
#[derive(Debug, Default)]
pub struct OptionRegistry {
    options: Vec<Box<dyn BuildOption>>,
    files: Vec<PathBuf>,
    args: Vec<String>,
    verbose: bool,
}

impl OptionRegistry {
    pub fn new() -> Self {
        OptionRegistry::default()
    }

    /// Settings files loaded (in order) before processing.
    pub fn with_files(mut self, files: Vec<PathBuf>) -> Self {
        self.files = files;
        self
    }

    /// `KEY=VALUE` overrides applied on top of the settings files.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Register an option. Keys must be valid construction variables and
    /// names unique (separators excepted).
    pub fn add(&mut self, option: Box<dyn BuildOption>) -> Result<(), OptionError> {
        if let Some(bad) = option.keys().iter().find(|k| !is_valid_key(k)) {
            return Err(OptionError::InvalidKey { key: bad.clone() });
        }
        if option.kind() != OptionKind::Separator && self.get(option.name()).is_some() {
            return Err(OptionError::Duplicate {
                name: option.name().to_string(),
            });
        }
        self.options.push(option);
        Ok(())
    }

    /// Register a concrete option.
    pub fn add_option<O: BuildOption + 'static>(&mut self, option: O) -> Result<(), OptionError> {
        self.add(Box::new(option))
    }

    /// Register a single-key value option.
    pub fn add_simple(
        &mut self,
        key: &str,
        help: &str,
        default: Option<Value>,
        validator: Option<Validator>,
        converter: Option<Converter>,
    ) -> Result<(), OptionError> {
        let mut option = SimpleOption::new(key, help);
        if let Some(default) = default {
            option = option.with_default(default);
        }
        if let Some(validator) = validator {
            option = option.with_validator(validator);
        }
        if let Some(converter) = converter {
            option = option.with_converter(converter);
        }
        self.add_option(option)
    }

    pub fn get(&self, name: &str) -> Option<&dyn BuildOption> {
        self.index_of(name).map(|i| self.options[i].as_ref())
    }

    /// Persisted value of the `index`-th key of option `name`.
    pub fn value(&self, name: &str, index: usize) -> Option<Value> {
        self.get(name).and_then(|o| o.value(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn BuildOption> {
        self.options.iter().map(|o| o.as_ref())
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.options
            .iter()
            .position(|o| o.kind() != OptionKind::Separator && o.name() == name)
    }

    /// Load the settings files (missing ones are skipped) and overlay the
    /// command-line arguments.
    pub fn load_settings(&self) -> Result<Settings> {
        let mut settings = Settings::load_files(&self.files)?;
        settings
            .apply_args(&self.args)
            .context("invalid command-line setting")?;
        Ok(settings)
    }

    /// Load settings and process every option. See [`process_with`].
    ///
    /// [`process_with`]: OptionRegistry::process_with
    pub fn process(
        &mut self,
        env: &mut BuildEnv,
        ctx: &ProbeContext,
        apply_simple: bool,
    ) -> Result<ProcessReport> {
        let settings = self.load_settings()?;
        Ok(self.process_with(&settings, env, ctx, apply_simple)?)
    }

    /// Run the dependency fix-point over all options.
    ///
    /// Each pass processes every pending option whose dependencies are all
    /// available and keeps the rest pending; processing stops after a pass
    /// that makes no progress. Required options that fail, invalid
    /// user-supplied values, and required options left blocked are returned
    /// as errors. Optional failures are logged and leave the option
    /// unavailable.
    pub fn process_with(
        &mut self,
        settings: &Settings,
        env: &mut BuildEnv,
        ctx: &ProbeContext,
        apply_simple: bool,
    ) -> Result<ProcessReport, OptionError> {
        if self.verbose || ctx.is_verbose() {
            for option in &mut self.options {
                option.set_verbose(true);
            }
        }

        let mut report = ProcessReport::default();
        let mut pending: Vec<usize> = (0..self.options.len()).collect();

        while !pending.is_empty() {
            report.passes += 1;
            let before = pending.len();
            let mut still_pending = Vec::new();

            for idx in pending {
                if self.missing_dependencies(idx).is_empty() {
                    self.run_lifecycle(idx, settings, env, ctx)?;
                    let option = &self.options[idx];
                    report.processed.push(option.name().to_string());
                    if option.is_available() {
                        report.available.push(option.name().to_string());
                    }
                } else {
                    still_pending.push(idx);
                }
            }

            let progressed = still_pending.len() < before;
            pending = still_pending;
            if !progressed {
                break;
            }
        }

        for idx in pending {
            let option = &self.options[idx];
            let missing = self.missing_dependencies(idx);
            if option.is_required() {
                return Err(OptionError::DependencyUnsatisfied {
                    option: option.name().to_string(),
                    missing,
                });
            }
            tracing::warn!(
                "{} skipped: dependencies not available: {}",
                option.name(),
                missing.join(", ")
            );
            report.blocked.push(BlockedOption {
                name: option.name().to_string(),
                missing,
            });
        }

        if apply_simple {
            self.apply(env, &ApplyFilter::simple());
        }

        Ok(report)
    }

    /// Dependencies of option `idx` that are unknown or unavailable.
    fn missing_dependencies(&self, idx: usize) -> Vec<String> {
        self.options[idx]
            .dependencies()
            .iter()
            .filter(|dep| {
                !self
                    .index_of(dep)
                    .is_some_and(|d| self.options[d].is_available())
            })
            .cloned()
            .collect()
    }

    fn run_lifecycle(
        &mut self,
        idx: usize,
        settings: &Settings,
        env: &BuildEnv,
        ctx: &ProbeContext,
    ) -> Result<(), OptionError> {
        let check_env = self.env_with_dependencies(idx, env);
        let option = &mut self.options[idx];

        option.start();
        option.seed_initial(settings)?;

        let outcome = option
            .probe(ctx)
            .and_then(|()| option.validate(&check_env, ctx));
        if let Err(e) = outcome {
            if option.is_required() || matches!(e, OptionError::InvalidValue { .. }) {
                return Err(e);
            }
            tracing::warn!("{}", e);
        }

        option.complete();
        Ok(())
    }

    /// A copy of `env` with every available dependency of option `idx`
    /// applied, deepest first.
    fn env_with_dependencies(&self, idx: usize, env: &BuildEnv) -> BuildEnv {
        let mut order = Vec::new();
        let mut seen = HashSet::from([idx]);
        self.collect_dependencies(idx, &mut seen, &mut order);

        let mut env = env.clone();
        for dep in order {
            if self.options[dep].is_available() {
                self.options[dep].apply(&mut env);
            }
        }
        env
    }

    fn collect_dependencies(&self, idx: usize, seen: &mut HashSet<usize>, order: &mut Vec<usize>) {
        for name in self.options[idx].dependencies() {
            if let Some(dep) = self.index_of(name) {
                if seen.insert(dep) {
                    self.collect_dependencies(dep, seen, order);
                    order.push(dep);
                }
            }
        }
    }

    /// Apply the available options selected by `filter`, in insertion order.
    pub fn apply(&self, env: &mut BuildEnv, filter: &ApplyFilter) {
        for option in &self.options {
            if option.is_available() && filter.matches(option.as_ref()) {
                option.apply(env);
            }
        }
    }

    /// Every persisted setting, in option order.
    pub fn collect_settings(&self) -> Vec<(String, Value)> {
        self.options.iter().flat_map(|o| o.settings()).collect()
    }

    /// Write the current settings so the next run can seed from them.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_string(path, &render_settings(&self.collect_settings()))
            .with_context(|| format!("failed to save settings to {}", path.display()))
    }

    /// Render help for every option, with current values from `env`.
    pub fn help_text(&self, env: &BuildEnv, width: usize) -> String {
        let max_key_len = self
            .options
            .iter()
            .filter(|o| o.kind() != OptionKind::Separator)
            .flat_map(|o| o.keys().iter().map(String::len))
            .max()
            .unwrap_or(0);
        let indent = "  ";
        let key_spacing = format!("{}{}", indent, " ".repeat(max_key_len + 2));

        let mut text = String::new();
        for option in &self.options {
            if option.kind() == OptionKind::Separator {
                text.push_str(option.help().for_key(0));
                text.push('\n');
                continue;
            }

            for (i, key) in option.keys().iter().enumerate() {
                let line = format!(
                    "{:<width$} {}",
                    format!("{}:", key),
                    option.help().for_key(i),
                    width = max_key_len + 1
                );
                text.push_str(&wrap(&line, width, indent, &key_spacing));
                text.push('\n');

                if let Some(value) = env.get(key) {
                    text.push_str(&key_spacing);
                    match value {
                        Value::List(_) => text.push_str(&value.to_string()),
                        other => {
                            text.push('[');
                            text.push_str(&option.display_value(other));
                            text.push(']');
                        }
                    }
                    text.push('\n');
                }
            }
        }
        text
    }
}

/// Greedy word wrap with separate first-line and continuation indents.
/// Whitespace inside a line is kept so padded columns stay aligned.
fn wrap(text: &str, width: usize, initial: &str, subsequent: &str) -> String {
    let mut chunks: Vec<(bool, String)> = Vec::new();
    for c in text.chars() {
        let ws = c.is_whitespace();
        let c = if ws { ' ' } else { c };
        match chunks.last_mut() {
            Some((last_ws, chunk)) if *last_ws == ws => chunk.push(c),
            _ => chunks.push((ws, c.to_string())),
        }
    }

    let mut out = String::new();
    let mut line = initial.to_string();
    let mut has_word = false;
    let mut gap = String::new();

    for (is_ws, chunk) in chunks {
        if is_ws {
            if has_word {
                gap = chunk;
            }
            continue;
        }
        if has_word && line.len() + gap.len() + chunk.len() > width {
            out.push_str(&line);
            out.push('\n');
            line = subsequent.to_string();
            has_word = false;
        }
        if has_word {
            line.push_str(&gap);
        }
        gap.clear();
        line.push_str(&chunk);
        has_word = true;
    }
    out.push_str(&line);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{BoolOption, EnumOption, SeparatorOption};
    use crate::test_support::{FakeOption, MockChecker};
    use crate::util::platform::Platform;

    fn ctx() -> ProbeContext {
        ProbeContext::new(Box::new(MockChecker::new())).with_platform(Platform::Linux)
    }

    fn registry(options: Vec<FakeOption>) -> OptionRegistry {
        let mut reg = OptionRegistry::new();
        for o in options {
            reg.add_option(o).unwrap();
        }
        reg
    }

    #[test]
    fn test_chain_resolves_in_any_order() {
        let orders = [["A", "B", "C"], ["C", "B", "A"], ["B", "C", "A"]];
        for order in orders {
            let options = order
                .iter()
                .map(|name| match *name {
                    "A" => FakeOption::new("A"),
                    "B" => FakeOption::new("B").depends_on("A"),
                    _ => FakeOption::new("C").depends_on("B"),
                })
                .collect();
            let mut reg = registry(options);
            let mut env = BuildEnv::new(Platform::Linux);

            let report = reg.process_with(&Settings::new(), &mut env, &ctx(), false).unwrap();
            for name in ["A", "B", "C"] {
                assert!(reg.get(name).unwrap().is_available(), "{:?}", order);
            }
            assert!(report.blocked.is_empty());
            assert!(report.passes <= 3);
        }
    }

    #[test]
    fn test_missing_dependency_stays_blocked() {
        let mut reg = registry(vec![
            FakeOption::new("A"),
            FakeOption::new("B").depends_on("X"),
        ]);
        let mut env = BuildEnv::new(Platform::Linux);

        let report = reg.process_with(&Settings::new(), &mut env, &ctx(), false).unwrap();
        assert!(!reg.get("B").unwrap().is_available());
        assert_eq!(
            report.blocked,
            vec![BlockedOption {
                name: "B".into(),
                missing: vec!["X".into()]
            }]
        );
        assert!(report.passes <= reg.len());
    }

    #[test]
    fn test_cycle_terminates() {
        let mut reg = registry(vec![
            FakeOption::new("A").depends_on("B"),
            FakeOption::new("B").depends_on("A"),
        ]);
        let mut env = BuildEnv::new(Platform::Linux);

        let report = reg.process_with(&Settings::new(), &mut env, &ctx(), false).unwrap();
        assert_eq!(report.passes, 1);
        assert_eq!(report.blocked.len(), 2);
    }

    #[test]
    fn test_failed_dependency_blocks_dependents() {
        let mut reg = registry(vec![
            FakeOption::new("GL").failing(),
            FakeOption::new("GLUT").depends_on("GL"),
        ]);
        let mut env = BuildEnv::new(Platform::Linux);

        let report = reg.process_with(&Settings::new(), &mut env, &ctx(), false).unwrap();
        assert_eq!(report.processed, vec!["GL"]);
        assert!(report.available.is_empty());
        assert_eq!(report.blocked[0].name, "GLUT");
    }

    #[test]
    fn test_required_failure_propagates() {
        let mut reg = registry(vec![FakeOption::new("SDL").failing().required()]);
        let mut env = BuildEnv::new(Platform::Linux);

        let err = reg
            .process_with(&Settings::new(), &mut env, &ctx(), false)
            .unwrap_err();
        assert!(matches!(err, OptionError::ProbeNotFound { .. }));
    }

    #[test]
    fn test_required_blocked_option_is_an_error() {
        let mut reg = registry(vec![FakeOption::new("B").depends_on("X").required()]);
        let mut env = BuildEnv::new(Platform::Linux);

        let err = reg
            .process_with(&Settings::new(), &mut env, &ctx(), false)
            .unwrap_err();
        match err {
            OptionError::DependencyUnsatisfied { option, missing } => {
                assert_eq!(option, "B");
                assert_eq!(missing, vec!["X"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validation_sees_transitive_dependencies() {
        let mut reg = registry(vec![
            FakeOption::new("A").with_lib("a"),
            FakeOption::new("B").depends_on("A").with_lib("b"),
            FakeOption::new("C").depends_on("B"),
        ]);
        let mut env = BuildEnv::new(Platform::Linux);
        reg.process_with(&Settings::new(), &mut env, &ctx(), false).unwrap();

        let c = format!("{:?}", reg.get("C").unwrap());
        assert!(c.contains(r#"seen_libs: ["a", "b"]"#), "{}", c);
        // Validation used a copy; the real env is untouched until apply.
        assert!(env.get_list("LIBS").is_empty());
    }

    #[test]
    fn test_apply_filters() {
        let mut reg = registry(vec![FakeOption::new("A").with_lib("a")]);
        reg.add_option(BoolOption::new("BuildTests", "Build the test suite", true))
            .unwrap();
        let mut env = BuildEnv::new(Platform::Linux);
        reg.process_with(&Settings::new(), &mut env, &ctx(), true).unwrap();

        assert_eq!(env.get("BuildTests"), Some(&Value::Bool(true)));
        assert!(env.get_list("LIBS").is_empty());

        reg.apply(&mut env, &ApplyFilter::names(["A"]));
        assert_eq!(env.get_list("LIBS"), vec!["a"]);
    }

    #[test]
    fn test_invalid_value_always_propagates() {
        let mut reg = OptionRegistry::new();
        reg.add_option(BoolOption::new("Shared", "Build shared libs", false))
            .unwrap();
        let mut settings = Settings::new();
        settings.set("Shared", "maybe");
        let mut env = BuildEnv::new(Platform::Linux);

        let err = reg.process_with(&settings, &mut env, &ctx(), true).unwrap_err();
        assert!(matches!(err, OptionError::InvalidValue { .. }));
    }

    #[test]
    fn test_add_rejects_bad_keys_and_duplicates() {
        let mut reg = OptionRegistry::new();
        let err = reg
            .add_simple("bad-key", "help", None, None, None)
            .unwrap_err();
        assert!(matches!(err, OptionError::InvalidKey { .. }));

        reg.add_simple("Prefix", "Install prefix", None, None, None)
            .unwrap();
        let err = reg
            .add_simple("Prefix", "again", None, None, None)
            .unwrap_err();
        assert!(matches!(err, OptionError::Duplicate { .. }));

        reg.add_option(SeparatorOption::new("-- one --")).unwrap();
        reg.add_option(SeparatorOption::new("-- two --")).unwrap();
    }

    #[test]
    fn test_save_and_reload_through_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cache = tmp.path().join("options.cache");
        std::fs::write(&cache, "Prefix = '/opt/old'\n").unwrap();

        let mut reg = OptionRegistry::new()
            .with_files(vec![cache.clone()])
            .with_args(vec!["Prefix=/opt/new".to_string()]);
        reg.add_simple("Prefix", "Install prefix", None, None, None)
            .unwrap();
        reg.add_simple("Unset", "Nothing here", None, None, None)
            .unwrap();

        let mut env = BuildEnv::new(Platform::Linux);
        reg.process(&mut env, &ctx(), true).unwrap();
        assert_eq!(env.get_list("Prefix"), vec!["/opt/new"]);
        assert_eq!(reg.value("Prefix", 0), Some(Value::from("/opt/new")));

        reg.save(&cache).unwrap();
        let saved = std::fs::read_to_string(&cache).unwrap();
        assert!(saved.contains("Prefix = '/opt/new'"));
        assert!(!saved.contains("Unset"));
    }

    #[test]
    fn test_help_text_layout() {
        let mut reg = OptionRegistry::new();
        reg.add_option(SeparatorOption::new("Build settings")).unwrap();
        reg.add_option(BoolOption::new("Debug", "Build with debug info", false))
            .unwrap();
        reg.add_option(
            EnumOption::new("Mode", "Optimization mode", "fast", &["fast", "small"])
                .with_mapping("fast", Value::from("-O3"))
                .with_mapping("small", Value::from("-Os")),
        )
        .unwrap();

        let mut env = BuildEnv::new(Platform::Linux);
        env.set("Mode", "-Os");
        let help = reg.help_text(&env, 80);

        let lines: Vec<&str> = help.lines().collect();
        assert_eq!(lines[0], "Build settings");
        assert_eq!(lines[1], "  Debug: Build with debug info (yes|no)");
        assert_eq!(lines[2], "  Mode:  Optimization mode (fast|small)");
        assert_eq!(lines[3], "         [small]");
    }

    #[test]
    fn test_wrap() {
        let text = wrap("Key: one two three four five", 17, "  ", "       ");
        assert_eq!(text, "  Key: one two\n       three four\n       five");
    }
}
