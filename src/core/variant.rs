//! Variant axes and their combinations.
//!
//! A variant axis is one dimension of build configuration (`type`,
//! `libtype`, `arch`, ...). An *alternative* axis contributes exactly one
//! value to each combination; any other axis contributes its full value
//! list to every combination. The number of combinations is the product
//! of the sizes of the alternative axes.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::core::env::BuildEnv;
use crate::core::env_builder::{CompilerFlags, EnvBuilder, MsvcRuntime};
use crate::core::errors::OptionError;
use crate::core::registry::OptionRegistry;
use crate::options::{ListOption, SeparatorOption};
use crate::util::platform::{Arch, Platform};

/// Keys understood by [`VariantSet::with_defaults`].
pub const DEFAULT_KEYS: [&str; 3] = ["type", "libtype", "arch"];

/// One named dimension of build configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantAxis {
    pub name: String,
    pub values: Vec<String>,
    pub alternative: bool,
}

impl VariantAxis {
    pub fn new<S: AsRef<str>>(name: &str, values: &[S], alternative: bool) -> Self {
        VariantAxis {
            name: name.to_string(),
            values: values.iter().map(|v| v.as_ref().to_string()).collect(),
            alternative,
        }
    }
}

/// The value an axis takes in a combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AxisValue {
    One(String),
    All(Vec<String>),
}

impl AxisValue {
    pub fn as_one(&self) -> Option<&str> {
        match self {
            AxisValue::One(v) => Some(v),
            AxisValue::All(_) => None,
        }
    }
}

/// One point in the variant space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Combination {
    values: BTreeMap<String, AxisValue>,
}

impl Combination {
    pub fn get(&self, axis: &str) -> Option<&AxisValue> {
        self.values.get(axis)
    }

    /// The single value of an alternative axis.
    pub fn one(&self, axis: &str) -> Option<&str> {
        self.get(axis).and_then(AxisValue::as_one)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AxisValue)> {
        self.values.iter()
    }

    /// Build directory component, e.g. `arch-x64--type-debug`. Axes that
    /// carry their whole value list are left out.
    pub fn dir_name(&self) -> String {
        self.values
            .iter()
            .filter_map(|(k, v)| v.as_one().map(|v| format!("{}-{}", k, v)))
            .collect::<Vec<_>>()
            .join("--")
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .values
            .iter()
            .map(|(k, v)| match v {
                AxisValue::One(v) => format!("{}={}", k, v),
                AxisValue::All(vs) => format!("{}=[{}]", k, vs.join(",")),
            })
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Every combination of the given axes.
///
/// The product is built incrementally over the alternative axes in order;
/// the non-alternative axes are then attached unchanged to each result.
pub fn zip_variants(axes: &[VariantAxis]) -> Vec<Combination> {
    let mut combos: Vec<Vec<(&str, &str)>> = vec![Vec::new()];
    for axis in axes.iter().filter(|a| a.alternative) {
        let mut next = Vec::with_capacity(combos.len() * axis.values.len());
        for value in &axis.values {
            for combo in &combos {
                let mut combo = combo.clone();
                combo.push((axis.name.as_str(), value.as_str()));
                next.push(combo);
            }
        }
        combos = next;
    }

    combos
        .into_iter()
        .map(|picked| {
            let mut values: BTreeMap<String, AxisValue> = picked
                .into_iter()
                .map(|(k, v)| (k.to_string(), AxisValue::One(v.to_string())))
                .collect();
            for axis in axes.iter().filter(|a| !a.alternative) {
                values.insert(axis.name.clone(), AxisValue::All(axis.values.clone()));
            }
            Combination { values }
        })
        .collect()
}

/// Naming conventions derived from one combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantBuild {
    pub pass: usize,
    pub combo: Combination,
    pub combo_dir: String,
    pub static_lib_suffix: String,
    pub shared_lib_suffix: String,
    /// Library install subdirectory; `debug` for debug builds.
    pub lib_subdir: String,
    /// Suffix appended to program names.
    pub runtime_suffix: String,
    /// Compiler and linker flags selecting the architecture.
    pub arch_flags: Vec<String>,
    /// Everything [`VariantBuild::apply`] adds to the flag variables.
    pub flags: CompilerFlags,
    #[serde(skip)]
    env_builder: EnvBuilder,
}

impl VariantBuild {
    /// Naming and compiler settings for `combo`, starting from `base`.
    ///
    /// Warnings are on at the builder's default level. `debug` and
    /// `debugrt` enable debug info and `optimized` enables optimization,
    /// also at the default levels. `debugrt` links the debug MSVC runtime.
    pub fn for_combination(
        pass: usize,
        combo: &Combination,
        platform: Platform,
        base: &EnvBuilder,
    ) -> Self {
        let build_type = combo.one("type").unwrap_or("");
        let arch = combo.one("arch").and_then(|a| a.parse::<Arch>().ok());

        let mut env_builder = base.clone();
        env_builder.set_platform(platform);
        env_builder.enable_warnings(None, &[]);
        match build_type {
            "debug" => {
                env_builder.enable_debug(None);
                env_builder.set_msvc_runtime(Some(MsvcRuntime::MultiThreadedDll));
            }
            "debugrt" => {
                env_builder.enable_debug(None);
                env_builder.set_msvc_runtime(Some(MsvcRuntime::MultiThreadedDebugDll));
            }
            "optimized" => {
                env_builder.enable_opt(None, &[]);
                env_builder.set_msvc_runtime(Some(MsvcRuntime::MultiThreadedDll));
            }
            _ => {}
        }
        if arch.is_some() {
            env_builder.set_cpu_arch(arch);
        }

        let (static_lib_suffix, shared_lib_suffix) = match (platform, build_type) {
            (Platform::Win32, "debug" | "optimized") => ("_s", ""),
            (Platform::Win32, "debugrt") => ("_d_s", "_d"),
            _ => ("", ""),
        };
        let lib_subdir = if build_type == "debug" { "debug" } else { "" };
        let runtime_suffix = match build_type {
            "debug" => "_d",
            "debugrt" => "_drt",
            _ => "",
        };
        let arch_flags = arch
            .and_then(|a| a.compile_flags(platform))
            .unwrap_or_default()
            .into_iter()
            .map(String::from)
            .collect();

        VariantBuild {
            pass,
            combo: combo.clone(),
            combo_dir: combo.dir_name(),
            static_lib_suffix: static_lib_suffix.to_string(),
            shared_lib_suffix: shared_lib_suffix.to_string(),
            lib_subdir: lib_subdir.to_string(),
            runtime_suffix: runtime_suffix.to_string(),
            arch_flags,
            flags: env_builder.flags(),
            env_builder,
        }
    }

    pub fn env_builder(&self) -> &EnvBuilder {
        &self.env_builder
    }

    /// Record the combination in `env` and add its compiler flags.
    pub fn apply(&self, env: &mut BuildEnv) {
        for (axis, value) in self.combo.iter() {
            match value {
                AxisValue::One(v) => env.set(format!("variant_{}", axis), v.as_str()),
                AxisValue::All(vs) => env.set(format!("variant_{}", axis), vs.clone()),
            }
        }
        self.env_builder.apply(env);
    }
}

/// The axes of a project, with the conventional defaults available, and
/// the compiler settings every combination starts from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VariantSet {
    axes: Vec<VariantAxis>,
    #[serde(skip)]
    builder: EnvBuilder,
}

impl VariantSet {
    pub fn new() -> Self {
        VariantSet::default()
    }

    /// Conventional axes for the requested `keys`:
    /// - `type`: debug/optimized, plus debugrt on win32
    /// - `libtype`: shared/static, alternative only on win32
    /// - `arch`: the detected architectures, or `default`
    ///
    /// An `arch` axis of `default` is always present.
    pub fn with_defaults<S: AsRef<str>>(keys: &[S], platform: Platform, archs: &[Arch]) -> Self {
        let wants = |k: &str| keys.iter().any(|s| s.as_ref() == k);
        let mut set = VariantSet {
            axes: Vec::new(),
            builder: EnvBuilder::new(platform),
        };

        if wants("type") {
            let mut types = vec!["debug", "optimized"];
            if platform.is_win32() {
                types.push("debugrt");
            }
            set.push(VariantAxis::new("type", &types, true));
        }
        if wants("libtype") {
            set.push(VariantAxis::new(
                "libtype",
                &["shared", "static"],
                platform.is_win32(),
            ));
        }

        let archs: Vec<&str> = if wants("arch") {
            archs.iter().map(Arch::as_str).collect()
        } else {
            Vec::new()
        };
        if archs.is_empty() {
            set.push(VariantAxis::new("arch", &["default"], true));
        } else {
            set.push(VariantAxis::new("arch", &archs, true));
        }
        set
    }

    /// Add an axis, replacing one of the same name.
    pub fn push(&mut self, axis: VariantAxis) {
        match self.axes.iter_mut().find(|a| a.name == axis.name) {
            Some(existing) => *existing = axis,
            None => self.axes.push(axis),
        }
    }

    pub fn axes(&self) -> &[VariantAxis] {
        &self.axes
    }

    /// Base compiler settings, shared by every combination.
    pub fn env_builder_mut(&mut self) -> &mut EnvBuilder {
        &mut self.builder
    }

    pub fn combinations(&self) -> Vec<Combination> {
        zip_variants(&self.axes)
    }

    /// One [`VariantBuild`] per combination, numbered from zero.
    pub fn builds(&self, platform: Platform) -> Vec<VariantBuild> {
        self.combinations()
            .iter()
            .enumerate()
            .map(|(pass, combo)| {
                VariantBuild::for_combination(pass, combo, platform, &self.builder)
            })
            .collect()
    }

    /// Register a `var_<axis>` list option per axis, sorted by name, after
    /// a separator. The environment builder's defaults follow.
    pub fn add_options(&self, registry: &mut OptionRegistry) -> Result<(), OptionError> {
        registry.add_option(SeparatorOption::new("\nVariant options"))?;

        let mut axes: Vec<&VariantAxis> = self.axes.iter().collect();
        axes.sort_by(|a, b| a.name.cmp(&b.name));
        for axis in axes {
            let help = match axis.name.as_str() {
                "type" => "Types of run-times to build.",
                "libtype" => "Library types to build.",
                "arch" => "Target processor architectures to build.",
                _ => "Variant option",
            };
            registry.add_option(ListOption::new(
                &format!("var_{}", axis.name),
                help,
                &axis.values,
                &axis.values,
            ))?;
        }
        self.builder.add_options(registry)
    }

    /// Narrow each axis to the values selected in `env` and pick up the
    /// environment builder's defaults.
    pub fn read_options(&mut self, env: &BuildEnv) {
        self.builder.read_options(env);
        for axis in &mut self.axes {
            let key = format!("var_{}", axis.name);
            if env.contains(&key) {
                axis.values = env.get_list(&key);
            }
        }
    }
}
