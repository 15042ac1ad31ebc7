//! Confkit.toml manifest parsing and schema.
//!
//! The manifest declares the options a project probes for, its variant
//! axes and what goes into its distributions:
//!
//! ```toml
//! [package]
//! name = "cppdom"
//! version = "1.0.3"
//! headers = ["include/**/*.h"]
//! libraries = ["build/libcppdom.a"]
//!
//! [variants]
//! defaults = true
//!
//! [[options]]
//! kind = "pkg-config"
//! name = "zlib"
//! module = "zlib"
//! min_version = "1.2"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::option::BuildOption;
use crate::core::registry::OptionRegistry;
use crate::core::settings::Value;
use crate::core::variant::{VariantAxis, VariantSet, DEFAULT_KEYS};
use crate::dist::Package;
use crate::options::{
    BoolOption, ConfigCmdOption, EnumOption, Libraries, ListOption, PkgConfigOption,
    SeparatorOption, SimpleOption, StandardPackageOption,
};
use crate::probe::Lang;
use crate::util::fs::glob_files;
use crate::util::platform::{Arch, Platform};
use crate::util::version::DottedVersion;

/// Manifest file name.
pub const MANIFEST_NAME: &str = "Confkit.toml";

/// The parsed Confkit.toml manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Distribution metadata, if the project packages anything
    pub package: Option<PackageSection>,

    /// Variant axes
    pub variants: VariantsSection,

    /// Declared options, in help order
    pub options: Vec<OptionSpec>,

    /// The directory containing this manifest
    pub manifest_dir: PathBuf,
}

/// The `[package]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageSection {
    pub name: String,

    /// `major.minor.patch`
    pub version: String,

    #[serde(default)]
    pub prefix: Option<PathBuf>,

    #[serde(default)]
    pub description: Option<String>,

    /// Directory below `include/` headers install into
    #[serde(default)]
    pub header_prefix: String,

    /// Headers keep their path relative to this directory
    #[serde(default = "default_header_root")]
    pub header_root: PathBuf,

    #[serde(default)]
    pub headers: Vec<String>,

    #[serde(default)]
    pub sources: Vec<String>,

    #[serde(default)]
    pub libraries: Vec<String>,

    #[serde(default)]
    pub programs: Vec<String>,

    /// Extra files and directories for source distributions
    #[serde(default)]
    pub extra_dist: Vec<PathBuf>,

    /// File name patterns skipped in extra dist directories
    #[serde(default)]
    pub exclude: Vec<String>,

    /// rpm spec template
    #[serde(default)]
    pub rpm_spec: Option<PathBuf>,
}

fn default_header_root() -> PathBuf {
    PathBuf::from("include")
}

fn default_true() -> bool {
    true
}

fn default_variant_keys() -> Vec<String> {
    DEFAULT_KEYS.iter().map(|k| k.to_string()).collect()
}

/// The `[variants]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct VariantsSection {
    /// Start from the conventional type/libtype/arch axes
    #[serde(default)]
    pub defaults: bool,

    /// Which conventional axes to use
    #[serde(default = "default_variant_keys")]
    pub keys: Vec<String>,

    /// Project axes, replacing conventional ones of the same name
    #[serde(default)]
    pub axes: Vec<AxisSpec>,
}

impl Default for VariantsSection {
    fn default() -> Self {
        VariantsSection {
            defaults: false,
            keys: default_variant_keys(),
            axes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AxisSpec {
    pub name: String,
    pub values: Vec<String>,
    #[serde(default = "default_true")]
    pub alternative: bool,
}

/// One `[[options]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum OptionSpec {
    Simple {
        key: String,
        #[serde(default)]
        help: String,
        #[serde(default)]
        default: Option<Value>,
    },
    Bool {
        key: String,
        #[serde(default)]
        help: String,
        #[serde(default)]
        default: bool,
    },
    Enum {
        key: String,
        #[serde(default)]
        help: String,
        default: String,
        #[serde(default)]
        allowed: Vec<String>,
        #[serde(default)]
        mapping: BTreeMap<String, Value>,
    },
    List {
        key: String,
        #[serde(default)]
        help: String,
        elems: Vec<String>,
        #[serde(default)]
        default: Option<Vec<String>>,
    },
    Separator {
        #[serde(default)]
        text: String,
    },
    Package {
        name: String,
        #[serde(default)]
        help: Option<String>,
        #[serde(default)]
        header: Option<String>,
        #[serde(default)]
        libraries: Vec<String>,
        /// Use the first library that links instead of all of them
        #[serde(default)]
        first_of: bool,
        #[serde(default)]
        symbol: Option<String>,
        #[serde(default)]
        lang: Option<Lang>,
        #[serde(default)]
        linker_flags: Vec<String>,
        #[serde(default)]
        required: bool,
        #[serde(default)]
        depends_on: Vec<String>,
    },
    PkgConfig {
        name: String,
        module: String,
        #[serde(default)]
        help: Option<String>,
        #[serde(default)]
        min_version: Option<String>,
        #[serde(default)]
        required: bool,
        #[serde(default = "default_true")]
        use_cpp_path: bool,
        /// Header to trial-compile against the found flags
        #[serde(default)]
        compile_test: Option<String>,
        #[serde(default)]
        depends_on: Vec<String>,
    },
    ConfigCmd {
        name: String,
        key: String,
        command: String,
        #[serde(default)]
        help: Option<String>,
        #[serde(default)]
        min_version: Option<String>,
        #[serde(default)]
        header: Option<String>,
        #[serde(default)]
        required: bool,
        #[serde(default)]
        depends_on: Vec<String>,
    },
}

fn parse_version(spec: Option<&str>, option: &str) -> Result<Option<DottedVersion>> {
    spec.map(|v| {
        v.parse::<DottedVersion>()
            .map_err(|e| anyhow::anyhow!("option `{}`: bad min_version `{}`: {}", option, v, e))
    })
    .transpose()
}

impl OptionSpec {
    /// Build the option this entry describes.
    pub fn build(&self) -> Result<Box<dyn BuildOption>> {
        let option: Box<dyn BuildOption> = match self {
            OptionSpec::Simple { key, help, default } => {
                let mut opt = SimpleOption::new(key, help);
                if let Some(default) = default {
                    opt = opt.with_default(default.clone());
                }
                Box::new(opt)
            }
            OptionSpec::Bool { key, help, default } => Box::new(BoolOption::new(key, help, *default)),
            OptionSpec::Enum {
                key,
                help,
                default,
                allowed,
                mapping,
            } => {
                let allowed: Vec<&str> = allowed.iter().map(String::as_str).collect();
                let mut opt = EnumOption::new(key, help, default, &allowed);
                for (choice, value) in mapping {
                    opt = opt.with_mapping(choice, value.clone());
                }
                Box::new(opt)
            }
            OptionSpec::List {
                key,
                help,
                elems,
                default,
            } => {
                let default = default.as_ref().unwrap_or(elems);
                Box::new(ListOption::new(key, help, elems, default))
            }
            OptionSpec::Separator { text } => Box::new(SeparatorOption::new(text)),
            OptionSpec::Package {
                name,
                help,
                header,
                libraries,
                first_of,
                symbol,
                lang,
                linker_flags,
                required,
                depends_on,
            } => {
                let help = help
                    .clone()
                    .unwrap_or_else(|| format!("{} installation directory", name));
                let mut opt = StandardPackageOption::new(name, help)
                    .with_linker_flags(linker_flags)
                    .required(*required);
                if let Some(header) = header {
                    opt = opt.with_header(header);
                }
                if !libraries.is_empty() {
                    opt = opt.with_libraries(if *first_of {
                        Libraries::FirstOf(libraries.clone())
                    } else {
                        Libraries::All(libraries.clone())
                    });
                }
                if let Some(symbol) = symbol {
                    opt = opt.with_symbol(symbol);
                }
                if let Some(lang) = lang {
                    opt = opt.with_lang(*lang);
                }
                for dep in depends_on {
                    opt = opt.depends_on(dep);
                }
                Box::new(opt)
            }
            OptionSpec::PkgConfig {
                name,
                module,
                help,
                min_version,
                required,
                use_cpp_path,
                compile_test,
                depends_on,
            } => {
                let mut opt = PkgConfigOption::new(name, module)
                    .required(*required)
                    .use_cpp_path(*use_cpp_path);
                if let Some(help) = help {
                    opt = opt.with_help(help);
                }
                if let Some(version) = parse_version(min_version.as_deref(), name)? {
                    opt = opt.with_min_version(version);
                }
                if compile_test.is_some() {
                    opt = opt.with_compile_test(compile_test.as_deref());
                }
                for dep in depends_on {
                    opt = opt.depends_on(dep);
                }
                Box::new(opt)
            }
            OptionSpec::ConfigCmd {
                name,
                key,
                command,
                help,
                min_version,
                header,
                required,
                depends_on,
            } => {
                let mut opt = ConfigCmdOption::new(name, key, command).required(*required);
                if let Some(help) = help {
                    opt = opt.with_help(help);
                }
                if let Some(version) = parse_version(min_version.as_deref(), name)? {
                    opt = opt.with_min_version(version);
                }
                if let Some(header) = header {
                    opt = opt.with_header(header);
                }
                for dep in depends_on {
                    opt = opt.depends_on(dep);
                }
                Box::new(opt)
            }
        };
        Ok(option)
    }
}

/// Raw manifest as deserialized from TOML.
#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    package: Option<PackageSection>,

    #[serde(default)]
    variants: VariantsSection,

    #[serde(default)]
    options: Vec<OptionSpec>,
}

impl Manifest {
    /// Load a manifest from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;

        Self::parse(&content, path)
    }

    /// Parse manifest content.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let raw: RawManifest = toml::from_str(content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        let manifest_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();

        Ok(Manifest {
            package: raw.package,
            variants: raw.variants,
            options: raw.options,
            manifest_dir,
        })
    }

    /// Project name, or the manifest directory's name without a package.
    pub fn name(&self) -> String {
        match &self.package {
            Some(pkg) => pkg.name.clone(),
            None => self
                .manifest_dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        }
    }

    /// A registry holding every declared option, followed by the variant
    /// options when the project has variant axes.
    pub fn registry(&self, variants: &VariantSet) -> Result<OptionRegistry> {
        let mut registry = OptionRegistry::new();
        for spec in &self.options {
            registry.add(spec.build()?)?;
        }
        if !variants.axes().is_empty() {
            variants.add_options(&mut registry)?;
        }
        Ok(registry)
    }

    /// The project's variant axes. `archs` feeds the conventional `arch`
    /// axis.
    pub fn variant_set(&self, platform: Platform, archs: &[Arch]) -> VariantSet {
        let mut set = if self.variants.defaults {
            VariantSet::with_defaults(&self.variants.keys, platform, archs)
        } else {
            let mut set = VariantSet::new();
            set.env_builder_mut().set_platform(platform);
            set
        };
        for axis in &self.variants.axes {
            set.push(VariantAxis::new(&axis.name, &axis.values, axis.alternative));
        }
        set
    }

    /// Build the distribution package, resolving globs against the
    /// manifest directory.
    pub fn dist_package(&self) -> Result<Package> {
        let Some(section) = &self.package else {
            anyhow::bail!(
                "{} has no [package] section",
                self.manifest_dir.join(MANIFEST_NAME).display()
            );
        };
        let root = &self.manifest_dir;

        let mut package = Package::new(&section.name, &section.version)?.with_root(root);
        if let Some(prefix) = &section.prefix {
            package = package.with_prefix(prefix);
        }
        if let Some(description) = &section.description {
            package = package.with_description(description);
        }

        package.add_library(glob_files(root, &section.libraries)?);
        package.add_program(glob_files(root, &section.programs)?);
        package.add_headers(
            glob_files(root, &section.headers)?,
            &root.join(&section.header_root),
            &section.header_prefix,
        );
        package.add_sources(glob_files(root, &section.sources)?);

        let extra: Vec<PathBuf> = section.extra_dist.iter().map(|f| root.join(f)).collect();
        package.add_extra_dist(&extra, &section.exclude)?;
        Ok(package)
    }

    /// rpm spec template, resolved against the manifest directory.
    pub fn rpm_spec(&self) -> Option<PathBuf> {
        self.package
            .as_ref()
            .and_then(|p| p.rpm_spec.as_ref())
            .map(|spec| self.manifest_dir.join(spec))
    }
}

/// Manifest written by `confkit init`-style helpers and tests.
pub fn generate_default_manifest(name: &str) -> String {
    format!(
        r#"[package]
name = "{name}"
version = "0.1.0"
headers = ["include/**/*.h"]
sources = ["src/**/*.cpp"]

[variants]
defaults = true

[[options]]
kind = "separator"
text = "Build settings"

[[options]]
kind = "bool"
key = "BuildTests"
help = "Build the test suite"
default = false
"#
    )
}
