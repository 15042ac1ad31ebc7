//! A loaded project: manifest, merged configuration and derived paths.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::manifest::{Manifest, MANIFEST_NAME};
use crate::core::variant::VariantSet;
use crate::probe::{detect_valid_archs, CompilerChecker, ProbeContext};
use crate::util::config::Config;
use crate::util::context::{GlobalContext, DEFAULT_CACHE_FILE};
use crate::util::platform::Arch;

/// Everything the commands need about the project in the current directory.
#[derive(Debug, Clone)]
pub struct Project {
    pub manifest: Manifest,
    pub config: Config,
    pub root: PathBuf,
}

impl Project {
    /// Find and load the manifest above the context's working directory.
    pub fn load(gctx: &GlobalContext) -> Result<Self> {
        let manifest_path = gctx.find_manifest().with_context(|| {
            format!(
                "could not find `{}` in `{}` or any parent directory",
                MANIFEST_NAME,
                gctx.cwd().display()
            )
        })?;
        let mut project = Self::from_manifest(&manifest_path, gctx.load_config())?;
        if gctx.is_verbose() {
            project.config.probe.verbose = true;
        }
        Ok(project)
    }

    /// Load a manifest with an explicit configuration.
    pub fn from_manifest(manifest_path: &Path, config: Config) -> Result<Self> {
        let manifest = Manifest::load(manifest_path)?;
        let root = manifest.manifest_dir.clone();
        Ok(Project {
            manifest,
            config,
            root,
        })
    }

    pub fn name(&self) -> String {
        self.manifest.name()
    }

    /// Settings cache file; relative paths resolve against the root.
    pub fn cache_file(&self) -> PathBuf {
        let file = self
            .config
            .probe
            .cache_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_FILE));
        self.root.join(file)
    }

    /// Output directory for distributions; relative paths resolve against
    /// the root.
    pub fn dist_dir(&self) -> PathBuf {
        let dir = self
            .config
            .dist
            .dist_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("dist"));
        self.root.join(dir)
    }

    /// `KEY=VALUE` settings from configuration, followed by `args`.
    pub fn setting_args(&self, args: &[String]) -> Vec<String> {
        self.config
            .probe
            .settings
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .chain(args.iter().cloned())
            .collect()
    }

    /// A probe context using the configured compilers and tools.
    pub fn probe_context(&self) -> ProbeContext {
        let mut checker = CompilerChecker::detect();
        if let Some(cc) = &self.config.probe.cc {
            checker = checker.with_cc(cc);
        }
        if let Some(cxx) = &self.config.probe.cxx {
            checker = checker.with_cxx(cxx);
        }
        ProbeContext::new(Box::new(checker))
            .with_pkg_config(self.config.pkg_config_tool())
            .with_verbose(self.config.probe.verbose)
    }

    /// Whether the conventional `arch` axis is in use, which needs a
    /// compiler to find the valid architectures.
    fn wants_arch_detection(&self) -> bool {
        let variants = &self.manifest.variants;
        variants.defaults && variants.keys.iter().any(|k| k == "arch")
    }

    /// The project's variant axes, detecting architectures when needed.
    pub fn variant_set(&self, ctx: &ProbeContext) -> VariantSet {
        let archs: Vec<Arch> = if self.wants_arch_detection() {
            detect_valid_archs(ctx.checker(), ctx.platform(), ctx.arch())
        } else {
            Vec::new()
        };
        self.manifest.variant_set(ctx.platform(), &archs)
    }
}
