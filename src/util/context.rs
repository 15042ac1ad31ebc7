//! Global context for confkit operations.
//!
//! Provides centralized access to paths, merged configuration and
//! output preferences. Nothing in here is mutated after startup.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use crate::core::manifest::MANIFEST_NAME;
use crate::util::config::{global_config_dir, load_config, project_config_path, Config};

static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("com", "confkit", "confkit"));

/// Default settings cache file name, relative to the project root.
pub const DEFAULT_CACHE_FILE: &str = "options.cache";

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global confkit data
    home: PathBuf,

    /// Whether to use verbose output
    verbose: bool,

    /// Whether to use colors in output
    color: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let home = global_config_dir()
            .or_else(|| PROJECT_DIRS.as_ref().map(|d| d.config_dir().to_path_buf()))
            .unwrap_or_else(|| PathBuf::from(".confkit"));

        GlobalContext {
            cwd,
            home,
            verbose: false,
            color: true,
        }
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// The confkit home directory (~/.confkit/).
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Global config file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn color(&self) -> bool {
        self.color
    }

    /// Find `Confkit.toml` starting from cwd and searching upward.
    pub fn find_manifest(&self) -> Option<PathBuf> {
        self.cwd
            .ancestors()
            .map(|dir| dir.join(MANIFEST_NAME))
            .find(|candidate| candidate.is_file())
    }

    /// Project root: the manifest's directory, or cwd when there is none.
    pub fn project_root(&self) -> PathBuf {
        self.find_manifest()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| self.cwd.clone())
    }

    /// Load the merged global and project configuration.
    pub fn load_config(&self) -> Config {
        load_config(&self.config_path(), &project_config_path(&self.project_root()))
    }

    /// Resolve the settings cache file for this project.
    pub fn cache_file(&self, config: &Config) -> PathBuf {
        let file = config
            .probe
            .cache_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_FILE));
        if file.is_absolute() {
            file
        } else {
            self.project_root().join(file)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_manifest_searches_upward() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(MANIFEST_NAME), "").unwrap();
        let nested = tmp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let ctx = GlobalContext::with_cwd(nested);
        assert_eq!(ctx.find_manifest(), Some(tmp.path().join(MANIFEST_NAME)));
        assert_eq!(ctx.project_root(), tmp.path());
    }

    #[test]
    fn test_cache_file_resolves_against_root() {
        let tmp = TempDir::new().unwrap();
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf());

        let mut config = Config::default();
        assert_eq!(ctx.cache_file(&config), tmp.path().join(DEFAULT_CACHE_FILE));

        config.probe.cache_file = Some(PathBuf::from("build/opts.cache"));
        assert_eq!(ctx.cache_file(&config), tmp.path().join("build/opts.cache"));
    }
}
