//! Configuration file support.
//!
//! Two locations are read:
//! - Global: `~/.confkit/config.toml` - user-wide defaults
//! - Project: `.confkit/config.toml` - project-specific overrides
//!
//! Project config takes precedence over global config.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Confkit configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Probe settings
    pub probe: ProbeConfig,

    /// Packaging settings
    pub dist: DistConfig,
}

/// Settings used while probing for options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Settings cache file (relative paths resolve against the project root)
    pub cache_file: Option<PathBuf>,

    /// pkg-config compatible tool (pkg-config, pkgconf, flagpoll)
    pub pkg_config: Option<String>,

    /// C compiler used for trial builds
    pub cc: Option<PathBuf>,

    /// C++ compiler used for trial builds
    pub cxx: Option<PathBuf>,

    /// Always probe verbosely
    pub verbose: bool,

    /// Extra `KEY=VALUE` settings applied before the command line
    pub settings: BTreeMap<String, String>,
}

/// Settings used when assembling distributions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DistConfig {
    /// Output directory for staged trees and archives
    pub dist_dir: Option<PathBuf>,

    /// Release number written into rpm packages
    pub rpm_release: Option<String>,

    /// rpmbuild executable
    pub rpmbuild: Option<String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.probe.cache_file.is_some() {
            self.probe.cache_file = other.probe.cache_file;
        }
        if other.probe.pkg_config.is_some() {
            self.probe.pkg_config = other.probe.pkg_config;
        }
        if other.probe.cc.is_some() {
            self.probe.cc = other.probe.cc;
        }
        if other.probe.cxx.is_some() {
            self.probe.cxx = other.probe.cxx;
        }
        if other.probe.verbose {
            self.probe.verbose = true;
        }
        self.probe.settings.extend(other.probe.settings);

        if other.dist.dist_dir.is_some() {
            self.dist.dist_dir = other.dist.dist_dir;
        }
        if other.dist.rpm_release.is_some() {
            self.dist.rpm_release = other.dist.rpm_release;
        }
        if other.dist.rpmbuild.is_some() {
            self.dist.rpmbuild = other.dist.rpmbuild;
        }
    }

    /// pkg-config tool name, defaulting to `pkg-config`.
    pub fn pkg_config_tool(&self) -> &str {
        self.probe.pkg_config.as_deref().unwrap_or("pkg-config")
    }

    /// rpm release number, defaulting to `1`.
    pub fn rpm_release(&self) -> &str {
        self.dist.rpm_release.as_deref().unwrap_or("1")
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.confkit/config.toml)
/// 2. Global config (~/.confkit/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global confkit config directory (~/.confkit).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".confkit"))
}

/// Get the project config path (.confkit/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".confkit").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.probe.cache_file.is_none());
        assert_eq!(config.pkg_config_tool(), "pkg-config");
        assert_eq!(config.rpm_release(), "1");
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[probe]
cache_file = "options.cache"
pkg_config = "flagpoll"

[probe.settings]
SdlDir = "/opt/sdl"

[dist]
dist_dir = "out"
rpm_release = "3"
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.probe.cache_file, Some(PathBuf::from("options.cache")));
        assert_eq!(config.pkg_config_tool(), "flagpoll");
        assert_eq!(config.probe.settings.get("SdlDir").unwrap(), "/opt/sdl");
        assert_eq!(config.dist.dist_dir, Some(PathBuf::from("out")));
        assert_eq!(config.rpm_release(), "3");
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(
            &global_path,
            r#"
[probe]
pkg_config = "pkgconf"
cc = "/usr/bin/gcc"

[probe.settings]
A = "global"
B = "global"
"#,
        )
        .unwrap();
        std::fs::write(
            &project_path,
            r#"
[probe]
cc = "/usr/bin/clang"

[probe.settings]
B = "project"
"#,
        )
        .unwrap();

        let config = load_config(&global_path, &project_path);
        assert_eq!(config.probe.cc, Some(PathBuf::from("/usr/bin/clang")));
        assert_eq!(config.pkg_config_tool(), "pkgconf");
        assert_eq!(config.probe.settings["A"], "global");
        assert_eq!(config.probe.settings["B"], "project");
    }

    #[test]
    fn test_invalid_config_falls_back_to_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[probe\nbroken").unwrap();

        let config = Config::load_or_default(&path);
        assert!(config.probe.pkg_config.is_none());
    }
}
