//! Implementation of `confkit dist`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::dist::{make_source_dist, Packager, RpmPackager, TarGzPackager};
use crate::ops::project::Project;

/// What `dist` produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistFormat {
    /// Binary `.tar.gz` of the installed tree
    TarGz,
    /// Binary rpm through `rpmbuild`
    Rpm,
    /// `.tar.gz` of headers, sources and extra dist files
    Source,
    /// pkg-config `.pc` file
    Pc,
}

impl DistFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistFormat::TarGz => "targz",
            DistFormat::Rpm => "rpm",
            DistFormat::Source => "source",
            DistFormat::Pc => "pc",
        }
    }
}

impl fmt::Display for DistFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DistFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "targz" | "tar.gz" | "tgz" => Ok(DistFormat::TarGz),
            "rpm" => Ok(DistFormat::Rpm),
            "source" | "src" => Ok(DistFormat::Source),
            "pc" => Ok(DistFormat::Pc),
            other => Err(format!("unknown dist format: {}", other)),
        }
    }
}

/// Options for a dist run.
#[derive(Debug, Clone, Default)]
pub struct DistOptions {
    pub formats: Vec<DistFormat>,

    /// rpm architecture, defaulting to the host's
    pub arch: Option<String>,

    /// Install the package below this directory as well
    pub install_root: Option<PathBuf>,
}

/// Build the requested distributions, returning the files written.
pub fn dist(project: &Project, opts: &DistOptions) -> Result<Vec<PathBuf>> {
    let mut package = project
        .manifest
        .dist_package()?
        .with_dist_dir(project.dist_dir());
    let mut artifacts = Vec::new();

    if let Some(root) = &opts.install_root {
        let installed = package.install_into(root, false)?;
        tracing::info!("Installed {} files into {}", installed.len(), root.display());
        artifacts.extend(installed);
    }

    for format in &opts.formats {
        let artifact = match format {
            DistFormat::TarGz => TarGzPackager::new().build(&mut package)?,
            DistFormat::Rpm => {
                let spec = project
                    .manifest
                    .rpm_spec()
                    .context("rpm packaging needs `rpm_spec` in [package]")?;
                let mut packager = RpmPackager::new(spec).with_release(project.config.rpm_release());
                if let Some(rpmbuild) = &project.config.dist.rpmbuild {
                    packager = packager.with_rpmbuild(rpmbuild);
                }
                if let Some(arch) = &opts.arch {
                    packager = packager.with_arch(arch);
                }
                packager.build(&mut package)?
            }
            DistFormat::Source => make_source_dist(&package)?,
            DistFormat::Pc => package.write_pc_file(&package.dist_path())?,
        };
        tracing::debug!("{} dist written to {}", format, artifact.display());
        artifacts.push(artifact);
    }
    Ok(artifacts)
}
