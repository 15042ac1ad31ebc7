use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::Builder;

use super::package::Package;
use crate::util::fs::{ensure_dir, read_to_string, remove_dir_all_if_exists, write_string};
use crate::util::process::ProcessBuilder;

/// Turns a package into a distributable file.
pub trait Packager {
    /// Short name used in messages and on the command line.
    fn name(&self) -> &str;

    /// Build the distributable, returning its path.
    fn build(&self, package: &mut Package) -> Result<PathBuf>;
}

/// Stages the installed tree into `dist/<name>-<version>` and archives it
/// as `dist/<name>-<version>.tar.gz`.
#[derive(Debug, Clone, Default)]
pub struct TarGzPackager;

impl TarGzPackager {
    pub fn new() -> Self {
        TarGzPackager
    }
}

impl Packager for TarGzPackager {
    fn name(&self) -> &str {
        "tar.gz"
    }

    fn build(&self, package: &mut Package) -> Result<PathBuf> {
        let dist = package.dist_path();
        let full_name = package.full_name();
        let stage = dist.join(&full_name);

        remove_dir_all_if_exists(&stage)?;
        ensure_dir(&stage)?;
        package.install_into(&stage, true)?;

        let archive = dist.join(format!("{}.tar.gz", full_name));
        tracing::info!("Building .tar.gz dist: {}", archive.display());
        write_dir_archive(&archive, &stage, Path::new(&full_name))?;
        Ok(archive)
    }
}

/// Builds a binary rpm with `rpmbuild` from a spec template.
///
/// The template may use `_PACKAGE_NAME_`, `_PACKAGE_VERSION_` and
/// `_PACKAGE_RELEASE_`; they are replaced before `rpmbuild` sees it.
#[derive(Debug, Clone)]
pub struct RpmPackager {
    spec_file: PathBuf,
    release: String,
    arch: String,
    rpmbuild: PathBuf,
}

impl RpmPackager {
    pub fn new(spec_file: impl Into<PathBuf>) -> Self {
        RpmPackager {
            spec_file: spec_file.into(),
            release: "1".to_string(),
            arch: std::env::consts::ARCH.to_string(),
            rpmbuild: PathBuf::from("rpmbuild"),
        }
    }

    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = release.into();
        self
    }

    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = arch.into();
        self
    }

    pub fn with_rpmbuild(mut self, rpmbuild: impl Into<PathBuf>) -> Self {
        self.rpmbuild = rpmbuild.into();
        self
    }

    /// The spec template with package tokens replaced.
    pub fn render_spec(&self, template: &str, package: &Package) -> String {
        template
            .replace("_PACKAGE_NAME_", package.name())
            .replace("_PACKAGE_VERSION_", &package.version().to_string())
            .replace("_PACKAGE_RELEASE_", &self.release)
    }

    /// File name `rpmbuild` produces.
    pub fn rpm_file_name(&self, package: &Package) -> String {
        format!(
            "{}-{}-{}.{}.rpm",
            package.name(),
            package.version(),
            self.release,
            self.arch
        )
    }
}

impl Packager for RpmPackager {
    fn name(&self) -> &str {
        "rpm"
    }

    fn build(&self, package: &mut Package) -> Result<PathBuf> {
        let dist = package.dist_path();
        let topdir = dist.join("rpm");
        ensure_dir(&topdir)?;
        let topdir = topdir
            .canonicalize()
            .with_context(|| format!("failed to resolve {}", topdir.display()))?;

        let template = read_to_string(&self.spec_file)?;
        let spec_name = self
            .spec_file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("{}.spec", package.name()));
        let spec = topdir.join(format!("{}.out", spec_name));
        write_string(&spec, &self.render_spec(&template, package))?;

        let build_root = topdir.join(format!("{}-root", package.full_name()));
        remove_dir_all_if_exists(&build_root)?;
        package.stage(&build_root)?;

        tracing::info!("Building rpm for {}", package.full_name());
        ProcessBuilder::new(&self.rpmbuild)
            .arg("-bb")
            .arg("-v")
            .arg(format!("--define=_topdir {}", topdir.display()))
            .arg(format!("--define=_rpmdir {}", topdir.display()))
            .arg(format!("--buildroot={}", build_root.display()))
            .arg(&spec)
            .exec_and_check()?;

        let rpm_name = self.rpm_file_name(package);
        let pattern = topdir.join("*").join(&rpm_name);
        let built = glob::glob(&pattern.to_string_lossy())
            .with_context(|| format!("invalid glob pattern: {}", pattern.display()))?
            .filter_map(|entry| entry.ok())
            .next();
        let Some(built) = built else {
            bail!("rpmbuild did not produce {}", rpm_name);
        };

        let dest = dist.join(&rpm_name);
        std::fs::rename(&built, &dest).with_context(|| {
            format!("failed to move {} to {}", built.display(), dest.display())
        })?;
        Ok(dest)
    }
}

/// Archive headers, sources and extra dist files as
/// `dist/<name>-<version>-src.tar.gz`, everything under `<name>-<version>/`.
pub fn make_source_dist(package: &Package) -> Result<PathBuf> {
    let full_name = package.full_name();
    let archive = package
        .dist_path()
        .join(format!("{}-src.tar.gz", full_name));

    let mut entries = Vec::new();
    for file in package
        .headers()
        .iter()
        .chain(package.sources())
        .chain(package.extra_dist())
    {
        let name = Path::new(&full_name).join(package.dist_relative(file));
        if !entries.iter().any(|(_, n)| n == &name) {
            entries.push((file.clone(), name));
        }
    }

    tracing::info!("Building source dist: {}", archive.display());
    write_file_archive(&archive, &entries)?;
    Ok(archive)
}

fn create_archive(archive: &Path) -> Result<Builder<GzEncoder<File>>> {
    if let Some(parent) = archive.parent() {
        ensure_dir(parent)?;
    }
    let file = File::create(archive)
        .with_context(|| format!("failed to create {}", archive.display()))?;
    Ok(Builder::new(GzEncoder::new(file, Compression::default())))
}

fn finish_archive(builder: Builder<GzEncoder<File>>, archive: &Path) -> Result<()> {
    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .with_context(|| format!("failed to finish {}", archive.display()))?;
    Ok(())
}

fn write_dir_archive(archive: &Path, dir: &Path, name: &Path) -> Result<()> {
    let mut builder = create_archive(archive)?;
    builder
        .append_dir_all(name, dir)
        .with_context(|| format!("failed to archive {}", dir.display()))?;
    finish_archive(builder, archive)
}

fn write_file_archive(archive: &Path, entries: &[(PathBuf, PathBuf)]) -> Result<()> {
    let mut builder = create_archive(archive)?;
    for (src, name) in entries {
        builder
            .append_path_with_name(src, name)
            .with_context(|| format!("failed to archive {}", src.display()))?;
    }
    finish_archive(builder, archive)
}
