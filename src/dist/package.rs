use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use semver::Version;

use super::bundle::{compose_path, FileBundle};
use crate::util::fs::{relative_path, walk_files, write_string};

/// Something to install and distribute: libraries, programs, headers and
/// any extra files that go into source archives.
#[derive(Debug, Clone)]
pub struct Package {
    name: String,
    version: Version,
    prefix: PathBuf,
    description: String,
    dist_dir: PathBuf,
    root: PathBuf,

    bundles: Vec<FileBundle>,
    library_names: Vec<String>,
    headers: Vec<PathBuf>,
    sources: Vec<PathBuf>,
    extra_dist: Vec<PathBuf>,
}

impl Package {
    /// Create a package. The version must be `major.minor.patch`.
    pub fn new(name: &str, version: &str) -> Result<Self> {
        let version = Version::parse(version)
            .with_context(|| format!("package version `{}` is not major.minor.patch", version))?;
        if name.is_empty() {
            bail!("package name must not be empty");
        }

        Ok(Package {
            name: name.to_string(),
            version,
            prefix: PathBuf::from("/usr/local"),
            description: format!("{} Package", name),
            dist_dir: PathBuf::from("dist"),
            root: PathBuf::from("."),
            bundles: vec![FileBundle::new("")],
            library_names: Vec::new(),
            headers: Vec::new(),
            sources: Vec::new(),
            extra_dist: Vec::new(),
        })
    }

    pub fn with_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_dist_dir(mut self, dist_dir: impl Into<PathBuf>) -> Self {
        self.dist_dir = dist_dir.into();
        self
    }

    /// Directory source-distribution paths are relative to.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Dist directory, resolved against the package root.
    pub fn dist_path(&self) -> PathBuf {
        self.root.join(&self.dist_dir)
    }

    /// `<name>-<version>`, the stem of every archive.
    pub fn full_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    pub fn bundles(&self) -> &[FileBundle] {
        &self.bundles
    }

    pub fn headers(&self) -> &[PathBuf] {
        &self.headers
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn extra_dist(&self) -> &[PathBuf] {
        &self.extra_dist
    }

    pub fn library_names(&self) -> &[String] {
        &self.library_names
    }

    fn main_bundle(&mut self) -> &mut FileBundle {
        &mut self.bundles[0]
    }

    /// Add built libraries, installed into `lib`.
    pub fn add_library<I, P>(&mut self, files: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let files: Vec<PathBuf> = files.into_iter().map(Into::into).collect();
        for file in &files {
            if let Some(name) = library_name(file) {
                if !self.library_names.contains(&name) {
                    self.library_names.push(name);
                }
            }
        }
        self.main_bundle().add_files(files, "lib", None);
    }

    /// Add built programs, installed into `bin`.
    pub fn add_program<I, P>(&mut self, files: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.main_bundle().add_files(files, "bin", None);
    }

    /// Add headers, installed into `include/<prefix>` keeping their
    /// directory relative to `base`.
    pub fn add_headers<I, P>(&mut self, files: I, base: &Path, prefix: &str)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let files: Vec<PathBuf> = files.into_iter().map(Into::into).collect();
        self.headers.extend(files.iter().cloned());
        let dest = Path::new("include").join(prefix);
        self.main_bundle().add_files(files, dest, Some(base));
    }

    /// Add source files. They only go into source distributions.
    pub fn add_sources<I, P>(&mut self, files: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.sources.extend(files.into_iter().map(Into::into));
    }

    /// Create an extra bundle installed under `prefix`.
    pub fn create_file_bundle(&mut self, prefix: impl Into<PathBuf>) -> &mut FileBundle {
        self.bundles.push(FileBundle::new(prefix));
        let last = self.bundles.len() - 1;
        &mut self.bundles[last]
    }

    /// Add files for source distributions. Directories are walked
    /// recursively; entries whose name matches `exclude` are skipped.
    pub fn add_extra_dist(&mut self, files: &[PathBuf], exclude: &[String]) -> Result<()> {
        let patterns: Vec<glob::Pattern> = exclude
            .iter()
            .map(|e| {
                glob::Pattern::new(e).with_context(|| format!("invalid exclude pattern: {}", e))
            })
            .collect::<Result<_>>()?;

        for file in files {
            let excluded = file
                .file_name()
                .map(|n| patterns.iter().any(|p| p.matches(&n.to_string_lossy())))
                .unwrap_or(false);
            if excluded {
                continue;
            }
            if file.is_dir() {
                self.extra_dist.extend(walk_files(file, exclude)?);
            } else if file.is_file() {
                self.extra_dist.push(file.clone());
            } else {
                bail!("extra dist file {} does not exist", file.display());
            }
        }
        Ok(())
    }

    /// Install every bundle below the package prefix.
    pub fn install(&mut self) -> Result<Vec<PathBuf>> {
        let prefix = self.prefix.clone();
        self.install_into(&prefix, false)
    }

    /// Install every bundle below `install_prefix`.
    pub fn install_into(&mut self, install_prefix: &Path, ignore_installed: bool) -> Result<Vec<PathBuf>> {
        tracing::info!("Installing {} into {}", self.name, install_prefix.display());
        let mut out = Vec::new();
        for bundle in &mut self.bundles {
            out.extend(bundle.install(install_prefix, ignore_installed)?);
        }
        Ok(out)
    }

    /// Install into a scratch tree, as seen from `root` with the package
    /// prefix below it.
    pub fn stage(&mut self, root: &Path) -> Result<Vec<PathBuf>> {
        let target = compose_path(root, &self.prefix, Path::new(""), Path::new(""), Path::new(""));
        self.install_into(&target, true)
    }

    /// Path of a source file inside source archives.
    pub fn dist_relative(&self, file: &Path) -> PathBuf {
        if file.is_absolute() || self.root != Path::new(".") {
            relative_path(&self.root, file)
        } else {
            file.to_path_buf()
        }
    }

    /// pkg-config `.pc` file describing the installed package.
    pub fn pc_file_contents(&self) -> String {
        let mut libs = String::from("-L${libdir}");
        for name in &self.library_names {
            libs.push_str(" -l");
            libs.push_str(name);
        }
        format!(
            "prefix={prefix}\n\
             exec_prefix=${{prefix}}\n\
             libdir=${{exec_prefix}}/lib\n\
             includedir=${{prefix}}/include\n\
             \n\
             Name: {name}\n\
             Description: {description}\n\
             Version: {version}\n\
             Libs: {libs}\n\
             Cflags: -I${{includedir}}\n",
            prefix = self.prefix.display(),
            name = self.name,
            description = self.description,
            version = self.version,
        )
    }

    /// Write `<dir>/<name>.pc`.
    pub fn write_pc_file(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("{}.pc", self.name));
        write_string(&path, &self.pc_file_contents())?;
        Ok(path)
    }
}

/// Link name of a library file: `libfoo.a` and `foo.lib` both give `foo`.
fn library_name(file: &Path) -> Option<String> {
    let stem = file.file_stem()?.to_string_lossy();
    let ext = file.extension().map(|e| e.to_string_lossy().to_string());
    // libfoo.so.1 keeps its soname version after the extension
    let stem = stem.split(".so").next().unwrap_or(&stem).to_string();
    match ext.as_deref() {
        Some("lib") | Some("dll") => Some(stem),
        _ => Some(stem.strip_prefix("lib").unwrap_or(&stem).to_string()),
    }
}
