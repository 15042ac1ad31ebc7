use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::util::fs::{copy_file, relative_path};

/// Join the install location components of one file.
///
/// Empty and `.` components are skipped, and components after the first
/// are treated as relative so they never reset the path.
pub fn compose_path(
    install_prefix: &Path,
    bundle_prefix: &Path,
    added_prefix: &Path,
    file_prefix: &Path,
    name: &Path,
) -> PathBuf {
    let mut out = PathBuf::new();
    for (i, part) in [install_prefix, bundle_prefix, added_prefix, file_prefix, name]
        .into_iter()
        .enumerate()
    {
        for component in part.components() {
            match component {
                Component::CurDir => {}
                Component::RootDir | Component::Prefix(_) if i > 0 => {}
                other => out.push(other.as_os_str()),
            }
        }
    }
    out
}

/// A file to install, with the prefixes it was added under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallableFile {
    pub source: PathBuf,
    /// Prefix given when the file was added.
    pub added_prefix: PathBuf,
    /// The file's own directory, relative to the tree it was added from.
    pub file_prefix: PathBuf,
}

impl InstallableFile {
    pub fn file_name(&self) -> &Path {
        self.source
            .file_name()
            .map(Path::new)
            .unwrap_or_else(|| Path::new(""))
    }
}

/// A group of files installed under a common prefix.
#[derive(Debug, Clone, Default)]
pub struct FileBundle {
    prefix: PathBuf,
    files: Vec<InstallableFile>,
    installed: bool,
}

impl FileBundle {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        FileBundle {
            prefix: prefix.into(),
            files: Vec::new(),
            installed: false,
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn files(&self) -> &[InstallableFile] {
        &self.files
    }

    /// Add files under `prefix`. With `rel_to`, each file keeps its
    /// directory relative to that root below the prefix.
    pub fn add_files<I, P>(&mut self, files: I, prefix: impl AsRef<Path>, rel_to: Option<&Path>)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for source in files {
            let source = source.into();
            let file_prefix = match (rel_to, source.parent()) {
                (Some(root), Some(parent)) => relative_path(root, parent),
                _ => PathBuf::new(),
            };
            self.files.push(InstallableFile {
                source,
                added_prefix: prefix.as_ref().to_path_buf(),
                file_prefix,
            });
        }
    }

    /// Destination of every file when installed below `install_prefix`.
    pub fn targets(&self, install_prefix: &Path) -> Vec<(PathBuf, PathBuf)> {
        self.files
            .iter()
            .map(|f| {
                let dest = compose_path(
                    install_prefix,
                    &self.prefix,
                    &f.added_prefix,
                    &f.file_prefix,
                    f.file_name(),
                );
                (f.source.clone(), dest)
            })
            .collect()
    }

    /// Copy the files below `install_prefix`. A bundle installs once
    /// unless `ignore_installed` is set, as staging for packagers does.
    pub fn install(&mut self, install_prefix: &Path, ignore_installed: bool) -> Result<Vec<PathBuf>> {
        if !ignore_installed {
            if self.installed {
                bail!("bundle `{}` is already installed", self.prefix.display());
            }
            self.installed = true;
        }

        let mut installed = Vec::new();
        for (src, dest) in self.targets(install_prefix) {
            copy_file(&src, &dest)
                .with_context(|| format!("failed to install {}", src.display()))?;
            tracing::debug!("installed {} -> {}", src.display(), dest.display());
            installed.push(dest);
        }
        Ok(installed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_compose_path_skips_empty_components() {
        let p = compose_path(
            Path::new(""),
            Path::new("lib"),
            Path::new(""),
            Path::new(""),
            Path::new("x.h"),
        );
        assert_eq!(p, PathBuf::from("lib/x.h"));
        assert!(!p.to_string_lossy().contains("//"));
    }

    #[test]
    fn test_compose_path_all_components() {
        let p = compose_path(
            Path::new("/usr/local"),
            Path::new("share"),
            Path::new("/include/cppdom"),
            Path::new("./ext"),
            Path::new("x.h"),
        );
        assert_eq!(p, PathBuf::from("/usr/local/share/include/cppdom/ext/x.h"));
    }

    #[test]
    fn test_add_files_keeps_relative_dirs() {
        let mut bundle = FileBundle::new("");
        bundle.add_files(
            [PathBuf::from("/src/include/ext/a.h"), PathBuf::from("/src/include/b.h")],
            "include/demo",
            Some(Path::new("/src/include")),
        );
        let targets = bundle.targets(Path::new("/stage"));
        assert_eq!(targets[0].1, PathBuf::from("/stage/include/demo/ext/a.h"));
        assert_eq!(targets[1].1, PathBuf::from("/stage/include/demo/b.h"));
    }

    #[test]
    fn test_install_once() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("libdemo.a");
        std::fs::write(&src, "lib").unwrap();

        let mut bundle = FileBundle::new("");
        bundle.add_files([src], "lib", None);
        let stage = tmp.path().join("stage");
        let out = bundle.install(&stage, false).unwrap();
        assert_eq!(out, vec![stage.join("lib/libdemo.a")]);
        assert!(stage.join("lib/libdemo.a").is_file());

        assert!(bundle.install(&stage, false).is_err());
        assert!(bundle.install(&tmp.path().join("again"), true).is_ok());
    }
}
