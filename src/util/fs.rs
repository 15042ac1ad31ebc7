//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;
use walkdir::WalkDir;

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write file: {}", path.display()))
}

/// Copy a file, creating the destination's parent directories.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }
    fs::copy(src, dst).with_context(|| {
        format!("failed to copy {} to {}", src.display(), dst.display())
    })?;
    Ok(())
}

/// Find files matching glob patterns relative to a base directory.
pub fn glob_files(base: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut results = Vec::new();

    for pattern in patterns {
        let full_pattern = base.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        for entry in glob(&pattern_str)
            .with_context(|| format!("invalid glob pattern: {}", pattern))?
        {
            match entry {
                Ok(path) => {
                    if path.is_file() {
                        results.push(path);
                    }
                }
                Err(e) => {
                    tracing::warn!("glob error: {}", e);
                }
            }
        }
    }

    results.sort();
    results.dedup();
    Ok(results)
}

/// Recursively list the files below `root`, skipping any entry whose file
/// name matches one of `exclude` (exact name or glob pattern).
pub fn walk_files(root: &Path, exclude: &[String]) -> Result<Vec<PathBuf>> {
    let patterns: Vec<glob::Pattern> = exclude
        .iter()
        .map(|e| glob::Pattern::new(e).with_context(|| format!("invalid exclude pattern: {}", e)))
        .collect::<Result<_>>()?;

    let is_excluded = |name: &str| patterns.iter().any(|p| p.matches(name));

    let mut files = Vec::new();
    let walker = WalkDir::new(root).sort_by_file_name().into_iter();
    for entry in walker.filter_entry(|e| {
        e.depth() == 0 || !is_excluded(&e.file_name().to_string_lossy())
    }) {
        let entry =
            entry.with_context(|| format!("failed to walk directory: {}", root.display()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_glob_files() {
        let tmp = TempDir::new().unwrap();
        let inc = tmp.path().join("include");
        fs::create_dir_all(&inc).unwrap();
        fs::write(inc.join("a.h"), "").unwrap();
        fs::write(inc.join("b.h"), "").unwrap();
        fs::write(inc.join("notes.txt"), "").unwrap();

        let files = glob_files(tmp.path(), &["include/*.h".to_string()]).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_walk_files_with_excludes() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("doc");
        fs::create_dir_all(root.join("html")).unwrap();
        fs::create_dir_all(root.join(".svn")).unwrap();
        fs::write(root.join("README"), "").unwrap();
        fs::write(root.join("html/index.html"), "").unwrap();
        fs::write(root.join(".svn/entries"), "").unwrap();
        fs::write(root.join("scratch.bak"), "").unwrap();

        let files = walk_files(&root, &[".svn".to_string(), "*.bak".to_string()]).unwrap();
        let rel: Vec<PathBuf> = files.iter().map(|f| relative_path(&root, f)).collect();
        assert_eq!(
            rel,
            vec![PathBuf::from("README"), PathBuf::from("html/index.html")]
        );
    }

    #[test]
    fn test_copy_file_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("x.h");
        fs::write(&src, "int x;").unwrap();
        let dst = tmp.path().join("stage/include/x.h");

        copy_file(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(dst).unwrap(), "int x;");
    }
}
