//! Implementation of `confkit init`.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::core::manifest::{generate_default_manifest, MANIFEST_NAME};

/// Write a starter `Confkit.toml` into `path`, creating the directory.
pub fn init_project(path: &Path, name: Option<&str>) -> Result<()> {
    let manifest_path = path.join(MANIFEST_NAME);
    if manifest_path.exists() {
        bail!("`{}` already exists in `{}`", MANIFEST_NAME, path.display());
    }

    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }

    let name = match name {
        Some(name) => name.to_string(),
        None => path
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .unwrap_or_else(|| "project".to_string()),
    };

    fs::write(&manifest_path, generate_default_manifest(&name))
        .with_context(|| format!("failed to write {}", manifest_path.display()))?;
    tracing::info!("Created {}", manifest_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::Manifest;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_manifest() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("widget");

        init_project(&dir, None).unwrap();
        let manifest = Manifest::load(&dir.join(MANIFEST_NAME)).unwrap();
        assert_eq!(manifest.name(), "widget");

        let err = init_project(&dir, Some("other")).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
