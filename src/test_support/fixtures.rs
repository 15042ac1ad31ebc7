//! Test fixtures for common test scenarios.
//!
//! This module provides pre-built project trees for manifest and
//! packaging tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Fixture for a complete project structure.
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    /// Project name.
    pub name: String,
    /// Confkit.toml content.
    pub manifest: String,
    /// Files (path relative to project root -> content).
    pub files: BTreeMap<PathBuf, String>,
}

impl ProjectFixture {
    /// Create a new empty project fixture.
    pub fn new(name: impl Into<String>) -> Self {
        ProjectFixture {
            name: name.into(),
            manifest: String::new(),
            files: BTreeMap::new(),
        }
    }

    /// A small C++ library with headers, sources, a built static library,
    /// a program and some extra files to distribute.
    pub fn library(name: impl Into<String>) -> Self {
        let name = name.into();
        let manifest = format!(
            r#"[package]
name = "{name}"
version = "1.0.3"
header_prefix = "{name}"
headers = ["include/**/*.h"]
sources = ["src/**/*.cpp"]
libraries = ["build/lib{name}.a"]
programs = ["build/{name}-tool"]
extra_dist = ["README", "doc"]
exclude = ["*.bak"]

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

[[options]]
kind = "simple"
key = "Prefix"
help = "Installation prefix"
default = "/usr/local"
"#
        );

        let guard = name.to_uppercase().replace('-', "_");
        ProjectFixture::new(name.clone())
            .with_manifest(manifest)
            .with_file(
                format!("include/{}.h", name),
                format!("#ifndef {guard}_H\n#define {guard}_H\nint {name}_init();\n#endif\n"),
            )
            .with_file(
                "src/lib.cpp",
                format!("#include \"{name}.h\"\nint {name}_init() {{ return 0; }}\n"),
            )
            .with_file(format!("build/lib{}.a", name), "!<arch>\n")
            .with_file(format!("build/{}-tool", name), "#!/bin/sh\n")
            .with_file("README", "Read me.\n")
            .with_file("doc/guide.txt", "Guide.\n")
            .with_file("doc/old.bak", "stale\n")
    }

    /// Set the manifest content.
    pub fn with_manifest(mut self, manifest: impl Into<String>) -> Self {
        self.manifest = manifest.into();
        self
    }

    /// Add a file.
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Write this fixture to a real directory and return the project root.
    pub fn write_to(&self, base_path: &Path) -> std::io::Result<PathBuf> {
        let project_path = base_path.join(&self.name);
        std::fs::create_dir_all(&project_path)?;

        if !self.manifest.is_empty() {
            std::fs::write(project_path.join("Confkit.toml"), &self.manifest)?;
        }
        for (path, content) in &self.files {
            let full = project_path.join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(full, content)?;
        }
        Ok(project_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_fixture_writes_tree() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = ProjectFixture::library("demo").write_to(tmp.path()).unwrap();

        assert!(root.join("Confkit.toml").is_file());
        assert!(root.join("include/demo.h").is_file());
        assert!(root.join("doc/guide.txt").is_file());
    }
}
