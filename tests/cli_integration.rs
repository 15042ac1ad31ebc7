//! CLI integration tests for confkit.
//!
//! These tests drive the binary against small projects written into
//! temporary directories. HOME points into the temporary directory so no
//! user-wide configuration leaks in.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the confkit binary command, isolated from the user's config.
fn confkit(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("confkit").unwrap();
    cmd.env("HOME", home).env_remove("RUST_LOG");
    cmd
}

/// Create a temporary directory for test projects.
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

const MANIFEST: &str = r#"
[package]
name = "widget"
version = "2.1.0"
header_prefix = "widget"
headers = ["include/**/*.h"]
sources = ["src/**/*.cpp"]
libraries = ["build/libwidget.a"]
extra_dist = ["README"]

[variants]
defaults = true
keys = ["type"]

[[options]]
kind = "separator"
text = "Build settings"

[[options]]
kind = "bool"
key = "BuildTests"
help = "Build the test suite"
default = false

[[options]]
kind = "enum"
key = "Mode"
help = "Optimization mode"
default = "fast"
allowed = ["fast", "small"]

[[options]]
kind = "package"
name = "Missing"
header = "confkit_surely_missing_header.h"
"#;

/// Write the widget project and return its root.
fn widget_project(tmp: &TempDir) -> std::path::PathBuf {
    let root = tmp.path().join("widget");
    fs::create_dir_all(root.join("include")).unwrap();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("build")).unwrap();
    fs::write(root.join("Confkit.toml"), MANIFEST).unwrap();
    fs::write(root.join("include/widget.h"), "int widget();\n").unwrap();
    fs::write(root.join("src/widget.cpp"), "int widget() { return 1; }\n").unwrap();
    fs::write(root.join("build/libwidget.a"), "!<arch>\n").unwrap();
    fs::write(root.join("README"), "widget\n").unwrap();
    root
}

// ============================================================================
// confkit init
// ============================================================================

#[test]
fn test_init_creates_manifest() {
    let tmp = temp_dir();
    let dir = tmp.path().join("gadget");

    confkit(tmp.path())
        .args(["init", "gadget"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let manifest = fs::read_to_string(dir.join("Confkit.toml")).unwrap();
    assert!(manifest.contains("name = \"gadget\""));

    confkit(tmp.path())
        .args(["init", "gadget"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

// ============================================================================
// confkit probe
// ============================================================================

#[test]
fn test_probe_saves_settings() {
    let tmp = temp_dir();
    let root = widget_project(&tmp);

    confkit(tmp.path())
        .args(["probe", "BuildTests=yes", "Mode=small"])
        .current_dir(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("[!!] Missing"))
        .stdout(predicate::str::contains("BuildTests = true"))
        .stdout(predicate::str::contains("Settings saved to"));

    let cache = fs::read_to_string(root.join("options.cache")).unwrap();
    assert!(cache.contains("BuildTests = True"));
    assert!(cache.contains("Mode = 'small'"));
    assert!(cache.contains("var_type = ['debug', 'optimized']"));
    assert!(cache.contains("default_debug_level = 'standard'"));

    // The next run starts from the cache.
    confkit(tmp.path())
        .args(["probe", "--no-save"])
        .current_dir(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("Mode = small"));
}

#[test]
fn test_probe_json() {
    let tmp = temp_dir();
    let root = widget_project(&tmp);

    let output = confkit(tmp.path())
        .args(["probe", "--json", "--no-save"])
        .current_dir(&root)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["env"]["BuildTests"], false);
    assert_eq!(json["saved"], false);
    assert_eq!(json["variants"].as_array().unwrap().len(), 2);
    assert!(json["report"]["processed"]
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n == "Missing"));
    assert!(!root.join("options.cache").exists());
}

#[test]
fn test_probe_rejects_invalid_value() {
    let tmp = temp_dir();
    let root = widget_project(&tmp);

    confkit(tmp.path())
        .args(["probe", "Mode=huge"])
        .current_dir(&root)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value for `Mode`"))
        .stderr(predicate::str::contains("`huge`: expected one of fast, small"));
}

#[test]
fn test_probe_required_failure() {
    let tmp = temp_dir();
    let root = widget_project(&tmp);
    let manifest = format!("{}required = true\n", MANIFEST);
    fs::write(root.join("Confkit.toml"), manifest).unwrap();

    confkit(tmp.path())
        .args(["probe", "--no-save"])
        .current_dir(&root)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing"));
}

#[test]
fn test_probe_outside_project() {
    let tmp = temp_dir();

    confkit(tmp.path())
        .arg("probe")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not find `Confkit.toml`"));
}

// ============================================================================
// confkit options / variants
// ============================================================================

#[test]
fn test_options_help() {
    let tmp = temp_dir();
    let root = widget_project(&tmp);

    confkit(tmp.path())
        .args(["options", "--width", "100", "BuildTests=on"])
        .current_dir(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("Build settings"))
        .stdout(predicate::str::contains("BuildTests:"))
        .stdout(predicate::str::contains("Build the test suite (yes|no)"))
        .stdout(predicate::str::contains("[yes]"))
        .stdout(predicate::str::contains("Optimization mode (fast|small)"))
        .stdout(predicate::str::contains("var_type"));
}

#[test]
fn test_variants_listing() {
    let tmp = temp_dir();
    let root = widget_project(&tmp);

    confkit(tmp.path())
        .arg("variants")
        .current_dir(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("arch=default type=debug"))
        .stdout(predicate::str::contains("arch=default type=optimized"))
        .stdout(predicate::str::contains("2 combination(s)"));

    let output = confkit(tmp.path())
        .args(["variants", "--json", "var_type=optimized"])
        .current_dir(&root)
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["flags"]["cppdefines"][0], "NDEBUG");

    confkit(tmp.path())
        .args(["variants", "var_type=optimized"])
        .current_dir(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 combination(s)"))
        .stdout(predicate::str::contains("type=debug").not());
}

// ============================================================================
// confkit dist
// ============================================================================

#[test]
fn test_dist_archives() {
    let tmp = temp_dir();
    let root = widget_project(&tmp);

    confkit(tmp.path())
        .args(["dist", "-f", "targz", "-f", "source", "-f", "pc"])
        .current_dir(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("widget-2.1.0.tar.gz"))
        .stdout(predicate::str::contains("widget-2.1.0-src.tar.gz"))
        .stdout(predicate::str::contains("widget.pc"));

    assert!(root.join("dist/widget-2.1.0.tar.gz").is_file());
    assert!(root.join("dist/widget-2.1.0/include/widget/widget.h").is_file());
    assert!(root.join("dist/widget-2.1.0-src.tar.gz").is_file());

    let pc = fs::read_to_string(root.join("dist/widget.pc")).unwrap();
    assert!(pc.contains("Version: 2.1.0"));
    assert!(pc.contains("-lwidget"));
}

#[test]
fn test_dist_install_only() {
    let tmp = temp_dir();
    let root = widget_project(&tmp);
    let dest = tmp.path().join("prefix");

    confkit(tmp.path())
        .args(["dist", "--install-only", "--install"])
        .arg(&dest)
        .current_dir(&root)
        .assert()
        .success();

    assert!(dest.join("lib/libwidget.a").is_file());
    assert!(dest.join("include/widget/widget.h").is_file());
    assert!(!root.join("dist").exists());
}

// ============================================================================
// confkit completions
// ============================================================================

#[test]
fn test_completions_bash() {
    let tmp = temp_dir();

    confkit(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("confkit"));
}

// ============================================================================
// confkit platform
// ============================================================================

#[test]
fn test_platform_json() {
    let tmp = temp_dir();

    let output = confkit(tmp.path())
        .args(["platform", "--json"])
        .current_dir(tmp.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["platform"], std::env::consts::OS.replace("macos", "darwin"));
    assert!(json["tools"].as_array().unwrap().len() >= 4);
}
