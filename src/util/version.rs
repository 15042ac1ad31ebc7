//! Dotted version numbers as reported by `*-config --version` and headers.

use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::util::compile_regex;

static DOTTED: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"\d+(?:\.\d+)*"));
static HEADER_DEFINE: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(r"define\s+(\w+)_VERSION_(MAJOR|MINOR|PATCH)\s+(\d+)")
});

/// A dotted integer version such as `1.2` or `2.0.10`.
///
/// Comparison is componentwise after zero-padding the shorter side, so
/// `1.2 == 1.2.0` and `1.10 > 1.9`.
#[derive(Debug, Clone, Default)]
pub struct DottedVersion {
    parts: Vec<u64>,
}

impl DottedVersion {
    pub fn new(parts: Vec<u64>) -> Self {
        DottedVersion { parts }
    }

    pub fn parts(&self) -> &[u64] {
        &self.parts
    }

    /// Parse the leading version found in arbitrary tool output.
    ///
    /// Tools commonly print `foo 1.2.3` or `1.2.3-beta`; the first run of
    /// dotted digits wins.
    pub fn find_in(text: &str) -> Option<Self> {
        DOTTED.find(text).and_then(|m| m.as_str().parse().ok())
    }

    fn padded(&self, len: usize) -> impl Iterator<Item = u64> + '_ {
        self.parts
            .iter()
            .copied()
            .chain(std::iter::repeat(0))
            .take(len)
    }
}

impl FromStr for DottedVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty version string".to_string());
        }
        let parts = s
            .split('.')
            .map(|p| {
                p.parse::<u64>()
                    .map_err(|_| format!("invalid version component `{}` in `{}`", p, s))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DottedVersion { parts })
    }
}

impl fmt::Display for DottedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: Vec<String> = self.parts.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", s.join("."))
    }
}

impl Ord for DottedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        self.padded(len).cmp(other.padded(len))
    }
}

impl PartialOrd for DottedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for DottedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DottedVersion {}

/// True when `found` satisfies the minimum `required` version.
pub fn version_at_least(found: &DottedVersion, required: &DottedVersion) -> bool {
    found >= required
}

/// Extract `(major, minor, patch)` from `#define NAME_VERSION_MAJOR 1` style
/// defines. Missing components are reported as zero.
pub fn version_from_header_text(text: &str, name: &str) -> (u64, u64, u64) {
    let mut version = (0, 0, 0);
    for caps in HEADER_DEFINE.captures_iter(text) {
        if &caps[1] != name {
            continue;
        }
        let value = caps[3].parse().unwrap_or(0);
        match &caps[2] {
            "MAJOR" => version.0 = value,
            "MINOR" => version.1 = value,
            _ => version.2 = value,
        }
    }
    version
}

/// Read a header from disk and extract its version defines.
pub fn version_from_header(path: &Path, name: &str) -> Result<(u64, u64, u64)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read header: {}", path.display()))?;
    Ok(version_from_header_text(&text, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> DottedVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_zero_padded_comparison() {
        assert_eq!(v("1.2"), v("1.2.0"));
        assert!(v("1.2.1") > v("1.2"));
        assert!(v("1.10") > v("1.9"));
        assert!(v("2") > v("1.99.99"));
    }

    #[test]
    fn test_comparison_is_monotonic() {
        let ordered = ["0.9", "1", "1.0.1", "1.2", "1.2.3", "1.10", "2.0"];
        for window in ordered.windows(2) {
            assert!(v(window[0]) < v(window[1]), "{:?}", window);
        }
        assert!(version_at_least(&v("1.2.3"), &v("1.2")));
        assert!(!version_at_least(&v("1.1.9"), &v("1.2")));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<DottedVersion>().is_err());
        assert!("1.x".parse::<DottedVersion>().is_err());
    }

    #[test]
    fn test_find_in_tool_output() {
        assert_eq!(DottedVersion::find_in("sdl-config 1.2.15\n"), Some(v("1.2.15")));
        assert_eq!(DottedVersion::find_in("3.0-beta").map(|v| v.to_string()), Some("3.0".into()));
        assert!(DottedVersion::find_in("no digits").is_none());
        for _ in 0..3 {
            assert_eq!(DottedVersion::find_in("pkgconf 2.1.0"), Some(v("2.1.0")));
        }
    }

    #[test]
    fn test_version_from_header_text() {
        let header = "#define CPPDOM_VERSION_MAJOR 1\n\
                      #define CPPDOM_VERSION_MINOR 2\n\
                      #define CPPDOM_VERSION_PATCH 7\n";
        assert_eq!(version_from_header_text(header, "CPPDOM"), (1, 2, 7));
        assert_eq!(version_from_header_text(header, "OTHER"), (0, 0, 0));
        assert_eq!(version_from_header_text(header, "DOM"), (0, 0, 0));
    }

    #[test]
    fn test_version_from_header_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("version.h");
        std::fs::write(&path, "#define SDL_VERSION_MAJOR 2\n#define SDL_VERSION_MINOR 30\n").unwrap();
        assert_eq!(version_from_header(&path, "SDL").unwrap(), (2, 30, 0));
        assert!(version_from_header(&tmp.path().join("missing.h"), "SDL").is_err());
    }
}
