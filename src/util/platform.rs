//! Host platform and CPU architecture detection.
//!
//! Platform names follow the conventional build-system spelling
//! (`linux`, `darwin`, `win32`, ...) rather than Rust's `std::env::consts`.

use std::fmt;
use std::str::FromStr;

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    Darwin,
    Win32,
    FreeBsd,
    Unknown,
}

impl Platform {
    /// Detect the host platform.
    pub fn host() -> Self {
        match std::env::consts::OS {
            "linux" => Platform::Linux,
            "macos" => Platform::Darwin,
            "windows" => Platform::Win32,
            "freebsd" => Platform::FreeBsd,
            _ => Platform::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Darwin => "darwin",
            Platform::Win32 => "win32",
            Platform::FreeBsd => "freebsd",
            Platform::Unknown => "unknown",
        }
    }

    /// Whether this platform uses MSVC-style tooling.
    pub fn is_win32(&self) -> bool {
        matches!(self, Platform::Win32)
    }

    /// Prefix the compiler expects before an include directory.
    pub fn include_prefix(&self) -> &'static str {
        if self.is_win32() {
            "/I"
        } else {
            "-I"
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "darwin" | "macos" => Ok(Platform::Darwin),
            "win32" | "windows" => Ok(Platform::Win32),
            "freebsd" => Ok(Platform::FreeBsd),
            other => Err(format!("unknown platform: {}", other)),
        }
    }
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    Ia32,
    X64,
    Ia64,
    Ppc,
    Ppc64,
    Aarch64,
    Universal,
    Unknown,
}

impl Arch {
    /// Detect the host architecture.
    pub fn host() -> Self {
        match std::env::consts::ARCH {
            "x86" => Arch::Ia32,
            "x86_64" => Arch::X64,
            "powerpc" => Arch::Ppc,
            "powerpc64" => Arch::Ppc64,
            "aarch64" => Arch::Aarch64,
            _ => Arch::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Ia32 => "ia32",
            Arch::X64 => "x64",
            Arch::Ia64 => "ia64",
            Arch::Ppc => "ppc",
            Arch::Ppc64 => "ppc64",
            Arch::Aarch64 => "aarch64",
            Arch::Universal => "universal",
            Arch::Unknown => "unknown",
        }
    }

    /// Name of the library directory under an install prefix.
    pub fn lib_dir_name(&self) -> &'static str {
        match self {
            Arch::X64 | Arch::Ia64 => "lib64",
            _ => "lib",
        }
    }

    /// Compiler flags selecting this architecture, if the platform's
    /// compiler can target it at all.
    pub fn compile_flags(&self, platform: Platform) -> Option<Vec<&'static str>> {
        match (platform, self) {
            (Platform::Darwin, Arch::Ppc) => Some(vec!["-arch", "ppc"]),
            (Platform::Darwin, Arch::Ppc64) => Some(vec!["-arch", "ppc64"]),
            (Platform::Darwin, Arch::Ia32) => Some(vec!["-arch", "i386"]),
            (Platform::Darwin, Arch::X64) => Some(vec!["-arch", "x86_64"]),
            (Platform::Darwin, Arch::Universal) => {
                Some(vec!["-arch", "ppc", "-arch", "i386"])
            }
            (Platform::Win32, _) => None,
            (_, Arch::Ia32) => Some(vec!["-m32"]),
            (_, Arch::X64) => Some(vec!["-m64"]),
            _ => None,
        }
    }

    /// Architectures worth trying on the given platform and host.
    pub fn candidates(platform: Platform, host: Arch) -> Vec<Arch> {
        match platform {
            Platform::Darwin => vec![
                Arch::Ppc,
                Arch::Ppc64,
                Arch::Ia32,
                Arch::X64,
                Arch::Universal,
            ],
            _ if matches!(host, Arch::Ia32 | Arch::X64) => vec![Arch::Ia32, Arch::X64],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ia32" | "i386" | "x86" => Ok(Arch::Ia32),
            "x64" | "x86_64" | "amd64" => Ok(Arch::X64),
            "ia64" => Ok(Arch::Ia64),
            "ppc" => Ok(Arch::Ppc),
            "ppc64" => Ok(Arch::Ppc64),
            "aarch64" | "arm64" => Ok(Arch::Aarch64),
            "universal" => Ok(Arch::Universal),
            other => Err(format!("unknown architecture: {}", other)),
        }
    }
}
