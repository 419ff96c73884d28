//! Host and target platform detection in Go's vocabulary.

use std::fmt;

/// An operating system / architecture pair as named by the Go toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// `GOOS`, e.g. `linux`
    pub os: String,

    /// `GOARCH`, e.g. `amd64`
    pub arch: String,

    /// `GOARM`, only meaningful for 32-bit ARM
    pub arm: Option<String>,
}

impl Platform {
    /// The platform this binary is running on.
    pub fn host() -> Self {
        Platform {
            os: host_os().to_string(),
            arch: host_arch().to_string(),
            arm: None,
        }
    }

    /// Check whether artifacts built for this platform run on `other`.
    pub fn runs_on(&self, other: &Platform) -> bool {
        self.os == other.os && self.arch == other.arch
    }

    /// File extension for executables on this platform.
    pub fn exe_suffix(&self) -> &'static str {
        if self.os == "windows" {
            ".exe"
        } else {
            ""
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)?;
        if let Some(arm) = &self.arm {
            write!(f, "/v{}", arm)?;
        }
        Ok(())
    }
}

/// Map the host OS to its `GOOS` name.
pub fn host_os() -> &'static str {
    go_os(std::env::consts::OS)
}

/// Map the host architecture to its `GOARCH` name.
pub fn host_arch() -> &'static str {
    go_arch(std::env::consts::ARCH, cfg!(target_endian = "little"))
}

fn go_os(os: &'static str) -> &'static str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

fn go_arch(arch: &'static str, little_endian: bool) -> &'static str {
    match arch {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "loongarch64" => "loong64",
        "powerpc64" if little_endian => "ppc64le",
        "powerpc64" => "ppc64",
        "mips" if little_endian => "mipsle",
        "mips64" if little_endian => "mips64le",
        other => other,
    }
}
