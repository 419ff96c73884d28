//! Plugin dependency descriptors.
//!
//! A Dependency names a Go package that plugs into the core program,
//! optionally pinned to a version.

use std::fmt;

/// A pluggable package reference.
///
/// Identity is the package path; the version is empty when the latest
/// applicable version should be used.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    /// Import path of the package, never ending in `/`
    package_path: String,

    /// Version query (tag, branch, commit), or empty
    version: String,
}

impl Dependency {
    /// Create an unversioned dependency.
    ///
    /// Trailing slashes are trimmed; they are easy to leave behind when a
    /// module path is pasted from a URL and are invalid for Go packages.
    pub fn new(package_path: impl AsRef<str>) -> Self {
        Dependency {
            package_path: package_path.as_ref().trim_end_matches('/').to_string(),
            version: String::new(),
        }
    }

    /// Pin the dependency to a version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Replace the package path, keeping the version.
    pub fn with_package_path(mut self, package_path: impl AsRef<str>) -> Self {
        self.package_path = package_path.as_ref().trim_end_matches('/').to_string();
        self
    }

    pub fn package_path(&self) -> &str {
        &self.package_path
    }

    /// Get the version, if one was requested.
    pub fn version(&self) -> Option<&str> {
        if self.version.is_empty() {
            None
        } else {
            Some(&self.version)
        }
    }

    /// Render as a manifest dependency token: `path version`.
    pub fn manifest_token(&self) -> String {
        match self.version() {
            Some(version) => format!("{} {}", self.package_path, version),
            None => self.package_path.clone(),
        }
    }
}

impl fmt::Display for Dependency {
    /// Formats as `path@version`, the form used for override targets.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version() {
            Some(version) => write!(f, "{}@{}", self.package_path, version),
            None => f.write_str(&self.package_path),
        }
    }
}
