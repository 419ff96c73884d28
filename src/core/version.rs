//! Core version references and semantic import versioning.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

use crate::core::errors::BuildError;

/// Default module path of the core program.
pub const DEFAULT_CORE_MODULE: &str = "github.com/khulnasoft/kengine";

/// Sentinel for the latest stable tag.
pub const LATEST: &str = "latest";

/// Matches a trailing major version suffix such as `/v2`.
static MAJOR_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".+/v(\d+)$").expect("valid major suffix pattern"));

/// The core version to build against.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CoreVersion {
    /// The latest stable tag, resolved by the toolchain.
    #[default]
    Latest,
    /// A tag, branch or commit.
    Ref(String),
}

impl CoreVersion {
    /// Parse a version reference; empty input and `latest` select the sentinel.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw == LATEST {
            CoreVersion::Latest
        } else {
            CoreVersion::Ref(raw.to_string())
        }
    }

    /// The version query written into the manifest.
    pub fn query(&self) -> &str {
        match self {
            CoreVersion::Latest => LATEST,
            CoreVersion::Ref(r) => r,
        }
    }

    /// Check whether this looks like a semantic version tag.
    fn is_tag(&self) -> bool {
        match self {
            CoreVersion::Latest => false,
            CoreVersion::Ref(r) => r.starts_with('v') && r.contains('.'),
        }
    }
}

impl fmt::Display for CoreVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query())
    }
}

/// Compute the module path of the core program for a version.
///
/// Without a tag the core is assumed to be at major version 2.
pub fn core_module_path(base: &str, version: &CoreVersion) -> Result<String, BuildError> {
    let base = base.trim_end_matches('/');
    let mut module = base.to_string();
    if !version.is_tag() && !MAJOR_SUFFIX.is_match(base) {
        module.push_str("/v2");
    }
    match version {
        CoreVersion::Latest => Ok(module),
        CoreVersion::Ref(r) => versioned_module_path(&module, r),
    }
}

/// Reconcile a module path with the major version of the requested version.
///
/// Versions without a leading `v` (branches, commits) leave the path
/// alone; a version that starts with `v` is expected to be strict semver.
pub fn versioned_module_path(module_path: &str, version: &str) -> Result<String, BuildError> {
    // Only `v`-prefixed versions are semantic versions to the toolchain
    let Some(semver) = version.strip_prefix('v') else {
        return Ok(module_path.to_string());
    };
    let parsed = Version::parse(semver)
        .map_err(|e| BuildError::resolution(format!("{}: {}", version, e)))?;
    let major = parsed.major;

    if let Some(caps) = MAJOR_SUFFIX.captures(module_path) {
        let path_major: u64 = caps[1].parse().map_err(|_| {
            BuildError::resolution(format!("invalid major version suffix in {}", module_path))
        })?;
        if path_major != major {
            return Err(BuildError::resolution(format!(
                "versioned module path ({}) and requested module major version ({}) diverge",
                module_path, major
            )));
        }
        Ok(module_path.to_string())
    } else if major > 1 {
        Ok(format!("{}/v{}", module_path.trim_end_matches('/'), major))
    } else {
        Ok(module_path.to_string())
    }
}
