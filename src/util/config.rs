//! Configuration file and environment support for xkengine.
//!
//! Settings are layered, lowest precedence first:
//! - Built-in defaults
//! - Global: `~/.xkengine/config.toml`
//! - Project: `.xkengine/config.toml` in the working directory
//! - Environment variables (`KENGINE_VERSION`, `XKENGINE_*`, `GOOS`, ...)
//!
//! Command-line flags are applied on top by the command layer.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// xkengine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Core program settings
    pub core: CoreConfig,

    /// Build settings
    pub build: BuildSettings,

    /// Toolchain settings
    pub go: GoConfig,

    /// Settings for the produced artifact
    pub run: RunConfig,
}

/// Core program settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Module path of the core program
    pub module: Option<String>,

    /// Version to build (tag, branch, commit or `latest`)
    pub version: Option<String>,

    /// Import the core's standard module set
    pub standard_modules: Option<bool>,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Instrument the binary with the race detector
    pub race_detector: Option<bool>,

    /// Keep debug symbols and disable optimizations
    pub debug: Option<bool>,

    /// Enable cgo
    pub cgo: Option<bool>,

    /// Extra flags for `go build`, shell-quoted
    pub build_flags: Option<String>,

    /// Extra flags for `go mod`, shell-quoted
    pub mod_flags: Option<String>,

    /// Stop after dependency resolution
    pub skip_build: Option<bool>,

    /// Leave the temporary workspace and artifact behind
    pub skip_cleanup: Option<bool>,

    /// Target `GOOS`
    pub os: Option<String>,

    /// Target `GOARCH`
    pub arch: Option<String>,

    /// Target `GOARM`
    pub arm: Option<String>,
}

/// Toolchain configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoConfig {
    /// Path to the `go` binary
    pub binary: Option<PathBuf>,
}

/// Artifact configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Grant the artifact permission to bind privileged ports
    pub setcap: Option<bool>,

    /// Use sudo for setcap
    pub sudo: Option<bool>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        fn take<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        take(&mut self.core.module, other.core.module);
        take(&mut self.core.version, other.core.version);
        take(&mut self.core.standard_modules, other.core.standard_modules);

        take(&mut self.build.race_detector, other.build.race_detector);
        take(&mut self.build.debug, other.build.debug);
        take(&mut self.build.cgo, other.build.cgo);
        take(&mut self.build.build_flags, other.build.build_flags);
        take(&mut self.build.mod_flags, other.build.mod_flags);
        take(&mut self.build.skip_build, other.build.skip_build);
        take(&mut self.build.skip_cleanup, other.build.skip_cleanup);
        take(&mut self.build.os, other.build.os);
        take(&mut self.build.arch, other.build.arch);
        take(&mut self.build.arm, other.build.arm);

        take(&mut self.go.binary, other.go.binary);

        take(&mut self.run.setcap, other.run.setcap);
        take(&mut self.run.sudo, other.run.sudo);
    }

    /// Read overrides from environment variables.
    ///
    /// `lookup` abstracts `std::env::var` so the mapping can be tested.
    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let flag = |key: &str| text(key).map(|v| v.trim() == "1");

        let skip_build = flag("XKENGINE_SKIP_BUILD");
        // Skipping the build keeps the workspace around for inspection
        let skip_cleanup = match (flag("XKENGINE_SKIP_CLEANUP"), skip_build) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (explicit, _) => explicit,
        };

        Config {
            core: CoreConfig {
                module: text("KENGINE_MODULE"),
                version: text("KENGINE_VERSION"),
                standard_modules: None,
            },
            build: BuildSettings {
                race_detector: flag("XKENGINE_RACE_DETECTOR"),
                debug: flag("XKENGINE_DEBUG"),
                cgo: flag("CGO_ENABLED"),
                build_flags: text("XKENGINE_GO_BUILD_FLAGS"),
                mod_flags: text("XKENGINE_GO_MOD_FLAGS"),
                skip_build,
                skip_cleanup,
                os: text("GOOS"),
                arch: text("GOARCH"),
                arm: text("GOARM"),
            },
            go: GoConfig {
                binary: text("XKENGINE_WHICH_GO").map(PathBuf::from),
            },
            run: RunConfig {
                setcap: flag("XKENGINE_SETCAP"),
                sudo: text("XKENGINE_SUDO").map(|v| v.trim() != "0"),
            },
        }
    }
}

/// Load merged configuration from files and the process environment.
///
/// Order of precedence (highest to lowest):
/// 1. Environment variables
/// 2. Project config (.xkengine/config.toml)
/// 3. Global config (~/.xkengine/config.toml)
/// 4. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config.merge(Config::from_env(|key| std::env::var(key).ok()));
    config
}

/// Get the global xkengine config directory (~/.xkengine).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".xkengine"))
}

/// Get the global config path (~/.xkengine/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.xkengine/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".xkengine").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.core.version.is_none());
        assert!(config.build.cgo.is_none());
        assert!(config.go.binary.is_none());
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[core]
module = "example.com/fork/kengine"
version = "v2.1.0"

[build]
debug = true
build_flags = "-tags 'nobadger nomysql'"

[go]
binary = "/usr/local/go/bin/go"
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.core.module.as_deref(), Some("example.com/fork/kengine"));
        assert_eq!(config.core.version.as_deref(), Some("v2.1.0"));
        assert_eq!(config.build.debug, Some(true));
        assert_eq!(
            config.build.build_flags.as_deref(),
            Some("-tags 'nobadger nomysql'")
        );
        assert_eq!(config.go.binary, Some(PathBuf::from("/usr/local/go/bin/go")));
    }

    #[test]
    fn test_malformed_config_falls_back() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[build\ndebug = ").unwrap();

        assert_eq!(Config::load_or_default(&config_path), Config::default());
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.core.version = Some("v2.0.0".to_string());
        base.build.race_detector = Some(true);

        let mut override_cfg = Config::default();
        override_cfg.core.version = Some("master".to_string());

        base.merge(override_cfg);

        assert_eq!(base.core.version.as_deref(), Some("master"));
        assert_eq!(base.build.race_detector, Some(true)); // Not overridden
    }

    #[test]
    fn test_from_env() {
        let config = Config::from_env(env(&[
            ("KENGINE_VERSION", "v2.1.0"),
            ("CGO_ENABLED", "1"),
            ("XKENGINE_RACE_DETECTOR", "0"),
            ("XKENGINE_GO_BUILD_FLAGS", "-v"),
            ("XKENGINE_SUDO", "0"),
            ("GOOS", "windows"),
        ]));

        assert_eq!(config.core.version.as_deref(), Some("v2.1.0"));
        assert_eq!(config.build.cgo, Some(true));
        assert_eq!(config.build.race_detector, Some(false));
        assert_eq!(config.build.build_flags.as_deref(), Some("-v"));
        assert_eq!(config.build.os.as_deref(), Some("windows"));
        assert_eq!(config.run.sudo, Some(false));
        assert!(config.build.debug.is_none());
    }

    #[test]
    fn test_skip_build_implies_skip_cleanup() {
        let config = Config::from_env(env(&[("XKENGINE_SKIP_BUILD", "1")]));
        assert_eq!(config.build.skip_build, Some(true));
        assert_eq!(config.build.skip_cleanup, Some(true));
    }

    #[test]
    fn test_env_overrides_file() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("config.toml");
        std::fs::write(&project, "[core]\nversion = \"v2.0.0\"\n").unwrap();

        let mut config = Config::load_or_default(&project);
        config.merge(Config::from_env(env(&[("KENGINE_VERSION", "v2.2.0")])));

        assert_eq!(config.core.version.as_deref(), Some("v2.2.0"));
    }
}
