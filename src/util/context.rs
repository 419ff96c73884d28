//! Global context for xkengine operations.
//!
//! Provides centralized access to the working directory, configuration
//! locations and toolchain discovery.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::errors::BuildError;
use crate::util::config::{self, Config};
use crate::util::process::find_executable;

/// Environment variable naming the `go` binary to use.
pub const WHICH_GO_ENV: &str = "XKENGINE_WHICH_GO";

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global xkengine data (~/.xkengine/)
    home: Option<PathBuf>,
}

impl GlobalContext {
    /// Create a new GlobalContext for the process working directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("unable to determine current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        GlobalContext {
            cwd,
            home: config::global_config_dir(),
        }
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the global config path (~/.xkengine/config.toml).
    pub fn config_path(&self) -> Option<PathBuf> {
        self.home.as_ref().map(|home| home.join("config.toml"))
    }

    /// Get the project config path (.xkengine/config.toml).
    pub fn project_config_path(&self) -> PathBuf {
        config::project_config_path(&self.cwd)
    }

    /// Load configuration from files and environment.
    pub fn load_config(&self) -> Config {
        let global = self.config_path().unwrap_or_default();
        config::load_config(&global, &self.project_config_path())
    }
}

/// Locate the `go` binary.
///
/// An explicit setting is used as-is; otherwise `go` is looked up on `PATH`.
pub fn find_go(config: &Config) -> Result<PathBuf, BuildError> {
    if let Some(binary) = &config.go.binary {
        return Ok(binary.clone());
    }
    find_executable("go").ok_or_else(|| {
        BuildError::resolution(format!(
            "go toolchain not found on PATH; install Go or set {}",
            WHICH_GO_ENV
        ))
    })
}
