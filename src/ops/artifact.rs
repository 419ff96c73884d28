//! Handling of the produced binary: naming, capabilities, verification,
//! execution and removal.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::process::ExitStatus;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::errors::BuildError;
use crate::util::cancel::CancelToken;
use crate::util::config::Config;
use crate::util::fs::remove_file_if_exists;
use crate::util::platform::Platform;
use crate::util::process::{find_executable, ProcessBuilder, Waited};

/// Output path used by `build` when none is given.
pub fn default_output_path(platform: &Platform) -> PathBuf {
    PathBuf::from(format!("kengine{}", platform.exe_suffix()))
}

/// A process-scoped output path in the system temp directory.
pub fn temporary_output_path(platform: &Platform) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    std::env::temp_dir().join(format!(
        "kengine_{}_{}{}",
        std::process::id(),
        nanos,
        platform.exe_suffix()
    ))
}

/// Make a relative path explicit so it is not looked up on `PATH`.
pub fn runnable_path(path: &Path) -> PathBuf {
    match path.components().next() {
        Some(Component::Normal(_)) => Path::new(".").join(path),
        _ => path.to_path_buf(),
    }
}

/// Exit code to report for a finished child; signals map to 1.
pub fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

/// Whether to grant the binary permission to bind privileged ports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Run `setcap` after building
    pub setcap: bool,

    /// Run `setcap` through `sudo` when available
    pub sudo: bool,
}

impl Capabilities {
    pub fn from_config(config: &Config) -> Self {
        Capabilities {
            setcap: config.run.setcap.unwrap_or(false),
            sudo: config.run.sudo.unwrap_or(true),
        }
    }

    fn command(&self, binary: &Path) -> ProcessBuilder {
        let sudo = if self.sudo {
            find_executable("sudo")
        } else {
            None
        };
        let cmd = match sudo {
            Some(sudo) => ProcessBuilder::new(sudo).arg("setcap"),
            None => ProcessBuilder::new("setcap"),
        };
        cmd.arg("cap_net_bind_service=+ep").arg(binary)
    }

    /// Apply the capability to `binary` if requested.
    pub fn apply(&self, binary: &Path, cancel: &CancelToken) -> Result<(), BuildError> {
        if !self.setcap {
            return Ok(());
        }
        let cmd = self.command(binary);
        tracing::info!("Setting capabilities (requires admin privileges)");
        check_status(&cmd, binary, cancel)
    }
}

/// Run `<binary> version` if the binary can execute on this host.
pub fn smoke_test(
    binary: &Path,
    platform: &Platform,
    cancel: &CancelToken,
) -> Result<(), BuildError> {
    let host = Platform::host();
    if !platform.runs_on(&host) {
        tracing::info!(
            "Skipping version check: built for {}, running on {}",
            platform,
            host
        );
        return Ok(());
    }
    let cmd = ProcessBuilder::new(runnable_path(binary)).arg("version");
    check_status(&cmd, binary, cancel)
}

fn check_status(
    cmd: &ProcessBuilder,
    binary: &Path,
    cancel: &CancelToken,
) -> Result<(), BuildError> {
    let waited = cmd.run_inherited(cancel);
    match waited {
        Ok(Waited::Exited(status)) if status.success() => Ok(()),
        Ok(Waited::Exited(_)) if cancel.is_cancelled() => Err(BuildError::Cancelled {
            command: cmd.display_command(),
        }),
        Ok(Waited::Exited(status)) => Err(BuildError::run(
            binary,
            format!("`{}` exited with {}", cmd.display_command(), status),
        )),
        Ok(Waited::Cancelled) => Err(BuildError::Cancelled {
            command: cmd.display_command(),
        }),
        Err(e) => Err(BuildError::run(
            binary,
            format!("`{}`: {}", cmd.display_command(), e),
        )),
    }
}

/// A binary that is removed when released unless cleanup is suppressed.
#[derive(Debug)]
pub struct Artifact {
    path: PathBuf,
    skip_cleanup: bool,
    released: bool,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, skip_cleanup: bool) -> Self {
        Artifact {
            path: path.into(),
            skip_cleanup,
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Execute the binary with inherited stdio and return its exit code.
    ///
    /// A binary that exits by itself after an interrupt still reports its
    /// own code; only a binary that had to be killed is `Cancelled`.
    pub fn run(&self, args: &[String], cancel: &CancelToken) -> Result<i32, BuildError> {
        let cmd = ProcessBuilder::new(runnable_path(&self.path)).args(args);
        let waited = cmd
            .run_inherited(cancel)
            .map_err(|e| BuildError::run(&self.path, e.to_string()))?;
        match waited {
            Waited::Exited(status) => Ok(exit_code(status)),
            Waited::Cancelled => Err(BuildError::Cancelled {
                command: cmd.display_command(),
            }),
        }
    }

    /// Remove the binary, or report where it was kept.
    ///
    /// Failure to remove is only an error while the binary is still in use.
    pub fn finish(mut self) -> Result<Option<PathBuf>, BuildError> {
        self.release()
    }

    fn release(&mut self) -> Result<Option<PathBuf>, BuildError> {
        if self.released {
            return Ok(None);
        }
        self.released = true;

        if self.skip_cleanup {
            tracing::info!(
                "Skipping cleanup as requested; leaving artifact: {}",
                self.path.display()
            );
            return Ok(Some(self.path.clone()));
        }

        tracing::info!("Cleaning up artifact: {}", self.path.display());
        match remove_file_if_exists(&self.path) {
            Ok(()) => Ok(None),
            Err(source) => {
                let busy = is_busy(&source);
                let err = BuildError::Lifecycle {
                    path: self.path.clone(),
                    source,
                };
                if busy {
                    Err(err)
                } else {
                    tracing::warn!("{}", err);
                    Ok(None)
                }
            }
        }
    }
}

impl Drop for Artifact {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!("{}", e);
        }
    }
}

fn is_busy(err: &io::Error) -> bool {
    // ERROR_SHARING_VIOLATION
    if cfg!(windows) && err.raw_os_error() == Some(32) {
        return true;
    }
    matches!(
        err.kind(),
        io::ErrorKind::ResourceBusy | io::ErrorKind::ExecutableFileBusy
    )
}
