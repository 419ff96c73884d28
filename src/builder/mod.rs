//! Compilation of a synthesized workspace.
//!
//! A build pins the workspace's dependencies with `go mod tidy`, then
//! compiles it with `go build`. The workspace is released after either
//! step completes or fails.

pub mod go;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::core::build_config::BuildConfig;
use crate::core::errors::BuildError;
use crate::util::cancel::CancelToken;
use crate::util::fs::absolutize;
use crate::util::process::{ProcessBuilder, Waited};
use crate::workspace::{DevelopmentContext, Synthesizer};

/// Result of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Absolute path of the produced binary, absent when the build was skipped
    pub output: Option<PathBuf>,

    /// Workspace left on disk because cleanup was suppressed
    pub retained_workspace: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Resolve,
    Compile,
}

/// Drives the toolchain for one configuration.
pub struct Builder<'a> {
    config: &'a BuildConfig,
    development: Option<&'a DevelopmentContext>,
    cancel: &'a CancelToken,
}

impl<'a> Builder<'a> {
    pub fn new(config: &'a BuildConfig, cancel: &'a CancelToken) -> Self {
        Builder {
            config,
            development: None,
            cancel,
        }
    }

    /// Build the package under development along with the plugins.
    pub fn with_development(mut self, development: Option<&'a DevelopmentContext>) -> Self {
        self.development = development;
        self
    }

    /// Synthesize a workspace and compile it to `output`.
    ///
    /// A relative `output` is resolved against `cwd`. Concurrent builds to
    /// the same output path are not coordinated.
    pub fn build(&self, output: &Path, cwd: &Path) -> Result<BuildReport> {
        if output.as_os_str().is_empty() {
            bail!("output file path is required");
        }
        let output = absolutize(output, cwd);

        if self.config.race_detector && !self.config.compile.cgo {
            tracing::warn!("Enabling cgo because it is required by the race detector");
        }

        let workspace = Synthesizer::new(self.config)
            .with_development(self.development)
            .synthesize()?;
        let result = self.compile(workspace.path(), &output);
        let retained_workspace = workspace.close();
        let built = result?;

        Ok(BuildReport {
            output: built.then_some(output),
            retained_workspace,
        })
    }

    /// Returns whether a binary was produced.
    fn compile(&self, workspace: &Path, output: &Path) -> Result<bool, BuildError> {
        tracing::info!("Pinning versions");
        self.run_step(go::tidy_command(self.config, workspace), Step::Resolve)?;

        if self.config.skip_build {
            tracing::info!("Skipping build as requested");
            return Ok(false);
        }

        tracing::info!("Building Kengine");
        self.run_step(
            go::build_command(self.config, workspace, output),
            Step::Compile,
        )?;
        tracing::info!("Build complete: {}", output.display());
        Ok(true)
    }

    fn run_step(&self, cmd: ProcessBuilder, step: Step) -> Result<(), BuildError> {
        let command = cmd.display_command();
        if self.cancel.is_cancelled() {
            return Err(BuildError::Cancelled { command });
        }

        let output = cmd.exec_captured(self.cancel).map_err(|e| {
            let message = format!("failed to run `{}`: {}", command, e);
            match step {
                Step::Resolve => BuildError::resolution(message),
                Step::Compile => BuildError::compile(message, ""),
            }
        })?;

        match output.waited {
            Waited::Cancelled => Err(BuildError::Cancelled { command }),
            Waited::Exited(status) if status.success() => Ok(()),
            Waited::Exited(_) if self.cancel.is_cancelled() => {
                Err(BuildError::Cancelled { command })
            }
            Waited::Exited(status) => {
                let message = format!("`{}` failed ({})", command, status);
                let err = match step {
                    Step::Resolve => BuildError::resolution_with(message, output.combined),
                    Step::Compile => BuildError::compile(message, output.combined),
                };
                Err(if self.config.echo { err.streamed() } else { err })
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::FakeGo;
    use tempfile::TempDir;

    fn config(go: &Path, root: &Path) -> BuildConfig {
        let mut config = BuildConfig::new(go).with_work_root(root);
        config.echo = false;
        config
    }

    #[test]
    fn test_build_produces_binary_and_removes_workspace() {
        let tmp = TempDir::new().unwrap();
        let go = FakeGo::new().install(tmp.path());
        let output = tmp.path().join("kengine");

        let report = Builder::new(&config(&go.path, tmp.path()), &CancelToken::new())
            .build(&output, tmp.path())
            .unwrap();

        assert_eq!(report.output, Some(output.clone()));
        assert_eq!(report.retained_workspace, None);
        assert!(output.exists());

        let invocations = go.invocations();
        assert_eq!(invocations.len(), 2);
        assert!(invocations[0].ends_with(" mod tidy"));
        assert!(invocations[1].contains(" build -ldflags -w -s -trimpath -o "));
        for workspace in go.workspaces() {
            assert!(!workspace.exists());
        }
    }

    #[test]
    fn test_skip_build_resolves_only() {
        let tmp = TempDir::new().unwrap();
        let go = FakeGo::new().install(tmp.path());
        let output = tmp.path().join("kengine");
        let mut config = config(&go.path, tmp.path());
        config.skip_build = true;
        config.skip_cleanup = true;

        let report = Builder::new(&config, &CancelToken::new())
            .build(&output, tmp.path())
            .unwrap();

        assert_eq!(report.output, None);
        assert!(!output.exists());
        assert_eq!(go.invocations().len(), 1);

        let retained = report.retained_workspace.unwrap();
        assert!(retained.join("go.mod").exists());
        assert_eq!(go.workspaces(), vec![retained]);
    }

    #[test]
    fn test_resolution_failure_carries_diagnostic() {
        let tmp = TempDir::new().unwrap();
        let go = FakeGo::new()
            .tidy("echo 'unknown revision v9.9.9' >&2\nexit 1")
            .install(tmp.path());

        let err = Builder::new(&config(&go.path, tmp.path()), &CancelToken::new())
            .build(&tmp.path().join("kengine"), tmp.path())
            .unwrap_err();

        match err.downcast_ref::<BuildError>() {
            Some(BuildError::Resolution { diagnostic, .. }) => {
                assert!(diagnostic.contains("unknown revision v9.9.9"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        for workspace in go.workspaces() {
            assert!(!workspace.exists());
        }
    }

    #[test]
    fn test_compile_failure_carries_output() {
        let tmp = TempDir::new().unwrap();
        let go = FakeGo::new()
            .build("echo 'undefined: kengine.Foo'\nexit 2")
            .install(tmp.path());

        let err = Builder::new(&config(&go.path, tmp.path()), &CancelToken::new())
            .build(&tmp.path().join("kengine"), tmp.path())
            .unwrap_err();

        match err.downcast_ref::<BuildError>() {
            Some(BuildError::Compile { output, .. }) => {
                assert!(output.contains("undefined: kengine.Foo"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        for workspace in go.workspaces() {
            assert!(!workspace.exists());
        }
    }

    #[test]
    fn test_echoed_failure_output_is_not_repeated() {
        let tmp = TempDir::new().unwrap();
        let go = FakeGo::new()
            .build("echo 'undefined: kengine.Foo'\nexit 2")
            .install(tmp.path());
        let mut config = config(&go.path, tmp.path());
        config.echo = true;

        let err = Builder::new(&config, &CancelToken::new())
            .build(&tmp.path().join("kengine"), tmp.path())
            .unwrap_err();

        assert!(!err.to_string().contains("undefined: kengine.Foo"));
        match err.downcast_ref::<BuildError>() {
            Some(BuildError::Compile { output, streamed, .. }) => {
                assert!(*streamed);
                assert!(output.contains("undefined: kengine.Foo"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_cancelled_build_cleans_up() {
        let tmp = TempDir::new().unwrap();
        let go = FakeGo::new().install(tmp.path());
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = Builder::new(&config(&go.path, tmp.path()), &cancel)
            .build(&tmp.path().join("kengine"), tmp.path())
            .unwrap_err();

        assert!(err
            .downcast_ref::<BuildError>()
            .is_some_and(BuildError::is_cancelled));
        assert!(go.invocations().is_empty());
        let leftovers = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("xkengine_"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_relative_output_resolves_against_cwd() {
        let tmp = TempDir::new().unwrap();
        let go = FakeGo::new().install(tmp.path());
        let cwd = tmp.path().join("project");
        std::fs::create_dir(&cwd).unwrap();

        let report = Builder::new(&config(&go.path, tmp.path()), &CancelToken::new())
            .build(Path::new("bin-kengine"), &cwd)
            .unwrap();

        assert_eq!(report.output, Some(cwd.join("bin-kengine")));
        assert!(cwd.join("bin-kengine").exists());
    }

    #[test]
    fn test_empty_output_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let go = FakeGo::new().install(tmp.path());
        let result = Builder::new(&config(&go.path, tmp.path()), &CancelToken::new())
            .build(Path::new(""), tmp.path());
        assert!(result.is_err());
        assert!(go.invocations().is_empty());
    }
}
