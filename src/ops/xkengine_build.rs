//! Implementation of `xkengine build`.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::{BuildReport, Builder};
use crate::core::build_config::BuildConfig;
use crate::ops::artifact::{default_output_path, smoke_test, Capabilities};
use crate::util::cancel::CancelToken;

/// Options for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Where to write the binary (defaults to `./kengine`)
    pub output: Option<PathBuf>,

    /// Capabilities to grant the binary
    pub capabilities: Capabilities,
}

/// Build a binary, then verify it runs when it targets this host.
///
/// A relative output path is taken relative to `cwd`.
pub fn build(
    config: &BuildConfig,
    cwd: &Path,
    opts: &BuildOptions,
    cancel: &CancelToken,
) -> Result<BuildReport> {
    let output = opts
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&config.compile.platform));

    let report = Builder::new(config, cancel).build(&output, cwd)?;

    if let Some(binary) = &report.output {
        opts.capabilities.apply(binary, cancel)?;
        smoke_test(binary, &config.compile.platform, cancel)?;
    }
    Ok(report)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::errors::BuildError;
    use crate::test_support::FakeGo;
    use tempfile::TempDir;

    fn config(go: &std::path::Path, root: &std::path::Path) -> BuildConfig {
        let mut config = BuildConfig::new(go).with_work_root(root);
        config.echo = false;
        config
    }

    #[test]
    fn test_build_verifies_binary() {
        let tmp = TempDir::new().unwrap();
        let go = FakeGo::new().install(tmp.path());
        let output = tmp.path().join("kengine");
        let opts = BuildOptions {
            output: Some(output.clone()),
            ..Default::default()
        };

        let config = config(&go.path, tmp.path());
        let report = build(&config, tmp.path(), &opts, &CancelToken::new()).unwrap();
        assert_eq!(report.output, Some(output.clone()));
        assert!(output.exists());
    }

    #[test]
    fn test_default_output_lands_in_cwd() {
        let tmp = TempDir::new().unwrap();
        let go = FakeGo::new().install(tmp.path());
        let cwd = tmp.path().join("site");
        std::fs::create_dir(&cwd).unwrap();

        let report = build(
            &config(&go.path, tmp.path()),
            &cwd,
            &BuildOptions::default(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(report.output, Some(cwd.join("kengine")));
        assert!(cwd.join("kengine").exists());
    }

    #[test]
    fn test_broken_binary_fails_verification() {
        let tmp = TempDir::new().unwrap();
        let go = FakeGo::new()
            .build(
                "while [ $# -gt 0 ]; do if [ \"$1\" = \"-o\" ]; then out=\"$2\"; fi; shift; done\n\
                 printf '#!/bin/sh\\nexit 1\\n' > \"$out\"\n\
                 chmod +x \"$out\"",
            )
            .install(tmp.path());
        let opts = BuildOptions {
            output: Some(tmp.path().join("kengine")),
            ..Default::default()
        };

        let config = config(&go.path, tmp.path());
        let err = build(&config, tmp.path(), &opts, &CancelToken::new()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::Run { .. })
        ));
    }
}
