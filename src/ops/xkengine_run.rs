//! Implementation of the pass-through command: build the package in the
//! current directory into the core, run it, then remove it.

use std::path::Path;

use anyhow::Result;

use crate::builder::Builder;
use crate::core::build_config::BuildConfig;
use crate::ops::artifact::{temporary_output_path, Artifact, Capabilities};
use crate::util::cancel::CancelToken;
use crate::workspace::module::discover;
use crate::workspace::DevelopmentContext;

/// Options for the pass-through command.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Arguments forwarded verbatim to the binary
    pub args: Vec<String>,

    /// Capabilities to grant the binary before running it
    pub capabilities: Capabilities,
}

/// Build and run, returning the binary's exit code.
///
/// Returns 0 without running anything when the build was skipped.
pub fn run(config: &BuildConfig, cwd: &Path, opts: &RunOptions, cancel: &CancelToken) -> Result<i32> {
    let module = discover(&config.go, cwd, cancel)?;
    let development = DevelopmentContext::new(module, cwd)?;
    tracing::info!(
        "Building with {} from {}",
        development.import_path,
        development.module.dir.display()
    );

    let output = temporary_output_path(&config.compile.platform);
    let report = Builder::new(config, cancel)
        .with_development(Some(&development))
        .build(&output, cwd)?;

    let Some(binary) = report.output else {
        tracing::info!("Nothing to run");
        return Ok(0);
    };
    let artifact = Artifact::new(binary, config.skip_cleanup);
    opts.capabilities.apply(artifact.path(), cancel)?;

    let code = artifact.run(&opts.args, cancel)?;
    artifact.finish()?;
    Ok(code)
}
