//! Synthesis of the temporary build workspace.
//!
//! The workspace is a throwaway Go module whose `go.mod` requires the core
//! program and every plugin, with override directives applied, and whose
//! `main.go` imports each plugin for its registration side effects. It is
//! owned by a guard that removes it on every exit path unless cleanup was
//! suppressed.

pub mod entry;
pub mod manifest;
pub mod module;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::build_config::BuildConfig;
use crate::core::dependency::Dependency;
use crate::core::errors::BuildError;
use crate::core::replace::OverrideSet;
use crate::core::version::{core_module_path, versioned_module_path};
use crate::util::fs::{copy_dir_all, write_string};

pub use module::{DevModule, DevelopmentContext};

/// File name of the synthesized manifest.
pub const MANIFEST_FILE: &str = "go.mod";

/// File name of the synthesized entry point.
pub const ENTRY_FILE: &str = "main.go";

/// File name of the embedded file system module.
pub const EMBED_FILE: &str = "embed.go";

/// Everything the workspace will contain, computed without side effects.
#[derive(Debug, Clone)]
pub struct WorkspacePlan {
    /// Core module path after major version adjustment
    pub core_module: String,

    /// Plugins in import order, the package under development first
    pub plugins: Vec<Dependency>,

    /// Inherited overrides merged with explicit ones
    pub overrides: OverrideSet,

    /// Contents of `go.mod`
    pub manifest: String,

    /// Contents of `main.go`
    pub entry: String,

    /// Contents of `embed.go`, when directories are embedded
    pub embed: Option<String>,
}

/// Builds a workspace from a configuration.
pub struct Synthesizer<'a> {
    config: &'a BuildConfig,
    development: Option<&'a DevelopmentContext>,
}

impl<'a> Synthesizer<'a> {
    pub fn new(config: &'a BuildConfig) -> Self {
        Synthesizer {
            config,
            development: None,
        }
    }

    /// Include the package under development and inherit its overrides.
    pub fn with_development(mut self, development: Option<&'a DevelopmentContext>) -> Self {
        self.development = development;
        self
    }

    /// Compute the workspace contents.
    pub fn plan(&self) -> Result<WorkspacePlan, BuildError> {
        let config = self.config;
        let core_module = core_module_path(&config.core_module, &config.core_version)?;

        let mut plugins: Vec<Dependency> = Vec::new();
        let mut overrides = OverrideSet::new();
        if let Some(dev) = self.development {
            plugins.push(dev.plugin());
            overrides.merge_inherited(dev.module.replacements.iter().cloned());
        }
        for plugin in &config.plugins {
            if plugins.iter().any(|p| p.package_path() == plugin.package_path()) {
                tracing::debug!("{} is already included", plugin.package_path());
                continue;
            }
            plugins.push(plugin.clone());
        }
        overrides.merge(&config.overrides);

        // Clean up module paths that disagree with their major version
        let plugins = plugins
            .into_iter()
            .map(|p| {
                let path = versioned_module_path(p.package_path(), p.version().unwrap_or(""))?;
                Ok(p.with_package_path(path))
            })
            .collect::<Result<Vec<_>, BuildError>>()?;

        let reqs = manifest::requirements(
            &core_module,
            config.core_version.query(),
            &plugins,
            &overrides,
        );
        let manifest = manifest::render_manifest(&reqs, &overrides);
        let entry = entry::render_main(&core_module, config.standard_modules, &plugins);
        let embed = if config.embed_dirs.is_empty() {
            None
        } else {
            Some(entry::render_embed(&core_module))
        };

        Ok(WorkspacePlan {
            core_module,
            plugins,
            overrides,
            manifest,
            entry,
            embed,
        })
    }

    /// Create the workspace directory and write its files.
    ///
    /// On failure the partially written workspace is released like any
    /// other.
    pub fn synthesize(&self) -> Result<SynthesizedWorkspace> {
        let plan = self.plan()?;

        let root = self
            .config
            .work_root
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let dir = tempfile::Builder::new()
            .prefix("xkengine_")
            .tempdir_in(&root)
            .with_context(|| format!("failed to create temporary folder in {}", root.display()))?;
        let workspace = SynthesizedWorkspace::new(dir, self.config.skip_cleanup);
        tracing::info!("Temporary folder: {}", workspace.path().display());

        let manifest_path = workspace.path().join(MANIFEST_FILE);
        tracing::info!("Writing manifest: {}", manifest_path.display());
        tracing::debug!("{}", plan.manifest);
        write_string(&manifest_path, &plan.manifest)?;

        let entry_path = workspace.path().join(ENTRY_FILE);
        tracing::info!("Writing main module: {}", entry_path.display());
        tracing::debug!("{}", plan.entry);
        write_string(&entry_path, &plan.entry)?;

        if let Some(embed) = &plan.embed {
            let files = workspace.path().join(entry::EMBED_DIR);
            for embed_dir in &self.config.embed_dirs {
                let target = files.join(&embed_dir.alias);
                tracing::info!(
                    "Embedding {} into {}",
                    embed_dir.dir.display(),
                    target.display()
                );
                copy_dir_all(&embed_dir.dir, &target)?;
            }
            let embed_path = workspace.path().join(EMBED_FILE);
            tracing::info!("Writing 'embedded' file to: {}", embed_path.display());
            write_string(&embed_path, embed)?;
        }

        Ok(workspace)
    }
}

/// A temporary workspace, removed when released unless cleanup is suppressed.
#[derive(Debug)]
pub struct SynthesizedWorkspace {
    dir: Option<TempDir>,
    path: PathBuf,
    skip_cleanup: bool,
}

impl SynthesizedWorkspace {
    fn new(dir: TempDir, skip_cleanup: bool) -> Self {
        SynthesizedWorkspace {
            path: dir.path().to_path_buf(),
            dir: Some(dir),
            skip_cleanup,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the workspace, returning its path if it was kept.
    pub fn close(mut self) -> Option<PathBuf> {
        self.release()
    }

    fn release(&mut self) -> Option<PathBuf> {
        let dir = self.dir.take()?;
        if self.skip_cleanup {
            let kept = dir.keep();
            tracing::info!(
                "Skipping cleanup as requested; leaving folder intact: {}",
                kept.display()
            );
            return Some(kept);
        }

        tracing::info!("Cleaning up temporary folder: {}", self.path.display());
        if let Err(source) = dir.close() {
            let err = BuildError::Lifecycle {
                path: self.path.clone(),
                source,
            };
            tracing::warn!("{}", err);
        }
        None
    }
}

impl Drop for SynthesizedWorkspace {
    fn drop(&mut self) {
        self.release();
    }
}
