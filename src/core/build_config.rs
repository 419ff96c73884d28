//! The immutable description of one build.
//!
//! A BuildConfig is assembled once per invocation from configuration
//! files and environment, then command-line flags, and is only read
//! afterwards.

use std::path::PathBuf;

use crate::core::dependency::Dependency;
use crate::core::embed::EmbedDir;
use crate::core::errors::ParseError;
use crate::core::replace::{OverrideSet, Origin, Replace};
use crate::core::version::{CoreVersion, DEFAULT_CORE_MODULE};
use crate::util::config::Config;
use crate::util::platform::Platform;

/// Compiler target settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compile {
    /// Target platform
    pub platform: Platform,

    /// Whether cgo is enabled
    pub cgo: bool,
}

impl Compile {
    /// Value for `CGO_ENABLED`.
    pub fn cgo_enabled(&self) -> &'static str {
        if self.cgo {
            "1"
        } else {
            "0"
        }
    }
}

impl Default for Compile {
    fn default() -> Self {
        Compile {
            platform: Platform::host(),
            cgo: false,
        }
    }
}

/// Everything needed to synthesize and compile one workspace.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Module path of the core program, before major version adjustment
    pub core_module: String,

    /// Core version to build
    pub core_version: CoreVersion,

    /// Import the core's standard module set
    pub standard_modules: bool,

    /// Plugins to compile in, in declaration order
    pub plugins: Vec<Dependency>,

    /// Explicitly requested overrides
    pub overrides: OverrideSet,

    /// Target and cgo settings
    pub compile: Compile,

    /// Instrument with the race detector
    pub race_detector: bool,

    /// Keep debug symbols and disable optimizations
    pub debug: bool,

    /// Extra `go build` flags
    pub build_flags: Vec<String>,

    /// Extra `go mod` flags
    pub mod_flags: Vec<String>,

    /// Directories to embed
    pub embed_dirs: Vec<EmbedDir>,

    /// Stop after dependency resolution
    pub skip_build: bool,

    /// Leave the workspace (and in run mode the artifact) behind
    pub skip_cleanup: bool,

    /// The `go` binary
    pub go: PathBuf,

    /// Parent directory for temporary workspaces (system temp dir if unset)
    pub work_root: Option<PathBuf>,

    /// Forward toolchain output to stderr while it runs
    pub echo: bool,
}

impl BuildConfig {
    /// Create a configuration with defaults for everything but the toolchain.
    pub fn new(go: impl Into<PathBuf>) -> Self {
        BuildConfig {
            core_module: DEFAULT_CORE_MODULE.to_string(),
            core_version: CoreVersion::Latest,
            standard_modules: true,
            plugins: Vec::new(),
            overrides: OverrideSet::new(),
            compile: Compile::default(),
            race_detector: false,
            debug: false,
            build_flags: Vec::new(),
            mod_flags: Vec::new(),
            embed_dirs: Vec::new(),
            skip_build: false,
            skip_cleanup: false,
            go: go.into(),
            work_root: None,
            echo: true,
        }
    }

    /// Apply layered file and environment settings.
    pub fn from_config(config: &Config, go: impl Into<PathBuf>) -> Result<Self, ParseError> {
        let mut build = BuildConfig::new(go);
        let host = Platform::host();

        if let Some(module) = &config.core.module {
            build.core_module = module.trim_end_matches('/').to_string();
        }
        if let Some(version) = &config.core.version {
            build.core_version = CoreVersion::parse(version);
        }
        build.standard_modules = config.core.standard_modules.unwrap_or(true);

        build.compile = Compile {
            platform: Platform {
                os: config.build.os.clone().unwrap_or(host.os),
                arch: config.build.arch.clone().unwrap_or(host.arch),
                arm: config.build.arm.clone(),
            },
            cgo: config.build.cgo.unwrap_or(false),
        };
        build.race_detector = config.build.race_detector.unwrap_or(false);
        build.debug = config.build.debug.unwrap_or(false);
        if let Some(flags) = &config.build.build_flags {
            build.build_flags = split_flags("build flags", flags)?;
        }
        if let Some(flags) = &config.build.mod_flags {
            build.mod_flags = split_flags("module flags", flags)?;
        }
        build.skip_build = config.build.skip_build.unwrap_or(false);
        build.skip_cleanup = config.build.skip_cleanup.unwrap_or(false) || build.skip_build;

        Ok(build)
    }

    /// Add a plugin.
    pub fn with_plugin(mut self, plugin: Dependency) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Add an explicitly requested override.
    pub fn with_override(mut self, replace: Replace) -> Self {
        self.overrides.insert(replace, Origin::Explicit);
        self
    }

    /// Add a directory to embed.
    pub fn with_embed(mut self, embed: EmbedDir) -> Self {
        self.embed_dirs.push(embed);
        self
    }

    /// Select the core version.
    pub fn with_core_version(mut self, version: CoreVersion) -> Self {
        self.core_version = version;
        self
    }

    /// Set the parent directory for temporary workspaces.
    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = Some(root.into());
        self
    }
}

/// Split a shell-quoted flag string into arguments.
pub fn split_flags(name: &'static str, value: &str) -> Result<Vec<String>, ParseError> {
    if value.trim().is_empty() {
        return Ok(Vec::new());
    }
    shlex::split(value).ok_or_else(|| ParseError::InvalidFlags {
        name,
        value: value.to_string(),
    })
}
