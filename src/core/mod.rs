//! Core data types: plugin descriptors, overrides and build configuration.

pub mod build_config;
pub mod dependency;
pub mod embed;
pub mod errors;
pub mod replace;
pub mod version;
pub mod with_arg;

pub use build_config::{BuildConfig, Compile};
pub use dependency::Dependency;
pub use embed::EmbedDir;
pub use errors::{BuildError, ParseError};
pub use replace::{OverrideSet, Origin, Replace};
pub use version::CoreVersion;
pub use with_arg::WithArg;
