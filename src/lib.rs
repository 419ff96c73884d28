//! xkengine - Custom Kengine builds on demand
//!
//! This crate provides the library functionality behind the `xkengine`
//! CLI: composing the Kengine core with plugins in a temporary Go
//! workspace, compiling it, and running the result.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;
pub mod workspace;

/// Fake toolchains for unit tests.
#[cfg(all(test, unix))]
pub mod test_support;

pub use crate::core::{BuildConfig, BuildError, Dependency, OverrideSet, ParseError, Replace, WithArg};

pub use builder::{BuildReport, Builder};
pub use util::context::GlobalContext;
pub use workspace::{DevelopmentContext, Synthesizer};
