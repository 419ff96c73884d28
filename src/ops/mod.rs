//! High-level operations.
//!
//! This module contains the implementation of xkengine commands.

pub mod artifact;
pub mod xkengine_build;
pub mod xkengine_run;

pub use artifact::{Artifact, Capabilities};
pub use xkengine_build::{build, BuildOptions};
pub use xkengine_run::{run, RunOptions};
