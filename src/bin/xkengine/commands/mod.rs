//! Command implementations

pub mod build;
pub mod run;
pub mod version;

use anyhow::Result;

use xkengine::core::BuildConfig;
use xkengine::util::context::find_go;
use xkengine::util::{Config, GlobalContext};

/// Load the layered configuration and locate the toolchain.
fn load_build_config(ctx: &GlobalContext) -> Result<(Config, BuildConfig)> {
    let config = ctx.load_config();
    let go = find_go(&config)?;
    let build = BuildConfig::from_config(&config, go)?;
    Ok((config, build))
}
