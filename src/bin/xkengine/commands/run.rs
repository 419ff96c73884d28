//! Pass-through command: build the current package and run it

use anyhow::Result;

use xkengine::ops::{self, Capabilities, RunOptions};
use xkengine::util::{CancelToken, GlobalContext};

/// Returns the exit code of the binary.
pub fn execute(args: Vec<String>, cancel: &CancelToken) -> Result<i32> {
    let ctx = GlobalContext::new()?;
    let (config, build) = super::load_build_config(&ctx)?;

    let opts = RunOptions {
        args,
        capabilities: Capabilities::from_config(&config),
    };
    ops::run(&build, ctx.cwd(), &opts, cancel)
}
