//! `xkengine build` command

use anyhow::Result;

use crate::cli::BuildArgs;
use xkengine::core::CoreVersion;
use xkengine::ops::{self, BuildOptions, Capabilities};
use xkengine::util::{CancelToken, GlobalContext};

pub fn execute(args: BuildArgs, cancel: &CancelToken) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let (config, mut build) = super::load_build_config(&ctx)?;

    // CLI overrides config
    if let Some(version) = &args.core_version {
        build = build.with_core_version(CoreVersion::parse(version));
    }
    for with in &args.with {
        build = build.with_plugin(with.dependency());
        if let Some(replace) = with.replace(ctx.cwd()) {
            build = build.with_override(replace);
        }
    }
    for replace in args.replace.iter().filter_map(|r| r.replace(ctx.cwd())) {
        build = build.with_override(replace);
    }
    for embed in args.embed {
        build = build.with_embed(embed);
    }

    let opts = BuildOptions {
        output: args.output,
        capabilities: Capabilities::from_config(&config),
    };
    let report = ops::build(&build, ctx.cwd(), &opts, cancel)?;

    if let Some(output) = &report.output {
        eprintln!("     Built {}", output.display());
    }
    Ok(())
}
