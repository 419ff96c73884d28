//! xkengine CLI - Custom Kengine builds on demand

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use xkengine::util::CancelToken;

/// Environment variable holding a log filter directive.
const LOG_ENV: &str = "XKENGINE_LOG";

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging; stdout belongs to the built binary
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("xkengine=debug")
        } else {
            EnvFilter::new("xkengine=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    // Execute command
    match cli.command {
        Some(Commands::Version) => {
            commands::version::execute();
            Ok(0)
        }
        Some(Commands::Build(args)) => {
            let cancel = CancelToken::install_ctrlc()?;
            commands::build::execute(args, &cancel)?;
            Ok(0)
        }
        Some(Commands::Run(args)) => {
            let cancel = CancelToken::install_ctrlc()?;
            commands::run::execute(args, &cancel)
        }
        None => {
            let cancel = CancelToken::install_ctrlc()?;
            commands::run::execute(Vec::new(), &cancel)
        }
    }
}
