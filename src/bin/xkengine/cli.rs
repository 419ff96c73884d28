//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use xkengine::core::{EmbedDir, WithArg};

/// xkengine - Custom Kengine builds on demand
///
/// Any unrecognized command builds the Go package in the current directory
/// into Kengine and runs the result with the given arguments.
#[derive(Parser)]
#[command(name = "xkengine")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a custom Kengine binary
    Build(BuildArgs),

    /// Print the xkengine version
    Version,

    /// Build the current package into Kengine and run it
    #[command(external_subcommand)]
    Run(Vec<String>),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Kengine version: a tag, branch or commit (default: latest)
    pub core_version: Option<String>,

    /// Output file (default: ./kengine)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Plugin to include, optionally pinned and replaced
    #[arg(long = "with", value_name = "MODULE[@VERSION][=REPLACEMENT]")]
    pub with: Vec<WithArg>,

    /// Dependency replacement without adding a plugin
    #[arg(
        long,
        value_name = "MODULE[@VERSION]=REPLACEMENT",
        value_parser = WithArg::parse_replace
    )]
    pub replace: Vec<WithArg>,

    /// Directory to embed into the binary's file system
    #[arg(long, value_name = "[ALIAS:]DIR")]
    pub embed: Vec<EmbedDir>,
}
