//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use output::OutputFormat;

use commands::release::ReleaseArgs;

pub mod commands;
pub mod output;

/// relsync - Create or update a release and sync its assets
#[derive(Parser, Debug)]
#[command(name = "relsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (human, json)
    #[arg(long, short = 'O', global = true, value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Machine-readable JSON output (shorthand for --output-format=json)
    #[arg(long, short = 'm', global = true)]
    pub machine: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: $RELSYNC_CONFIG, then ./relsync.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Effective output format. `--machine` wins over `--output-format`.
    #[must_use]
    pub fn output_format(&self) -> OutputFormat {
        if self.machine {
            OutputFormat::Json
        } else {
            self.output_format.unwrap_or_default()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or update the release for a tag, then upload its files
    Release(ReleaseArgs),

    /// Resolve settings and file patterns without contacting the provider
    Check(ReleaseArgs),
}

impl Commands {
    /// Release settings given on the command line.
    #[must_use]
    pub const fn release_args(&self) -> &ReleaseArgs {
        match self {
            Self::Release(args) | Self::Check(args) => args,
        }
    }
}
