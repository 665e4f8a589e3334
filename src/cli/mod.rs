//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no orchestration logic - that belongs in the
//! [`crate::core`] module.

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::Parser;

use commands::Commands;
use output::OutputOptions;

/// Bundleforge - build service for custom software bundles
///
/// Assemble versioned bundles from extension sets, with per-configuration
/// build deduplication and artifact caching.
#[derive(Parser, Debug)]
#[command(name = "bundleforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        let options = OutputOptions {
            quiet: self.quiet,
            json: self.json,
        };
        if let Some(cmd) = self.command {
            cmd.run(options).await
        } else {
            // No subcommand provided, show help
            use clap::CommandFactory;
            let mut cmd = Self::command();
            cmd.print_help()?;
            Ok(())
        }
    }
}
