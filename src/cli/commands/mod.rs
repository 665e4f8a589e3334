//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build;
pub mod cache;
pub mod catalog;
pub mod doctor;
pub mod validate;

use anyhow::Result;
use clap::Subcommand;

use crate::cli::output::OutputOptions;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a bundle from a plan file
    Build {
        /// Path to the bundle plan (TOML with [[extension]] entries)
        plan: String,

        /// Copy the finished artifact to this path
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Validate a bundle plan without building
    Validate {
        /// Path to the bundle plan
        plan: String,
    },

    /// Manage the extension catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },

    /// Manage the artifact cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Check external build tools
    Doctor,
}

/// Catalog subcommands
#[derive(Subcommand, Debug)]
pub enum CatalogCommands {
    /// Refresh the catalog from the upstream API
    Update,

    /// List catalog entries
    List,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show cache information
    Info,

    /// Clear cached artifacts
    Clean,
}

impl Commands {
    /// Execute the command
    pub async fn run(self, options: OutputOptions) -> Result<()> {
        match self {
            Self::Build { plan, output } => build::execute(&plan, output.as_deref(), options).await,
            Self::Validate { plan } => validate::execute(&plan, options).await,
            Self::Catalog { command } => match command {
                CatalogCommands::Update => catalog::execute_update().await,
                CatalogCommands::List => catalog::execute_list(options).await,
            },
            Self::Cache { command } => match command {
                CacheCommands::Info => cache::execute_info().await,
                CacheCommands::Clean => cache::execute_clean().await,
            },
            Self::Doctor => doctor::execute().await,
        }
    }
}
