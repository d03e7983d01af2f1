//! FIDC CLI Library
//!
//! Command-line client for tracking and reprocessing file imports of a FIDC
//! (receivables investment fund) platform.
//!
//! # Overview
//!
//! - **Submission**: Fingerprint and upload a remittance file (`fidc imports submit`)
//! - **Listing**: Page through imports, polling while any is running (`fidc imports list`)
//! - **Detail**: One import with its event timeline (`fidc imports show`)
//! - **Reprocess**: Ask the service for a new attempt (`fidc imports reprocess`)
//! - **Configuration**: Manage CLI settings (`fidc config`)
//!
//! The import service owns all job state. Everything here holds snapshots
//! and issues one-shot commands through [`api::ImportRepository`].

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod commands;
pub mod config;
pub mod detail;
pub mod error;
pub mod fingerprint;
pub mod poller;
pub mod progress;
pub mod reprocess;
pub mod submission;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use error::{CliError, Result};

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// FIDC - import tracking for receivables funds
#[derive(Parser, Debug)]
#[command(name = "fidc")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Import service URL (overrides the config file)
    #[arg(long, env = "FIDC_SERVER_URL", global = true)]
    pub server_url: Option<String>,
}

/// How results are printed
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit, inspect and reprocess imports
    Imports {
        #[command(subcommand)]
        command: ImportsCommand,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Import subcommands
#[derive(Subcommand, Debug)]
pub enum ImportsCommand {
    /// Upload a file for import
    Submit {
        /// File to upload
        file: PathBuf,

        /// Target fund identifier
        #[arg(long)]
        fidc_id: Option<String>,

        /// Source format (e.g. Cnab, Xml, Zip, Excel)
        #[arg(long)]
        origem: Option<String>,

        /// Bank layout
        #[arg(long)]
        tipo_banco: Option<String>,

        /// CNAB layout (e.g. 240, 444)
        #[arg(long)]
        tipo_cnab: Option<String>,

        /// Modality of the receivables
        #[arg(long)]
        modalidade: Option<String>,

        /// Assignor identifier
        #[arg(long)]
        cedente_id: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// List imports, newest first
    List {
        /// Page number
        #[arg(short, long, default_value = "1")]
        page: u32,

        /// Imports per page (defaults to the configured page size)
        #[arg(long)]
        page_size: Option<u32>,

        /// Keep refreshing while any listed import is still running
        #[arg(short, long)]
        watch: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Show one import and its events
    Show {
        /// Import id
        id: String,

        /// Check a local file against the recorded fingerprint
        #[arg(long)]
        verify: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Request a new processing attempt
    Reprocess {
        /// Import id
        id: String,

        /// Send the request even if the import has not finished
        #[arg(long)]
        force: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Get configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Set configuration value
    Set {
        /// Configuration key
        key: String,

        /// Configuration value
        value: String,
    },

    /// Show all configuration
    Show,
}
