//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - serve: run the HTTP service
//! - submit: create a task on a running server and wait for it
//! - status: query one task
//! - extract: run the channel extractor over a saved event log

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// cvagent - CV extraction tasks over a hosted generative workflow
#[derive(Parser, Debug)]
#[command(name = "cvagent")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service
    Serve {
        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Submit a CV and report to a running server and wait for the result
    Submit {
        /// URL of the CV document
        #[arg(long)]
        cv_url: String,

        /// URL of the report document
        #[arg(long)]
        report_url: String,

        /// Server base URL
        #[arg(short, long, default_value = "http://localhost:8000")]
        server: String,

        /// Seconds between status polls
        #[arg(long, default_value_t = 60)]
        poll_interval: u64,

        /// Seconds to wait before giving up
        #[arg(long, default_value_t = 600)]
        max_wait: u64,

        /// Write the final record to this file as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Get status of a task
    Status {
        /// Task ID to check
        id: String,

        /// Server base URL
        #[arg(short, long, default_value = "http://localhost:8000")]
        server: String,
    },

    /// Extract a channel from a saved line-delimited event log
    Extract {
        /// Event log file
        file: PathBuf,

        /// Channel label (defaults to the configured target label)
        #[arg(short, long)]
        label: Option<String>,
    },
}
