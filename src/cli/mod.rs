use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xbe-harness")]
#[command(about = "Integration tests for the xbe command-line client")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run test suites against the CLI
    Run {
        /// Suite files (TOML), run in order
        #[arg(required = true)]
        suites: Vec<PathBuf>,

        /// CLI binary to test (default: XBE_BIN or "xbe")
        #[arg(long)]
        bin: Option<String>,

        /// Show every command line and its output
        #[arg(long, short)]
        verbose: bool,
    },

    /// Validate suite files without running them
    Check {
        #[arg(required = true)]
        suites: Vec<PathBuf>,
    },

    /// Show the resolved configuration
    Env {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub mod check;
pub mod env;
pub mod run;
