//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// surveyd - NASA-TLX survey collection and reporting service
///
/// Collects questionnaire submissions over HTTP, persists each one as a
/// JSON file, and serves the aggregated results back for reporting.
///
/// Examples:
///   surveyd
///   surveyd --port 8080 --data-dir /var/lib/surveyd/results
///   surveyd --export results.csv
///   surveyd --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Address to bind the HTTP server to
    ///
    /// Overrides the [server].host config setting.
    #[arg(long, value_name = "ADDR", env = "SURVEYD_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    ///
    /// Overrides the [server].port config setting.
    #[arg(short, long, value_name = "PORT", env = "SURVEYD_PORT")]
    pub port: Option<u16>,

    /// Directory holding one JSON file per submitted survey response
    #[arg(short, long, value_name = "DIR", env = "SURVEYD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to the question catalog JSON file
    ///
    /// When omitted, the built-in NASA-TLX scales are used.
    #[arg(long, value_name = "FILE")]
    pub questions: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .surveyd.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Export all stored results as CSV to FILE and exit (no server)
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Generate a default .surveyd.toml and exit
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (warnings and errors only)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Parse arguments from the process command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate argument combinations beyond what clap expresses.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("--verbose and --quiet are mutually exclusive".to_string());
        }
        Ok(())
    }

    /// Map verbosity flags to a tracing level.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::WARN
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
