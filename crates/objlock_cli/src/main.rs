//! objlock CLI
//!
//! Command-line tools for the objlock lock manager.
//!
//! # Commands
//!
//! - `validate` - Check an isolation map file and list its classes
//! - `stress` - Run a contended lock workload and report exclusion checks
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// objlock command-line tools.
#[derive(Parser)]
#[command(name = "objlock")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an isolation map file and list its classes
    Validate {
        /// Path to the isolation map (JSON)
        file: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run a contended lock workload
    Stress {
        /// Number of worker threads
        #[arg(short, long, default_value = "4")]
        threads: usize,

        /// Total number of operations
        #[arg(short, long, default_value = "10000")]
        operations: usize,

        /// Number of distinct objects
        #[arg(short, long, default_value = "8")]
        keys: usize,

        /// Isolation level of every object
        #[arg(short, long, default_value = "repeatable")]
        level: String,

        /// Share of operations that start with a read lock
        #[arg(long, default_value = "0.5")]
        read_ratio: f64,

        /// Share of granted reads that are upgraded
        #[arg(long, default_value = "0.2")]
        upgrade_ratio: f64,

        /// Lock timeout in milliseconds
        #[arg(long, default_value = "60000")]
        timeout_ms: u64,

        /// Seed for the workload generators
        #[arg(long, default_value = "24301")]
        seed: u64,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Validate { file, format } => {
            commands::validate::run(&file, &format)?;
        }
        Commands::Stress {
            threads,
            operations,
            keys,
            level,
            read_ratio,
            upgrade_ratio,
            timeout_ms,
            seed,
        } => {
            let options = commands::stress::StressOptions {
                threads,
                operations,
                keys,
                level,
                read_ratio,
                upgrade_ratio,
                timeout_ms,
                seed,
            };
            commands::stress::run(&options)?;
        }
        Commands::Version => {
            println!("objlock CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("objlock core v{}", objlock_core::VERSION);
        }
    }

    Ok(())
}
