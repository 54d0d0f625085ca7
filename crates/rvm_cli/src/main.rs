//! RVM CLI
//!
//! Command-line tools for RVM store directories.
//!
//! # Commands
//!
//! - `inspect` - List the segments in a store directory
//! - `dump` - Hex dump a range of a segment
//! - `write` - Write bytes into a segment inside a committed transaction
//! - `destroy` - Delete a segment's backing file

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// RVM command-line store tools.
#[derive(Parser)]
#[command(name = "rvm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the segments in a store directory
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Hex dump a range of a segment
    Dump {
        /// Segment name
        segment: String,

        /// Mapped size, at most the backing file length (defaults to it)
        #[arg(short, long)]
        size: Option<usize>,

        /// Start of the range
        #[arg(short, long, default_value = "0")]
        offset: usize,

        /// Length of the range (defaults to the rest of the segment)
        #[arg(short, long)]
        len: Option<usize>,
    },

    /// Write bytes into a segment inside a committed transaction
    Write {
        /// Segment name
        segment: String,

        /// Mapped size (defaults to the backing file length, or just enough
        /// to hold the data)
        #[arg(short, long)]
        size: Option<usize>,

        /// Where to write
        #[arg(short, long, default_value = "0")]
        offset: usize,

        /// The bytes to write, as UTF-8 text
        #[arg(short, long)]
        data: String,
    },

    /// Delete a segment's backing file
    Destroy {
        /// Segment name
        segment: String,
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
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Store path required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Dump {
            segment,
            size,
            offset,
            len,
        } => {
            let path = cli.path.ok_or("Store path required for dump")?;
            commands::dump::run(&path, &segment, size, offset, len)?;
        }
        Commands::Write {
            segment,
            size,
            offset,
            data,
        } => {
            let path = cli.path.ok_or("Store path required for write")?;
            commands::write::run(&path, &segment, size, offset, data.as_bytes())?;
        }
        Commands::Destroy { segment } => {
            let path = cli.path.ok_or("Store path required for destroy")?;
            commands::destroy::run(&path, &segment)?;
        }
        Commands::Version => {
            println!("RVM CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("RVM Core v{}", rvm_core::VERSION);
        }
    }

    Ok(())
}
