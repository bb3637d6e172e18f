//! cmtpack CLI
//!
//! Converts table exports into CMT data packages.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// cmtpack - Table exports to CMT import packages
#[derive(Parser)]
#[command(name = "cmtpack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project directory or cmtpack.yaml path
    #[arg(short, long, default_value = ".", global = true)]
    config: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new cmtpack project
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Project name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Generate the data document and import package
    Convert {
        /// Write the data document only
        #[arg(long)]
        no_zip: bool,
    },

    /// Check configuration, schema and tables without writing output
    Validate,

    /// List loaded tables and how each is processed
    Tables,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init { path, name } => {
            commands::init::run(&path, name.as_deref())?;
        }
        Commands::Convert { no_zip } => {
            commands::convert::run(&cli.config, !no_zip)?;
        }
        Commands::Validate => {
            commands::validate::run(&cli.config)?;
        }
        Commands::Tables => {
            commands::tables::run(&cli.config)?;
        }
    }

    Ok(())
}
