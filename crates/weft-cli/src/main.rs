//! Weft unified CLI.
//!
//! Interactive workflow runner.
//!
//! # Quick Start
//!
//! ```bash
//! # Run the built-in demo workflow
//! weft demo
//!
//! # Check a graph description
//! weft validate flows/onboarding.dot
//!
//! # Print its canonical form
//! weft inspect flows/onboarding.dot
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Weft - workflow state-machine runtime for interactive flows.
#[derive(Parser)]
#[command(name = "weft")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information.
    Version,

    /// Run the built-in interactive demo workflow.
    Demo {
        /// Show debug instructions from the workflow.
        #[arg(long)]
        debug: bool,
    },

    /// Parse and validate a graph description.
    Validate {
        /// Path to the .dot file (falls back to `run.graph` from the
        /// configuration).
        path: Option<String>,
    },

    /// Print the canonical form of a graph description.
    Inspect {
        /// Path to the .dot file (falls back to `run.graph` from the
        /// configuration).
        path: Option<String>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            commands::version::run();
            Ok(())
        }
        Commands::Demo { debug } => commands::demo::run(debug),
        Commands::Validate { path } => commands::validate::run(path.as_deref()),
        Commands::Inspect { path } => commands::inspect::run(path.as_deref()),
    }
}
