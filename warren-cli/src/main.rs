//! Warren: watch Unix signals through the batching signal processor.
//!
//! # Usage
//!
//! ```text
//! warren signals [--json]
//! warren watch [--config <path>] [--hold-for <secs>] [--exit-on <kind>]...
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{signals::SignalsArgs, watch::WatchArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "warren",
    version,
    about = "Batch and dispatch Unix signals",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the signals the processor can subscribe to.
    Signals(SignalsArgs),

    /// Subscribe to signals and print each dispatched batch as a JSON line.
    Watch(WatchArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Signals(args) => args.run(),
        Commands::Watch(args) => args.run(),
    }
}
