//! fleetsnap - lifecycle and snapshot management for a fleet of cloud
//! compute instances.
//!
//! One-shot batch tool: every invocation queries the provider fresh,
//! performs its work sequentially, and exits. Status lines go to stdout;
//! diagnostics go to stderr.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod error;
mod orchestrate;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics on stderr so stdout stays script-parsable
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Run the command
    if let Err(e) = cli.run().await {
        // Print error in a user-friendly way
        error::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}
