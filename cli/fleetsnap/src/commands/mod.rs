//! CLI commands.

mod configure;
mod instances;
mod snapshots;
mod volumes;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fleet_provider::{HttpProvider, Session};

use crate::output::OutputFormat;

/// fleetsnap - manage a fleet of cloud instances and snapshot their volumes.
#[derive(Debug, Parser)]
#[command(name = "fleetsnap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Credential profile to use.
    #[arg(long, global = true, env = "FLEET_PROFILE")]
    profile: Option<String>,

    /// Output format for listing commands (plain, table, or json).
    #[arg(long, global = true, default_value = "plain")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Save a credential profile.
    Configure(configure::ConfigureCommand),

    /// Manage instances.
    Instances(instances::InstancesCommand),

    /// Commands for volumes.
    Volumes(volumes::VolumesCommand),

    /// Commands for snapshots.
    Snapshots(snapshots::SnapshotsCommand),

    /// Show CLI version.
    Version,
}

impl Cli {
    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let format = match self.format.as_str() {
            "table" => OutputFormat::Table,
            "json" => OutputFormat::Json,
            _ => OutputFormat::Plain,
        };

        let ctx = CommandContext {
            profile: self.profile,
            format,
        };

        match self.command {
            Commands::Configure(cmd) => cmd.run(ctx).await,
            Commands::Instances(cmd) => cmd.run(ctx).await,
            Commands::Volumes(cmd) => cmd.run(ctx).await,
            Commands::Snapshots(cmd) => cmd.run(ctx).await,
            Commands::Version => {
                println!("fleetsnap {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub profile: Option<String>,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Build a provider client for the selected profile. Makes no provider
    /// calls of its own.
    pub fn provider(&self) -> Result<HttpProvider> {
        let session = Session::from_profile(self.profile.as_deref())?;
        session.provider()
    }
}
