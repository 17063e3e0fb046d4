//! Snapshot commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use fleet_provider::{ComputeProvider, SnapshotState};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_output, PlainRow};

use super::CommandContext;

/// Snapshot commands.
#[derive(Debug, Args)]
pub struct SnapshotsCommand {
    #[command(subcommand)]
    command: SnapshotsSubcommand,
}

#[derive(Debug, Subcommand)]
enum SnapshotsSubcommand {
    /// List snapshots.
    List(ListSnapshotsArgs),
}

#[derive(Debug, Args)]
struct ListSnapshotsArgs {
    /// Only snapshots for this project (tag Project:<name>).
    #[arg(long)]
    project: Option<String>,

    /// List all snapshots for each volume, not just the most recent.
    #[arg(long)]
    all: bool,
}

impl SnapshotsCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            SnapshotsSubcommand::List(args) => list_snapshots(ctx, args).await,
        }
    }
}

/// One snapshot listing row.
#[derive(Debug, Clone, Serialize, Tabled)]
struct SnapshotRow {
    #[tabled(rename = "ID")]
    id: String,

    #[tabled(rename = "Volume")]
    volume: String,

    #[tabled(rename = "Instance")]
    instance: String,

    #[tabled(rename = "State")]
    state: String,

    #[tabled(rename = "Progress")]
    progress: String,

    #[tabled(rename = "Started")]
    started: String,
}

impl PlainRow for SnapshotRow {
    fn fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.volume.clone(),
            self.instance.clone(),
            self.state.clone(),
            self.progress.clone(),
            self.started.clone(),
        ]
    }
}

/// List snapshots.
async fn list_snapshots(ctx: CommandContext, args: ListSnapshotsArgs) -> Result<()> {
    let provider = ctx.provider()?;

    let rows = collect_snapshot_rows(&provider, args.project.as_deref(), args.all).await?;
    print_output(&rows, ctx.format);
    Ok(())
}

async fn collect_snapshot_rows(
    provider: &dyn ComputeProvider,
    project: Option<&str>,
    list_all: bool,
) -> Result<Vec<SnapshotRow>> {
    let mut rows = Vec::new();
    for instance in provider.list_instances(project).await? {
        for volume in provider.list_volumes(&instance.id).await? {
            for snapshot in provider.list_snapshots(&volume.id).await? {
                rows.push(SnapshotRow {
                    id: snapshot.id.clone(),
                    volume: volume.id.clone(),
                    instance: instance.id.clone(),
                    state: snapshot.state.to_string(),
                    progress: snapshot.progress.clone(),
                    started: snapshot.start_time.format("%c").to_string(),
                });

                // Snapshots arrive newest first; past the most recent
                // completed one there is nothing current to show.
                if snapshot.state == SnapshotState::Completed && !list_all {
                    break;
                }
            }
        }
    }
    Ok(rows)
}
