//! Volume commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use fleet_provider::{ComputeProvider, Volume};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_output, PlainRow};

use super::CommandContext;

/// Volume commands.
#[derive(Debug, Args)]
pub struct VolumesCommand {
    #[command(subcommand)]
    command: VolumesSubcommand,
}

#[derive(Debug, Subcommand)]
enum VolumesSubcommand {
    /// List volumes.
    List(ListVolumesArgs),
}

#[derive(Debug, Args)]
struct ListVolumesArgs {
    /// Only volumes for this project (tag Project:<name>).
    #[arg(long)]
    project: Option<String>,

    /// List volumes for a single instance by id.
    #[arg(long)]
    instance: Option<String>,
}

impl VolumesCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            VolumesSubcommand::List(args) => list_volumes(ctx, args).await,
        }
    }
}

/// One volume row in the fleet-wide listing.
#[derive(Debug, Clone, Serialize, Tabled)]
struct VolumeRow {
    #[tabled(rename = "ID")]
    id: String,

    #[tabled(rename = "Instance")]
    instance: String,

    #[tabled(rename = "State")]
    state: String,

    #[tabled(rename = "Size")]
    size: String,

    #[tabled(rename = "Encryption")]
    encryption: String,
}

impl PlainRow for VolumeRow {
    fn fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.instance.clone(),
            self.state.clone(),
            self.size.clone(),
            self.encryption.clone(),
        ]
    }
}

/// One volume row in the single-instance listing (no instance column).
#[derive(Debug, Clone, Serialize, Tabled)]
struct InstanceVolumeRow {
    #[tabled(rename = "ID")]
    id: String,

    #[tabled(rename = "State")]
    state: String,

    #[tabled(rename = "Size")]
    size: String,

    #[tabled(rename = "Encryption")]
    encryption: String,
}

impl From<&Volume> for InstanceVolumeRow {
    fn from(volume: &Volume) -> Self {
        Self {
            id: volume.id.clone(),
            state: volume.state.to_string(),
            size: volume.size_label(),
            encryption: volume.encryption_label().to_string(),
        }
    }
}

impl PlainRow for InstanceVolumeRow {
    fn fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.state.clone(),
            self.size.clone(),
            self.encryption.clone(),
        ]
    }
}

/// List volumes.
async fn list_volumes(ctx: CommandContext, args: ListVolumesArgs) -> Result<()> {
    let provider = ctx.provider()?;

    if let Some(instance_id) = args.instance.as_deref() {
        let rows: Vec<InstanceVolumeRow> = provider
            .list_volumes(instance_id)
            .await?
            .iter()
            .map(InstanceVolumeRow::from)
            .collect();
        print_output(&rows, ctx.format);
        return Ok(());
    }

    let rows = collect_volume_rows(&provider, args.project.as_deref()).await?;
    print_output(&rows, ctx.format);
    Ok(())
}

async fn collect_volume_rows(
    provider: &dyn ComputeProvider,
    project: Option<&str>,
) -> Result<Vec<VolumeRow>> {
    let mut rows = Vec::new();
    for instance in provider.list_instances(project).await? {
        for volume in provider.list_volumes(&instance.id).await? {
            rows.push(VolumeRow {
                id: volume.id.clone(),
                instance: instance.id.clone(),
                state: volume.state.to_string(),
                size: volume.size_label(),
                encryption: volume.encryption_label().to_string(),
            });
        }
    }
    Ok(rows)
}
