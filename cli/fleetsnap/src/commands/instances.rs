//! Instance commands: listing, lifecycle transitions, and the fleet
//! snapshot run.

use anyhow::Result;
use clap::{Args, Subcommand};
use fleet_provider::{ComputeProvider, Instance};
use serde::Serialize;
use tabled::Tabled;
use tracing::warn;

use crate::error::CliError;
use crate::orchestrate;
use crate::output::{print_output, PlainRow};

use super::CommandContext;

/// Instance commands.
#[derive(Debug, Args)]
pub struct InstancesCommand {
    #[command(subcommand)]
    command: InstancesSubcommand,
}

#[derive(Debug, Subcommand)]
enum InstancesSubcommand {
    /// List instances.
    List(ListInstancesArgs),

    /// Stop instances.
    Stop(LifecycleArgs),

    /// Start instances.
    Start(LifecycleArgs),

    /// Reboot instances.
    Reboot(LifecycleArgs),

    /// Stop instances, snapshot every attached volume, and start them again.
    Snapshot(SnapshotFleetArgs),
}

#[derive(Debug, Args)]
struct ListInstancesArgs {
    /// Only instances for this project (tag Project:<name>).
    #[arg(long)]
    project: Option<String>,
}

#[derive(Debug, Args)]
struct LifecycleArgs {
    /// Only instances for this project (tag Project:<name>).
    #[arg(long)]
    project: Option<String>,

    /// Act on the whole fleet when no project filter is given.
    #[arg(long)]
    force: bool,

    /// Act on a single instance by id.
    #[arg(long)]
    instance: Option<String>,
}

#[derive(Debug, Args)]
struct SnapshotFleetArgs {
    /// Only instances for this project (tag Project:<name>).
    #[arg(long)]
    project: Option<String>,

    /// Snapshot the whole fleet when no project filter is given.
    #[arg(long)]
    force: bool,
}

impl InstancesCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            InstancesSubcommand::List(args) => list_instances(ctx, args).await,
            InstancesSubcommand::Stop(args) => {
                lifecycle(ctx, args, LifecycleAction::Stop).await
            }
            InstancesSubcommand::Start(args) => {
                lifecycle(ctx, args, LifecycleAction::Start).await
            }
            InstancesSubcommand::Reboot(args) => {
                lifecycle(ctx, args, LifecycleAction::Reboot).await
            }
            InstancesSubcommand::Snapshot(args) => snapshot_fleet(ctx, args).await,
        }
    }
}

/// One instance listing row.
#[derive(Debug, Clone, Serialize, Tabled)]
struct InstanceRow {
    #[tabled(rename = "ID")]
    id: String,

    #[tabled(rename = "Type")]
    instance_type: String,

    #[tabled(rename = "Zone")]
    availability_zone: String,

    #[tabled(rename = "State")]
    state: String,

    #[tabled(rename = "Public DNS")]
    public_dns_name: String,

    #[tabled(rename = "Project")]
    project: String,
}

impl From<&Instance> for InstanceRow {
    fn from(instance: &Instance) -> Self {
        Self {
            id: instance.id.clone(),
            instance_type: instance.instance_type.clone(),
            availability_zone: instance.availability_zone.clone(),
            state: instance.state.to_string(),
            public_dns_name: instance.public_dns_name.clone().unwrap_or_default(),
            project: instance.project().to_string(),
        }
    }
}

impl PlainRow for InstanceRow {
    fn fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.instance_type.clone(),
            self.availability_zone.clone(),
            self.state.clone(),
            self.public_dns_name.clone(),
            self.project.clone(),
        ]
    }
}

/// List instances.
async fn list_instances(ctx: CommandContext, args: ListInstancesArgs) -> Result<()> {
    let provider = ctx.provider()?;

    let rows: Vec<InstanceRow> = provider
        .list_instances(args.project.as_deref())
        .await?
        .iter()
        .map(InstanceRow::from)
        .collect();

    print_output(&rows, ctx.format);
    Ok(())
}

/// Fleet-wide operations must be scoped or explicitly forced.
fn require_scope(project: Option<&str>, force: bool) -> Result<(), CliError> {
    if project.is_some() || force {
        Ok(())
    } else {
        Err(CliError::Usage(
            "cannot act on every instance in the account without either --project or --force"
                .to_string(),
        ))
    }
}

#[derive(Debug, Clone, Copy)]
enum LifecycleAction {
    Stop,
    Start,
    Reboot,
}

impl LifecycleAction {
    fn gerund(self) -> &'static str {
        match self {
            Self::Stop => "Stopping",
            Self::Start => "Starting",
            Self::Reboot => "Rebooting",
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Start => "start",
            Self::Reboot => "reboot",
        }
    }

    async fn apply(
        self,
        provider: &dyn ComputeProvider,
        id: &str,
    ) -> Result<(), fleet_provider::ProviderError> {
        match self {
            Self::Stop => provider.stop_instance(id).await,
            Self::Start => provider.start_instance(id).await,
            Self::Reboot => provider.reboot_instance(id).await,
        }
    }
}

/// Stop, start, or reboot instances.
async fn lifecycle(
    ctx: CommandContext,
    args: LifecycleArgs,
    action: LifecycleAction,
) -> Result<()> {
    // A single named instance needs no fleet guard and no filter.
    if let Some(id) = args.instance.as_deref() {
        let provider = ctx.provider()?;
        println!("{} {}...", action.gerund(), id);
        action.apply(&provider, id).await?;
        return Ok(());
    }

    require_scope(args.project.as_deref(), args.force)?;

    let provider = ctx.provider()?;
    bulk_lifecycle(&provider, args.project.as_deref(), action).await
}

/// Apply a lifecycle action across the filtered fleet, containing errors
/// per instance. Does not wait for terminal states.
async fn bulk_lifecycle(
    provider: &dyn ComputeProvider,
    project: Option<&str>,
    action: LifecycleAction,
) -> Result<()> {
    for instance in provider.list_instances(project).await? {
        println!("{} {}...", action.gerund(), instance.id);
        if let Err(e) = action.apply(provider, &instance.id).await {
            println!(" Could not {} {}. {}", action.verb(), instance.id, e);
            continue;
        }
    }
    Ok(())
}

/// Create snapshots for all volumes of the filtered instances.
async fn snapshot_fleet(ctx: CommandContext, args: SnapshotFleetArgs) -> Result<()> {
    require_scope(args.project.as_deref(), args.force)?;

    let provider = ctx.provider()?;
    let instances = provider.list_instances(args.project.as_deref()).await?;
    let report = orchestrate::snapshot_fleet(&provider, &instances).await;

    // Per-instance failures are reported but do not change the exit code.
    if report.has_failures() {
        warn!(
            failed = report.failed.len(),
            succeeded = report.succeeded.len(),
            "fleet snapshot finished with per-instance errors"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use fleet_provider::fake::{instance, Call, FakeProvider};
    use fleet_provider::InstanceState;

    use super::*;

    #[test]
    fn scope_guard_accepts_project_or_force() {
        assert!(require_scope(Some("valkyrie"), false).is_ok());
        assert!(require_scope(None, true).is_ok());
        assert!(require_scope(Some("valkyrie"), true).is_ok());
    }

    #[test]
    fn scope_guard_rejects_unscoped_unforced_runs() {
        let err = require_scope(None, false).unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }

    #[tokio::test]
    async fn guard_rejection_happens_before_any_provider_call() {
        let provider = FakeProvider::new();
        provider.add_instance(instance("i-1", InstanceState::Running, None));

        // Mirrors the snapshot command path: the guard runs first.
        let guard = require_scope(None, false);
        assert!(guard.is_err());
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn bulk_stop_continues_past_failing_instances() {
        let provider = FakeProvider::new();
        provider.add_instance(instance("i-1", InstanceState::Running, Some("valkyrie")));
        provider.add_instance(instance("i-2", InstanceState::Running, Some("valkyrie")));
        provider.fail_stop("i-1");

        bulk_lifecycle(&provider, Some("valkyrie"), LifecycleAction::Stop)
            .await
            .unwrap();

        let calls = provider.calls();
        assert!(calls.contains(&Call::Stop {
            instance: "i-1".to_string()
        }));
        assert!(calls.contains(&Call::Stop {
            instance: "i-2".to_string()
        }));
    }

    #[tokio::test]
    async fn bulk_reboot_only_touches_the_filtered_project() {
        let provider = FakeProvider::new();
        provider.add_instance(instance("i-1", InstanceState::Running, Some("valkyrie")));
        provider.add_instance(instance("i-2", InstanceState::Running, Some("other")));

        bulk_lifecycle(&provider, Some("valkyrie"), LifecycleAction::Reboot)
            .await
            .unwrap();

        let calls = provider.calls();
        assert!(calls.contains(&Call::Reboot {
            instance: "i-1".to_string()
        }));
        assert!(!calls.contains(&Call::Reboot {
            instance: "i-2".to_string()
        }));
    }

    #[tokio::test]
    async fn listing_failure_propagates_as_fatal() {
        let provider = FakeProvider::new();
        provider.fail_list_instances();

        let result = bulk_lifecycle(&provider, None, LifecycleAction::Start).await;
        assert!(result.is_err());
    }

    #[test]
    fn instance_row_includes_project_fallback() {
        let row = InstanceRow::from(&instance("i-1", InstanceState::Running, None));
        assert_eq!(
            PlainRow::fields(&row),
            vec!["i-1", "t3.micro", "us-east-1a", "running", "", "<no project>"]
        );
    }
}
