//! # fleet-provider
//!
//! Client library for the cloud provider's compute management API, scoped to
//! what fleetsnap needs: enumerating instances, volumes, and snapshots,
//! issuing lifecycle transitions, and creating volume snapshots.
//!
//! All resources are remote and read-through. Nothing here caches provider
//! state; every call re-queries the API.
//!
//! The [`ComputeProvider`] trait is the seam between command logic and the
//! wire. Production code uses [`HttpProvider`]; tests use
//! [`fake::FakeProvider`], which records every call it receives.

use async_trait::async_trait;

pub mod fake;

mod error;
mod http;
mod model;
mod session;

pub use error::ProviderError;
pub use http::HttpProvider;
pub use model::{
    Instance, InstanceState, Snapshot, SnapshotState, Tag, Volume, VolumeState, NO_PROJECT,
    PROJECT_TAG,
};
pub use session::{CredentialStore, Profile, Session, DEFAULT_PROFILE};

/// Result alias for provider operations.
pub type Result<T, E = ProviderError> = std::result::Result<T, E>;

/// Operations fleetsnap needs from the compute provider.
///
/// One instance of this trait corresponds to one account and one region
/// under a single set of credentials.
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// Lists instances visible to the current credentials.
    ///
    /// With `project` set, only instances carrying a `Project` tag with that
    /// exact value are returned. Without it, every visible instance is.
    async fn list_instances(&self, project: Option<&str>) -> Result<Vec<Instance>>;

    /// Fetches a single instance by id.
    async fn get_instance(&self, id: &str) -> Result<Instance>;

    /// Lists the volumes attached to an instance.
    async fn list_volumes(&self, instance_id: &str) -> Result<Vec<Volume>>;

    /// Lists a volume's snapshots, newest first by creation time.
    async fn list_snapshots(&self, volume_id: &str) -> Result<Vec<Snapshot>>;

    /// Requests an instance stop. Returns once the provider accepts the
    /// request; the instance transitions in the background.
    async fn stop_instance(&self, id: &str) -> Result<()>;

    /// Requests an instance start. Returns once the provider accepts the
    /// request.
    async fn start_instance(&self, id: &str) -> Result<()>;

    /// Requests an instance reboot.
    async fn reboot_instance(&self, id: &str) -> Result<()>;

    /// Requests a snapshot of a volume. Fire-and-forget: the returned
    /// snapshot is typically still `pending`.
    async fn create_snapshot(&self, volume_id: &str, description: &str) -> Result<Snapshot>;

    /// Blocks until the instance reports `stopped`.
    ///
    /// # Errors
    ///
    /// Fails with [`ProviderError::WaitTimeout`] if the provider-default
    /// wait budget is exhausted before the state is reached.
    async fn wait_until_stopped(&self, id: &str) -> Result<()>;

    /// Blocks until the instance reports `running`.
    ///
    /// # Errors
    ///
    /// Fails with [`ProviderError::WaitTimeout`] if the provider-default
    /// wait budget is exhausted before the state is reached.
    async fn wait_until_running(&self, id: &str) -> Result<()>;
}
