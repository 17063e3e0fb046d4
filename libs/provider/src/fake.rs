//! In-memory provider fake for tests.
//!
//! [`FakeProvider`] holds a scripted fleet, records every call it receives,
//! and can be told to fail specific operations for specific resources. It
//! models the provider loosely: `stop`/`start` flip the instance state
//! immediately, so the wait operations succeed on their first check, and
//! `create_snapshot` prepends a new `pending` snapshot to the volume's
//! history (newest first).

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::error::ProviderError;
use crate::model::{
    Instance, InstanceState, Snapshot, SnapshotState, Tag, Volume, VolumeState, PROJECT_TAG,
};
use crate::{ComputeProvider, Result};

/// One recorded provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListInstances { project: Option<String> },
    GetInstance { instance: String },
    ListVolumes { instance: String },
    ListSnapshots { volume: String },
    Stop { instance: String },
    Start { instance: String },
    Reboot { instance: String },
    CreateSnapshot { volume: String, description: String },
    WaitUntilStopped { instance: String },
    WaitUntilRunning { instance: String },
}

#[derive(Debug, Default)]
struct FakeState {
    instances: Vec<Instance>,
    // instance id -> attached volumes
    volumes: HashMap<String, Vec<Volume>>,
    // volume id -> snapshots, newest first
    snapshots: HashMap<String, Vec<Snapshot>>,
    fail_stop: HashSet<String>,
    fail_start: HashSet<String>,
    fail_reboot: HashSet<String>,
    fail_create_snapshot: HashSet<String>,
    fail_list_instances: bool,
    calls: Vec<Call>,
    next_snapshot_seq: u32,
}

/// Scriptable, call-recording implementation of [`ComputeProvider`].
#[derive(Debug, Default)]
pub struct FakeProvider {
    state: Mutex<FakeState>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance to the fleet.
    pub fn add_instance(&self, instance: Instance) {
        let mut state = self.state.lock().unwrap();
        state.volumes.entry(instance.id.clone()).or_default();
        state.instances.push(instance);
    }

    /// Attach a volume to an instance.
    pub fn add_volume(&self, instance_id: &str, volume: Volume) {
        let mut state = self.state.lock().unwrap();
        state
            .volumes
            .entry(instance_id.to_string())
            .or_default()
            .push(volume);
    }

    /// Record an existing snapshot for a volume. Most recent additions are
    /// returned first, matching the provider's newest-first ordering.
    pub fn add_snapshot(&self, volume_id: &str, snapshot: Snapshot) {
        let mut state = self.state.lock().unwrap();
        state
            .snapshots
            .entry(volume_id.to_string())
            .or_default()
            .insert(0, snapshot);
    }

    /// Make `stop_instance` fail for the given instance.
    pub fn fail_stop(&self, instance_id: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_stop
            .insert(instance_id.to_string());
    }

    /// Make `start_instance` fail for the given instance.
    pub fn fail_start(&self, instance_id: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_start
            .insert(instance_id.to_string());
    }

    /// Make `reboot_instance` fail for the given instance.
    pub fn fail_reboot(&self, instance_id: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_reboot
            .insert(instance_id.to_string());
    }

    /// Make `create_snapshot` fail for the given volume.
    pub fn fail_create_snapshot(&self, volume_id: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_create_snapshot
            .insert(volume_id.to_string());
    }

    /// Make `list_instances` fail (fatal listing-path error).
    pub fn fail_list_instances(&self) {
        self.state.lock().unwrap().fail_list_instances = true;
    }

    /// Every call recorded so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Current state of an instance, for post-run assertions.
    pub fn instance_state(&self, instance_id: &str) -> Option<InstanceState> {
        self.state
            .lock()
            .unwrap()
            .instances
            .iter()
            .find(|i| i.id == instance_id)
            .map(|i| i.state)
    }

    /// Number of snapshots recorded for a volume.
    pub fn snapshot_count(&self, volume_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .snapshots
            .get(volume_id)
            .map_or(0, Vec::len)
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn scripted_error(op: &str, id: &str) -> ProviderError {
        ProviderError::api(
            409,
            "invalid-state",
            format!("scripted failure: {op} {id}"),
        )
    }

    fn set_state(&self, instance_id: &str, new_state: InstanceState) {
        let mut state = self.state.lock().unwrap();
        if let Some(instance) = state.instances.iter_mut().find(|i| i.id == instance_id) {
            instance.state = new_state;
        }
    }
}

#[async_trait]
impl ComputeProvider for FakeProvider {
    async fn list_instances(&self, project: Option<&str>) -> Result<Vec<Instance>> {
        self.record(Call::ListInstances {
            project: project.map(str::to_string),
        });

        let state = self.state.lock().unwrap();
        if state.fail_list_instances {
            return Err(ProviderError::NotAuthenticated);
        }

        Ok(state
            .instances
            .iter()
            .filter(|i| match project {
                Some(project) => i.tag(PROJECT_TAG) == Some(project),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn get_instance(&self, id: &str) -> Result<Instance> {
        self.record(Call::GetInstance {
            instance: id.to_string(),
        });

        self.state
            .lock()
            .unwrap()
            .instances
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))
    }

    async fn list_volumes(&self, instance_id: &str) -> Result<Vec<Volume>> {
        self.record(Call::ListVolumes {
            instance: instance_id.to_string(),
        });

        Ok(self
            .state
            .lock()
            .unwrap()
            .volumes
            .get(instance_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_snapshots(&self, volume_id: &str) -> Result<Vec<Snapshot>> {
        self.record(Call::ListSnapshots {
            volume: volume_id.to_string(),
        });

        Ok(self
            .state
            .lock()
            .unwrap()
            .snapshots
            .get(volume_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn stop_instance(&self, id: &str) -> Result<()> {
        self.record(Call::Stop {
            instance: id.to_string(),
        });

        if self.state.lock().unwrap().fail_stop.contains(id) {
            return Err(Self::scripted_error("stop", id));
        }
        self.set_state(id, InstanceState::Stopped);
        Ok(())
    }

    async fn start_instance(&self, id: &str) -> Result<()> {
        self.record(Call::Start {
            instance: id.to_string(),
        });

        if self.state.lock().unwrap().fail_start.contains(id) {
            return Err(Self::scripted_error("start", id));
        }
        self.set_state(id, InstanceState::Running);
        Ok(())
    }

    async fn reboot_instance(&self, id: &str) -> Result<()> {
        self.record(Call::Reboot {
            instance: id.to_string(),
        });

        if self.state.lock().unwrap().fail_reboot.contains(id) {
            return Err(Self::scripted_error("reboot", id));
        }
        Ok(())
    }

    async fn create_snapshot(&self, volume_id: &str, description: &str) -> Result<Snapshot> {
        self.record(Call::CreateSnapshot {
            volume: volume_id.to_string(),
            description: description.to_string(),
        });

        let mut state = self.state.lock().unwrap();
        if state.fail_create_snapshot.contains(volume_id) {
            return Err(Self::scripted_error("create-snapshot", volume_id));
        }

        state.next_snapshot_seq += 1;
        let snapshot = Snapshot {
            id: format!("snap-fake-{}", state.next_snapshot_seq),
            volume_id: volume_id.to_string(),
            state: SnapshotState::Pending,
            progress: "0%".to_string(),
            start_time: Utc::now(),
        };
        state
            .snapshots
            .entry(volume_id.to_string())
            .or_default()
            .insert(0, snapshot.clone());
        Ok(snapshot)
    }

    async fn wait_until_stopped(&self, id: &str) -> Result<()> {
        self.record(Call::WaitUntilStopped {
            instance: id.to_string(),
        });

        match self.instance_state(id) {
            Some(InstanceState::Stopped) => Ok(()),
            _ => Err(ProviderError::WaitTimeout {
                instance: id.to_string(),
                target: "stopped",
            }),
        }
    }

    async fn wait_until_running(&self, id: &str) -> Result<()> {
        self.record(Call::WaitUntilRunning {
            instance: id.to_string(),
        });

        match self.instance_state(id) {
            Some(InstanceState::Running) => Ok(()),
            _ => Err(ProviderError::WaitTimeout {
                instance: id.to_string(),
                target: "running",
            }),
        }
    }
}

/// Build a minimal instance for tests.
pub fn instance(id: &str, state: InstanceState, project: Option<&str>) -> Instance {
    Instance {
        id: id.to_string(),
        instance_type: "t3.micro".to_string(),
        availability_zone: "us-east-1a".to_string(),
        state,
        public_dns_name: None,
        tags: project
            .map(|p| {
                vec![Tag {
                    key: PROJECT_TAG.to_string(),
                    value: p.to_string(),
                }]
            })
            .unwrap_or_default(),
    }
}

/// Build a minimal in-use volume for tests.
pub fn volume(id: &str) -> Volume {
    Volume {
        id: id.to_string(),
        state: VolumeState::InUse,
        size_gib: 8,
        encrypted: false,
    }
}

/// Build a snapshot with a fixed, deterministic start time.
pub fn snapshot(id: &str, volume_id: &str, state: SnapshotState) -> Snapshot {
    Snapshot {
        id: id.to_string(),
        volume_id: volume_id.to_string(),
        state,
        progress: match state {
            SnapshotState::Completed => "100%".to_string(),
            _ => "0%".to_string(),
        },
        start_time: Utc.with_ymd_and_hms(2026, 8, 1, 10, 0, 0).unwrap(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_instances_filters_by_project_tag() {
        let provider = FakeProvider::new();
        provider.add_instance(instance("i-1", InstanceState::Running, Some("valkyrie")));
        provider.add_instance(instance("i-2", InstanceState::Running, Some("other")));
        provider.add_instance(instance("i-3", InstanceState::Stopped, None));

        let all = provider.list_instances(None).await.unwrap();
        assert_eq!(all.len(), 3);

        let scoped = provider.list_instances(Some("valkyrie")).await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].id, "i-1");
    }

    #[tokio::test]
    async fn stop_flips_state_and_wait_observes_it() {
        let provider = FakeProvider::new();
        provider.add_instance(instance("i-1", InstanceState::Running, None));

        provider.stop_instance("i-1").await.unwrap();
        provider.wait_until_stopped("i-1").await.unwrap();
        assert_eq!(
            provider.instance_state("i-1"),
            Some(InstanceState::Stopped)
        );
    }

    #[tokio::test]
    async fn create_snapshot_prepends_pending_snapshot() {
        let provider = FakeProvider::new();
        provider.add_instance(instance("i-1", InstanceState::Running, None));
        provider.add_volume("i-1", volume("vol-1"));
        provider.add_snapshot("vol-1", snapshot("snap-old", "vol-1", SnapshotState::Completed));

        provider.create_snapshot("vol-1", "test").await.unwrap();

        let snapshots = provider.list_snapshots("vol-1").await.unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].state, SnapshotState::Pending);
        assert_eq!(snapshots[1].id, "snap-old");
    }
}
