//! Wire types for provider resources.
//!
//! Field names and state vocabularies follow the provider API. States use
//! kebab-case on the wire (`shutting-down`, `in-use`).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag key used to group instances into projects.
pub const PROJECT_TAG: &str = "Project";

/// Placeholder shown for instances with no `Project` tag.
pub const NO_PROJECT: &str = "<no project>";

/// Instance lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceState {
    Pending,
    Running,
    ShuttingDown,
    Stopping,
    Stopped,
    Terminated,
}

impl InstanceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::ShuttingDown => "shutting-down",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A key/value tag on an instance. Unordered; lookups are by key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// A compute instance as reported by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub instance_type: String,
    pub availability_zone: String,
    pub state: InstanceState,

    #[serde(default)]
    pub public_dns_name: Option<String>,

    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Instance {
    /// Looks up a tag value by key. Tag order carries no meaning.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    /// The instance's project tag, or [`NO_PROJECT`] when untagged.
    pub fn project(&self) -> &str {
        self.tag(PROJECT_TAG).unwrap_or(NO_PROJECT)
    }
}

/// Volume lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolumeState {
    Creating,
    Available,
    InUse,
    Deleting,
    Deleted,
    Error,
}

impl VolumeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creating => "creating",
            Self::Available => "available",
            Self::InUse => "in-use",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for VolumeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A block-storage volume attached to an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    pub state: VolumeState,
    pub size_gib: i64,

    #[serde(default)]
    pub encrypted: bool,
}

impl Volume {
    pub fn size_label(&self) -> String {
        format!("{}GiB", self.size_gib)
    }

    pub fn encryption_label(&self) -> &'static str {
        if self.encrypted {
            "Encrypted"
        } else {
            "Not Encrypted"
        }
    }
}

/// Snapshot state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotState {
    Pending,
    Completed,
    Error,
}

impl SnapshotState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SnapshotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point-in-time backup of a volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub volume_id: String,
    pub state: SnapshotState,

    /// Provider-reported progress, e.g. `"45%"`.
    #[serde(default)]
    pub progress: String,

    pub start_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged_instance(tags: Vec<Tag>) -> Instance {
        Instance {
            id: "i-0abc".to_string(),
            instance_type: "t3.micro".to_string(),
            availability_zone: "us-east-1a".to_string(),
            state: InstanceState::Running,
            public_dns_name: None,
            tags,
        }
    }

    #[test]
    fn tag_lookup_finds_value_regardless_of_order() {
        let instance = tagged_instance(vec![
            Tag {
                key: "Name".to_string(),
                value: "web-1".to_string(),
            },
            Tag {
                key: PROJECT_TAG.to_string(),
                value: "valkyrie".to_string(),
            },
        ]);
        assert_eq!(instance.tag(PROJECT_TAG), Some("valkyrie"));
        assert_eq!(instance.project(), "valkyrie");
    }

    #[test]
    fn missing_project_tag_falls_back_to_sentinel() {
        let instance = tagged_instance(vec![]);
        assert_eq!(instance.tag(PROJECT_TAG), None);
        assert_eq!(instance.project(), NO_PROJECT);
    }

    #[test]
    fn instance_state_uses_kebab_case_on_the_wire() {
        let state: InstanceState = serde_json::from_str("\"shutting-down\"").unwrap();
        assert_eq!(state, InstanceState::ShuttingDown);
        assert_eq!(
            serde_json::to_string(&InstanceState::ShuttingDown).unwrap(),
            "\"shutting-down\""
        );
    }

    #[test]
    fn volume_labels_match_listing_format() {
        let volume = Volume {
            id: "vol-1".to_string(),
            state: VolumeState::InUse,
            size_gib: 8,
            encrypted: false,
        };
        assert_eq!(volume.size_label(), "8GiB");
        assert_eq!(volume.encryption_label(), "Not Encrypted");
    }

    #[test]
    fn snapshot_deserializes_from_api_shape() {
        let snapshot: Snapshot = serde_json::from_str(
            r#"{
                "id": "snap-1",
                "volume_id": "vol-1",
                "state": "pending",
                "progress": "12%",
                "start_time": "2026-08-01T10:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(snapshot.state, SnapshotState::Pending);
        assert_eq!(snapshot.progress, "12%");
    }
}
