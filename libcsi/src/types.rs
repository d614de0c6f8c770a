//! Core CSI types: capabilities, node requests, plugin and node info.
//!
//! These types form the data model shared by the CSI traits and the
//! transport layer.  Optional protobuf fields are modelled as `Option` so a
//! handler can tell "absent" apart from "empty", which the node service
//! validation depends on.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Volume identity
// ---------------------------------------------------------------------------

/// Opaque identifier for a volume, as chosen by the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct VolumeId(pub String);

impl VolumeId {
    /// `true` when the orchestrator sent no identifier at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for VolumeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VolumeId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Access mode & capabilities
// ---------------------------------------------------------------------------

/// Describes how a volume may be accessed, mirroring the CSI
/// `VolumeCapability.AccessMode.Mode` enum.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessMode {
    Unknown,
    /// Can only be published once as read/write on a single node.
    SingleNodeWriter,
    /// Can only be published once as read-only on a single node.
    SingleNodeReaderOnly,
    /// Can be published as read-only at multiple nodes.
    MultiNodeReaderOnly,
    /// Can be published at multiple nodes, only one of which is writable.
    MultiNodeSingleWriter,
    /// Can be published as read/write at multiple nodes.
    MultiNodeMultiWriter,
    /// Single node, single workload writer.
    SingleNodeSingleWriter,
    /// Single node, many workload writers.
    SingleNodeMultiWriter,
}

/// File-system access type parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MountVolume {
    /// Requested filesystem type; empty means "plugin default".
    #[serde(default)]
    pub fs_type: String,
    /// Additional mount flags (e.g. `"noatime"`).
    #[serde(default)]
    pub mount_flags: Vec<String>,
}

/// How the volume is exposed to the workload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    /// Exposed as a mounted filesystem.
    Mount(MountVolume),
    /// Exposed as a raw block device.
    Block,
}

/// Describes the capabilities required from a volume.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeCapability {
    /// Mount or block access.
    #[serde(default)]
    pub access_type: Option<AccessType>,
    /// Requested access mode.
    #[serde(default)]
    pub access_mode: Option<AccessMode>,
}

impl VolumeCapability {
    /// A plain `mount` capability with no fs type or flags.
    pub fn plain_mount(access_mode: AccessMode) -> Self {
        Self {
            access_type: Some(AccessType::Mount(MountVolume::default())),
            access_mode: Some(access_mode),
        }
    }

    /// The mount parameters when the access type is `mount`.
    pub fn mount(&self) -> Option<&MountVolume> {
        match &self.access_type {
            Some(AccessType::Mount(m)) => Some(m),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Node requests
// ---------------------------------------------------------------------------

/// Request to publish a volume into a workload's target path.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodePublishVolumeRequest {
    /// Volume to publish.
    #[serde(default)]
    pub volume_id: VolumeId,
    /// Path the volume is made visible at,
    /// e.g. `/var/lib/kubelet/pods/<pod-uid>/volumes/<driver>/<vol>/mount`.
    #[serde(default)]
    pub target_path: String,
    /// Requested capability.
    #[serde(default)]
    pub volume_capability: Option<VolumeCapability>,
    /// Whether the orchestrator asked for a read-only publish.
    #[serde(default)]
    pub readonly: bool,
    /// Opaque context supplied by the orchestrator.
    #[serde(default)]
    pub volume_context: HashMap<String, String>,
}

/// Request to undo a previous publish.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeUnpublishVolumeRequest {
    /// Volume to unpublish.
    #[serde(default)]
    pub volume_id: VolumeId,
    /// Path the volume was published at.
    #[serde(default)]
    pub target_path: String,
}

/// Request to stage a volume at a node-global path.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeStageVolumeRequest {
    #[serde(default)]
    pub volume_id: VolumeId,
    #[serde(default)]
    pub staging_target_path: String,
}

/// Request to unstage a previously staged volume.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeUnstageVolumeRequest {
    #[serde(default)]
    pub volume_id: VolumeId,
    #[serde(default)]
    pub staging_target_path: String,
}

/// Request for usage statistics of a published volume.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeGetVolumeStatsRequest {
    #[serde(default)]
    pub volume_id: VolumeId,
    #[serde(default)]
    pub volume_path: String,
}

/// Request to grow a volume on the node.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeExpandVolumeRequest {
    #[serde(default)]
    pub volume_id: VolumeId,
    #[serde(default)]
    pub volume_path: String,
}

// ---------------------------------------------------------------------------
// Plugin & node info
// ---------------------------------------------------------------------------

/// Information about the CSI plugin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PluginInfo {
    /// Plugin name, e.g. `"wlapi.csi.rk8s.io"`.
    pub name: String,
    /// Vendor-provided version string.
    pub vendor_version: String,
}

/// Capabilities advertised by the CSI plugin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PluginCapability {
    /// Plugin provides a Controller service.
    ControllerService,
    /// Plugin supports volume topology constraints.
    VolumeAccessibilityConstraints,
}

/// Capabilities advertised by the CSI Node service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeCapability {
    /// Node supports `NodeStageVolume` / `NodeUnstageVolume`.
    StageUnstageVolume,
    /// Node supports `NodeGetVolumeStats`.
    GetVolumeStats,
    /// Node supports `NodeExpandVolume`.
    ExpandVolume,
}

/// Information about the node on which the CSI Node service runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeInfo {
    /// Unique node identifier.
    pub node_id: String,
    /// Maximum number of volumes the node can host.
    pub max_volumes_per_node: i64,
}
