//! CSI protocol messages transmitted over the node socket.
//!
//! [`CsiMessage`] is the top-level envelope for all request and response
//! variants exchanged between the orchestrator side ([`CsiClient`]) and the
//! plugin ([`CsiServer`]).
//!
//! [`CsiClient`]: crate::transport::client::CsiClient
//! [`CsiServer`]: crate::transport::server::CsiServer

use serde::{Deserialize, Serialize};

use crate::error::Status;
use crate::types::*;

/// Top-level message envelope.
///
/// Each connection carries exactly one request followed by one response.
/// The client sends a *request* variant and the server replies with the
/// corresponding *response* variant (or [`CsiMessage::Error`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CsiMessage {
    // ----- Identity requests -----------------------------------------------
    /// Query plugin info.
    GetPluginInfo,
    /// Query plugin capabilities.
    GetPluginCapabilities,
    /// Health probe.
    Probe,

    // ----- Node requests ---------------------------------------------------
    /// Stage a volume at a node-global path.
    StageVolume(NodeStageVolumeRequest),
    /// Unstage a previously staged volume.
    UnstageVolume(NodeUnstageVolumeRequest),
    /// Publish a volume into a workload target path.
    PublishVolume(NodePublishVolumeRequest),
    /// Unpublish a previously published volume.
    UnpublishVolume(NodeUnpublishVolumeRequest),
    /// Query volume usage statistics.
    GetVolumeStats(NodeGetVolumeStatsRequest),
    /// Expand a volume on the node.
    ExpandVolume(NodeExpandVolumeRequest),
    /// Query node service capabilities.
    GetNodeCapabilities,
    /// Query node info.
    GetNodeInfo,

    // ----- Responses -------------------------------------------------------
    /// Plugin information.
    PluginInfoResponse(PluginInfo),
    /// Plugin capabilities.
    PluginCapabilitiesResponse(Vec<PluginCapability>),
    /// Probe result.
    ProbeResult(bool),
    /// Node service capabilities.
    NodeCapabilitiesResponse(Vec<NodeCapability>),
    /// Node information.
    NodeInfoResponse(NodeInfo),

    /// Generic success acknowledgement (no payload).
    Ok,
    /// An error occurred.
    Error(Status),
}

impl CsiMessage {
    /// CSI method name of a request variant, `None` for responses.
    pub fn method(&self) -> Option<&'static str> {
        let name = match self {
            Self::GetPluginInfo => "GetPluginInfo",
            Self::GetPluginCapabilities => "GetPluginCapabilities",
            Self::Probe => "Probe",
            Self::StageVolume(_) => "NodeStageVolume",
            Self::UnstageVolume(_) => "NodeUnstageVolume",
            Self::PublishVolume(_) => "NodePublishVolume",
            Self::UnpublishVolume(_) => "NodeUnpublishVolume",
            Self::GetVolumeStats(_) => "NodeGetVolumeStats",
            Self::ExpandVolume(_) => "NodeExpandVolume",
            Self::GetNodeCapabilities => "NodeGetCapabilities",
            Self::GetNodeInfo => "NodeGetInfo",
            _ => return None,
        };
        Some(name)
    }
}

impl std::fmt::Display for CsiMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GetPluginInfo => f.write_str("GetPluginInfo"),
            Self::GetPluginCapabilities => f.write_str("GetPluginCapabilities"),
            Self::Probe => f.write_str("Probe"),
            Self::StageVolume(req) => write!(f, "NodeStageVolume({})", req.volume_id),
            Self::UnstageVolume(req) => write!(f, "NodeUnstageVolume({})", req.volume_id),
            Self::PublishVolume(req) => write!(
                f,
                "NodePublishVolume({}, target={})",
                req.volume_id, req.target_path
            ),
            Self::UnpublishVolume(req) => write!(
                f,
                "NodeUnpublishVolume({}, target={})",
                req.volume_id, req.target_path
            ),
            Self::GetVolumeStats(req) => write!(f, "NodeGetVolumeStats({})", req.volume_id),
            Self::ExpandVolume(req) => write!(f, "NodeExpandVolume({})", req.volume_id),
            Self::GetNodeCapabilities => f.write_str("NodeGetCapabilities"),
            Self::GetNodeInfo => f.write_str("NodeGetInfo"),
            Self::PluginInfoResponse(info) => {
                write!(f, "PluginInfo(name={})", info.name)
            }
            Self::PluginCapabilitiesResponse(caps) => {
                write!(f, "PluginCapabilities(count={})", caps.len())
            }
            Self::ProbeResult(ok) => write!(f, "ProbeResult({ok})"),
            Self::NodeCapabilitiesResponse(caps) => {
                write!(f, "NodeCapabilities(count={})", caps.len())
            }
            Self::NodeInfoResponse(info) => write!(
                f,
                "NodeInfo({}, max_volumes_per_node={})",
                info.node_id, info.max_volumes_per_node
            ),
            Self::Ok => f.write_str("Ok"),
            Self::Error(status) => write!(f, "Error({status})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Code, CsiError};

    #[test]
    fn publish_request_survives_the_wire() {
        let msg = CsiMessage::PublishVolume(NodePublishVolumeRequest {
            volume_id: "v1".into(),
            target_path: "/var/lib/kubelet/pods/p/volumes/v1/mount".into(),
            volume_capability: Some(VolumeCapability::plain_mount(
                AccessMode::SingleNodeWriter,
            )),
            readonly: false,
            volume_context: [("csi.storage.k8s.io/ephemeral".to_owned(), "true".to_owned())]
                .into(),
        });
        let json = serde_json::to_string(&msg).expect("serialize");
        let de: CsiMessage = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(de, msg);
    }

    #[test]
    fn error_message_carries_status() {
        let msg = CsiMessage::Error(CsiError::unimplemented("NodeExpandVolume").into());
        let json = serde_json::to_string(&msg).expect("serialize");
        let de: CsiMessage = serde_json::from_str(&json).expect("deserialize");
        assert!(matches!(
            de,
            CsiMessage::Error(Status {
                code: Code::Unimplemented,
                ..
            })
        ));
    }

    #[test]
    fn method_names() {
        assert_eq!(
            CsiMessage::UnpublishVolume(Default::default()).method(),
            Some("NodeUnpublishVolume")
        );
        assert_eq!(CsiMessage::GetNodeInfo.method(), Some("NodeGetInfo"));
        assert_eq!(CsiMessage::Ok.method(), None);
    }

    #[test]
    fn display_formatting() {
        assert_eq!(CsiMessage::Ok.to_string(), "Ok");
        assert_eq!(CsiMessage::Probe.to_string(), "Probe");
    }
}
