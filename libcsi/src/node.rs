//! CSI Node service trait.
//!
//! The Node service runs on each worker node and handles the local filesystem
//! operations required to make a volume available to workloads:
//!
//! 1. **Publish** — make the volume visible at the workload's target path.
//! 2. **Unpublish** — take it away again.
//!
//! Staging, volume statistics and expansion are optional in CSI.  They have
//! default implementations that answer `Unimplemented`, so a plugin only
//! overrides what it actually advertises.

use async_trait::async_trait;

use crate::error::CsiError;
use crate::types::{
    NodeCapability, NodeExpandVolumeRequest, NodeGetVolumeStatsRequest, NodeInfo,
    NodePublishVolumeRequest, NodeStageVolumeRequest, NodeUnpublishVolumeRequest,
    NodeUnstageVolumeRequest,
};

/// Node service — local mount / unmount operations.
#[async_trait]
pub trait CsiNode: Send + Sync {
    /// Publish a volume at `req.target_path`.
    async fn publish_volume(&self, req: NodePublishVolumeRequest) -> Result<(), CsiError>;

    /// Unpublish a volume from `req.target_path`.
    async fn unpublish_volume(&self, req: NodeUnpublishVolumeRequest) -> Result<(), CsiError>;

    /// Advertise the optional node RPCs this plugin supports.
    async fn get_capabilities(&self) -> Result<Vec<NodeCapability>, CsiError>;

    /// Return information about the node on which this service is running.
    async fn get_info(&self) -> Result<NodeInfo, CsiError>;

    async fn stage_volume(&self, _req: NodeStageVolumeRequest) -> Result<(), CsiError> {
        Err(CsiError::unimplemented("NodeStageVolume"))
    }

    async fn unstage_volume(&self, _req: NodeUnstageVolumeRequest) -> Result<(), CsiError> {
        Err(CsiError::unimplemented("NodeUnstageVolume"))
    }

    async fn get_volume_stats(&self, _req: NodeGetVolumeStatsRequest) -> Result<(), CsiError> {
        Err(CsiError::unimplemented("NodeGetVolumeStats"))
    }

    async fn expand_volume(&self, _req: NodeExpandVolumeRequest) -> Result<(), CsiError> {
        Err(CsiError::unimplemented("NodeExpandVolume"))
    }
}
