//! The node plugin: CSI Identity and Node services for the Workload API
//! socket directory.
//!
//! [`WorkloadApiPlugin`] composes request validation with the
//! [`MountOperator`].  It is node-only: it advertises no plugin or node
//! capabilities, and staging, volume statistics and expansion fall through
//! to the `Unimplemented` defaults of [`CsiNode`].

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use libcsi::{
    CsiError, CsiIdentity, CsiNode, NodeCapability, NodeInfo, NodePublishVolumeRequest,
    NodeUnpublishVolumeRequest, PluginCapability, PluginInfo,
};
use tracing::instrument;

use crate::config::Config;
use crate::mounter::{MountOperator, Mounter, SystemMounter};
use crate::validate::{validate_publish, validate_unpublish};

/// Name the plugin registers under.
pub const PLUGIN_NAME: &str = "wlapi.csi.rk8s.io";

/// Only one Workload API volume is ever needed per workload.
pub const MAX_VOLUMES_PER_NODE: i64 = 1;

/// Identity of the node this plugin runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub node_id: String,
}

impl NodeIdentity {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
        }
    }

    fn info(&self) -> NodeInfo {
        NodeInfo {
            node_id: self.node_id.clone(),
            max_volumes_per_node: MAX_VOLUMES_PER_NODE,
        }
    }
}

/// CSI node plugin that publishes the Workload API socket directory.
pub struct WorkloadApiPlugin<M = SystemMounter> {
    node: NodeIdentity,
    operator: Arc<MountOperator<M>>,
}

impl WorkloadApiPlugin<SystemMounter> {
    /// Build the plugin from validated process configuration.
    pub fn new(config: &Config) -> Self {
        Self::with_mounter(
            NodeIdentity::new(&config.node_id),
            config.workload_api_dir.clone(),
            SystemMounter,
        )
    }
}

impl<M: Mounter + 'static> WorkloadApiPlugin<M> {
    pub fn with_mounter(node: NodeIdentity, source_dir: PathBuf, mounter: M) -> Self {
        Self {
            node,
            operator: Arc::new(MountOperator::with_mounter(source_dir, mounter)),
        }
    }

    /// Run a mount transition on the blocking pool.
    ///
    /// Once started the syscall runs to completion even if the caller gives
    /// up waiting.
    async fn run_blocking<F>(&self, f: F) -> Result<(), CsiError>
    where
        F: FnOnce(&MountOperator<M>) -> Result<(), CsiError> + Send + 'static,
    {
        let operator = Arc::clone(&self.operator);
        tokio::task::spawn_blocking(move || f(&operator))
            .await
            .map_err(|e| CsiError::Internal(format!("mount task failed: {e}")))?
    }
}

#[async_trait]
impl<M: Mounter + 'static> CsiIdentity for WorkloadApiPlugin<M> {
    async fn get_plugin_info(&self) -> Result<PluginInfo, CsiError> {
        Ok(PluginInfo {
            name: PLUGIN_NAME.to_owned(),
            vendor_version: env!("CARGO_PKG_VERSION").to_owned(),
        })
    }

    async fn get_plugin_capabilities(&self) -> Result<Vec<PluginCapability>, CsiError> {
        // Only the Node service is implemented.
        Ok(Vec::new())
    }

    async fn probe(&self) -> Result<bool, CsiError> {
        Ok(true)
    }
}

#[async_trait]
impl<M: Mounter + 'static> CsiNode for WorkloadApiPlugin<M> {
    #[instrument(skip(self, req), fields(volume_id = %req.volume_id, target_path = %req.target_path))]
    async fn publish_volume(&self, req: NodePublishVolumeRequest) -> Result<(), CsiError> {
        validate_publish(&req)?;
        let target = PathBuf::from(req.target_path);
        self.run_blocking(move |op| op.publish(&target)).await
    }

    #[instrument(skip(self, req), fields(volume_id = %req.volume_id, target_path = %req.target_path))]
    async fn unpublish_volume(&self, req: NodeUnpublishVolumeRequest) -> Result<(), CsiError> {
        validate_unpublish(&req)?;
        let target = PathBuf::from(req.target_path);
        self.run_blocking(move |op| op.unpublish(&target)).await
    }

    async fn get_capabilities(&self) -> Result<Vec<NodeCapability>, CsiError> {
        Ok(Vec::new())
    }

    async fn get_info(&self) -> Result<NodeInfo, CsiError> {
        Ok(self.node.info())
    }
}
