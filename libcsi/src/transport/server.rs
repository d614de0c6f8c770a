//! Unix-socket server that runs on each worker node and dispatches incoming
//! CSI requests to the appropriate trait implementations.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{CsiError, Status};
use crate::identity::CsiIdentity;
use crate::message::CsiMessage;
use crate::node::CsiNode;
use crate::transport::MAX_MESSAGE_SIZE;

/// A CSI server that accepts connections on a Unix socket and dispatches
/// [`CsiMessage`] requests to a [`CsiIdentity`] + [`CsiNode`]
/// implementation.
pub struct CsiServer<T> {
    listener: UnixListener,
    socket_path: PathBuf,
    handler: Arc<T>,
}

impl<T> CsiServer<T>
where
    T: CsiIdentity + CsiNode + 'static,
{
    /// Create a new server listening at `socket_path`.
    ///
    /// A socket file left behind by a previous run is removed first.
    pub fn bind(socket_path: impl Into<PathBuf>, handler: Arc<T>) -> Result<Self, CsiError> {
        let socket_path = socket_path.into();
        match std::fs::remove_file(&socket_path) {
            Ok(()) => debug!(path = %socket_path.display(), "removed stale CSI socket"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %socket_path.display(), error = %e, "unable to remove CSI socket");
            }
        }

        let listener = UnixListener::bind(&socket_path).map_err(|e| {
            CsiError::Transport(format!(
                "unable to create CSI socket listener at {}: {e}",
                socket_path.display()
            ))
        })?;
        info!(path = %socket_path.display(), "CSI server listening");
        Ok(Self {
            listener,
            socket_path,
            handler,
        })
    }

    /// Accept connections in a loop until the listener fails.
    ///
    /// Each accepted connection is handled on its own Tokio task.
    pub async fn serve(&self) -> Result<(), CsiError> {
        loop {
            let (stream, _) = self
                .listener
                .accept()
                .await
                .map_err(CsiError::transport)?;
            let handler = Arc::clone(&self.handler);
            tokio::spawn(async move {
                if let Err(e) = Self::handle_connection(stream, &handler).await {
                    warn!(error = %e, "CSI connection error");
                }
            });
        }
    }

    /// Process a single connection: read request → dispatch → write response.
    #[instrument(skip_all)]
    async fn handle_connection(mut stream: UnixStream, handler: &T) -> Result<(), CsiError> {
        // One byte past the limit tells an oversized request from one that
        // fits exactly.
        let mut buf = Vec::new();
        (&mut stream)
            .take(MAX_MESSAGE_SIZE + 1)
            .read_to_end(&mut buf)
            .await
            .map_err(CsiError::transport)?;

        let response = if buf.len() as u64 > MAX_MESSAGE_SIZE {
            warn!(limit = MAX_MESSAGE_SIZE, "oversized CSI request");
            CsiMessage::Error(
                CsiError::InvalidArgument(format!("request exceeds {MAX_MESSAGE_SIZE} bytes"))
                    .into(),
            )
        } else {
            match serde_json::from_slice::<CsiMessage>(&buf) {
                Ok(request) => Self::dispatch(handler, request).await,
                Err(e) => {
                    warn!(error = %e, "malformed CSI request");
                    CsiMessage::Error(
                        CsiError::InvalidArgument(format!("malformed request: {e}")).into(),
                    )
                }
            }
        };

        let payload = serde_json::to_vec(&response).map_err(CsiError::internal)?;
        stream
            .write_all(&payload)
            .await
            .map_err(CsiError::transport)?;
        stream.shutdown().await.map_err(CsiError::transport)?;
        Ok(())
    }

    /// Route a request to the handler and log its outcome.
    ///
    /// This is the only place request, response and error detail is logged.
    async fn dispatch(handler: &T, request: CsiMessage) -> CsiMessage {
        let Some(method) = request.method() else {
            warn!(msg = %request, "unexpected message variant received as request");
            return CsiMessage::Error(
                CsiError::InvalidArgument(format!("unexpected message: {request}")).into(),
            );
        };

        debug!(method, req = %request, "called");
        match Self::route(handler, request).await {
            Ok(response) => {
                debug!(method, resp = %response, "ok");
                response
            }
            Err(e @ CsiError::Unimplemented(_)) => {
                warn!(method, "not implemented");
                CsiMessage::Error(Status::from(e))
            }
            Err(e) => {
                error!(method, error = %e, "failed");
                CsiMessage::Error(Status::from(e))
            }
        }
    }

    /// Map a [`CsiMessage`] request to the correct trait method call.
    async fn route(handler: &T, request: CsiMessage) -> Result<CsiMessage, CsiError> {
        let response = match request {
            // --- Identity ---------------------------------------------------
            CsiMessage::GetPluginInfo => {
                CsiMessage::PluginInfoResponse(handler.get_plugin_info().await?)
            }
            CsiMessage::GetPluginCapabilities => {
                CsiMessage::PluginCapabilitiesResponse(handler.get_plugin_capabilities().await?)
            }
            CsiMessage::Probe => CsiMessage::ProbeResult(handler.probe().await?),

            // --- Node -------------------------------------------------------
            CsiMessage::StageVolume(req) => {
                handler.stage_volume(req).await?;
                CsiMessage::Ok
            }
            CsiMessage::UnstageVolume(req) => {
                handler.unstage_volume(req).await?;
                CsiMessage::Ok
            }
            CsiMessage::PublishVolume(req) => {
                handler.publish_volume(req).await?;
                CsiMessage::Ok
            }
            CsiMessage::UnpublishVolume(req) => {
                handler.unpublish_volume(req).await?;
                CsiMessage::Ok
            }
            CsiMessage::GetVolumeStats(req) => {
                handler.get_volume_stats(req).await?;
                CsiMessage::Ok
            }
            CsiMessage::ExpandVolume(req) => {
                handler.expand_volume(req).await?;
                CsiMessage::Ok
            }
            CsiMessage::GetNodeCapabilities => {
                CsiMessage::NodeCapabilitiesResponse(handler.get_capabilities().await?)
            }
            CsiMessage::GetNodeInfo => CsiMessage::NodeInfoResponse(handler.get_info().await?),

            other => {
                return Err(CsiError::InvalidArgument(format!(
                    "unexpected message: {other}"
                )));
            }
        };
        Ok(response)
    }

    /// Path of the socket this server listens on.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::Code;
    use crate::transport::client::CsiClient;
    use crate::types::*;

    struct EchoPlugin;

    #[async_trait]
    impl CsiIdentity for EchoPlugin {
        async fn get_plugin_info(&self) -> Result<PluginInfo, CsiError> {
            Ok(PluginInfo {
                name: "echo.csi.test".into(),
                vendor_version: "0.0.1".into(),
            })
        }

        async fn get_plugin_capabilities(&self) -> Result<Vec<PluginCapability>, CsiError> {
            Ok(Vec::new())
        }

        async fn probe(&self) -> Result<bool, CsiError> {
            Ok(true)
        }
    }

    #[async_trait]
    impl CsiNode for EchoPlugin {
        async fn publish_volume(&self, req: NodePublishVolumeRequest) -> Result<(), CsiError> {
            if req.volume_id.is_empty() {
                return Err(CsiError::InvalidArgument(
                    "request missing required volume id".into(),
                ));
            }
            Ok(())
        }

        async fn unpublish_volume(&self, req: NodeUnpublishVolumeRequest) -> Result<(), CsiError> {
            Err(CsiError::Internal(format!(
                "unable to unmount {:?}: EINVAL",
                req.target_path
            )))
        }

        async fn get_capabilities(&self) -> Result<Vec<NodeCapability>, CsiError> {
            Ok(Vec::new())
        }

        async fn get_info(&self) -> Result<NodeInfo, CsiError> {
            Ok(NodeInfo {
                node_id: "node-a".into(),
                max_volumes_per_node: 1,
            })
        }
    }

    fn start(dir: &Path) -> CsiClient {
        let socket = dir.join("csi.sock");
        let server = CsiServer::bind(&socket, Arc::new(EchoPlugin)).expect("bind");
        tokio::spawn(async move {
            let _ = server.serve().await;
        });
        CsiClient::new(socket)
    }

    #[tokio::test]
    async fn identity_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let client = start(tmp.path());

        let resp = client.call(&CsiMessage::GetPluginInfo).await.unwrap();
        assert!(matches!(resp, CsiMessage::PluginInfoResponse(info) if info.name == "echo.csi.test"));

        let resp = client.call(&CsiMessage::Probe).await.unwrap();
        assert_eq!(resp, CsiMessage::ProbeResult(true));
    }

    #[tokio::test]
    async fn errors_keep_their_code() {
        let tmp = tempfile::tempdir().unwrap();
        let client = start(tmp.path());

        let resp = client
            .request(&CsiMessage::PublishVolume(Default::default()))
            .await
            .unwrap();
        assert!(matches!(
            resp,
            CsiMessage::Error(Status {
                code: Code::InvalidArgument,
                ..
            })
        ));

        let err = client
            .call(&CsiMessage::UnpublishVolume(NodeUnpublishVolumeRequest {
                volume_id: "v1".into(),
                target_path: "/mnt/t".into(),
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, CsiError::Internal(msg) if msg.contains("/mnt/t")));
    }

    #[tokio::test]
    async fn default_node_methods_are_unimplemented() {
        let tmp = tempfile::tempdir().unwrap();
        let client = start(tmp.path());

        let err = client
            .call(&CsiMessage::StageVolume(Default::default()))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CsiError::Unimplemented("method NodeStageVolume not implemented".into())
        );

        let err = client
            .call(&CsiMessage::ExpandVolume(Default::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, CsiError::Unimplemented(_)));
    }

    #[tokio::test]
    async fn response_variant_is_rejected_as_request() {
        let tmp = tempfile::tempdir().unwrap();
        let client = start(tmp.path());

        let err = client.call(&CsiMessage::Ok).await.unwrap_err();
        assert!(matches!(err, CsiError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn malformed_request_is_invalid_argument() {
        let tmp = tempfile::tempdir().unwrap();
        let client = start(tmp.path());

        let mut stream = UnixStream::connect(client.socket_path()).await.unwrap();
        stream.write_all(b"{not json").await.unwrap();
        stream.shutdown().await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();

        let resp: CsiMessage = serde_json::from_slice(&buf).unwrap();
        assert!(matches!(
            resp,
            CsiMessage::Error(Status {
                code: Code::InvalidArgument,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn oversized_request_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let client = start(tmp.path());

        let mut stream = UnixStream::connect(client.socket_path()).await.unwrap();
        let payload = vec![b' '; MAX_MESSAGE_SIZE as usize + 1];
        stream.write_all(&payload).await.unwrap();
        stream.shutdown().await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();

        let resp: CsiMessage = serde_json::from_slice(&buf).unwrap();
        let CsiMessage::Error(status) = resp else {
            panic!("expected error, got {resp}");
        };
        assert_eq!(status.code, Code::InvalidArgument);
        assert_eq!(
            status.message,
            format!("request exceeds {MAX_MESSAGE_SIZE} bytes")
        );
    }

    #[tokio::test]
    async fn bind_replaces_stale_socket_file() {
        let tmp = tempfile::tempdir().unwrap();
        let socket = tmp.path().join("csi.sock");
        std::fs::write(&socket, b"stale").unwrap();

        let server = CsiServer::bind(&socket, Arc::new(EchoPlugin)).expect("bind");
        assert_eq!(server.socket_path(), socket.as_path());
    }
}
