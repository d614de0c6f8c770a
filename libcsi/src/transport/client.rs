//! Unix-socket client used by the orchestrator side to issue CSI requests.

use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::{debug, instrument};

use crate::error::CsiError;
use crate::message::CsiMessage;
use crate::transport::MAX_MESSAGE_SIZE;

/// A lightweight CSI client that sends [`CsiMessage`] requests to a plugin
/// socket and returns the plugin's response.
#[derive(Debug, Clone)]
pub struct CsiClient {
    socket_path: PathBuf,
}

impl CsiClient {
    /// Create a client for the plugin listening at `socket_path`.
    ///
    /// No connection is made until the first request.
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    /// Path of the plugin socket.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send a request and wait for the corresponding response.
    ///
    /// Each call opens a new connection, writes the JSON-serialized request,
    /// shuts down the write half, then reads the full response.
    #[instrument(skip(self), fields(msg = %msg))]
    pub async fn request(&self, msg: &CsiMessage) -> Result<CsiMessage, CsiError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| {
                CsiError::Transport(format!(
                    "connect {}: {e}",
                    self.socket_path.display()
                ))
            })?;

        let payload = serde_json::to_vec(msg).map_err(CsiError::internal)?;
        stream
            .write_all(&payload)
            .await
            .map_err(CsiError::transport)?;
        stream.shutdown().await.map_err(CsiError::transport)?;

        let mut buf = Vec::new();
        (&mut stream)
            .take(MAX_MESSAGE_SIZE)
            .read_to_end(&mut buf)
            .await
            .map_err(CsiError::transport)?;

        let response: CsiMessage = serde_json::from_slice(&buf).map_err(CsiError::transport)?;
        debug!(%response, "CSI response received");
        Ok(response)
    }

    /// Send a request and turn a [`CsiMessage::Error`] reply into `Err`.
    pub async fn call(&self, msg: &CsiMessage) -> Result<CsiMessage, CsiError> {
        match self.request(msg).await? {
            CsiMessage::Error(status) => Err(status.into()),
            other => Ok(other),
        }
    }
}
