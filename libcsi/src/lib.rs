//! # libcsi — Simplified CSI node service over a local socket
//!
//! `libcsi` implements a lightweight [Container Storage Interface][csi] layer
//! for node-only plugins.  Requests and responses are JSON-encoded
//! [`CsiMessage`] values exchanged over a Unix domain socket, and follow the
//! RK8s conventions (Tokio async runtime, `tracing` for observability,
//! `thiserror` for structured errors).
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`types`] | Core data model: capabilities, node requests, plugin/node info. |
//! | [`error`] | [`CsiError`] taxonomy and its wire form, [`Status`]. |
//! | [`message`] | [`CsiMessage`] protocol envelope. |
//! | [`identity`] | [`CsiIdentity`] trait — plugin discovery & health. |
//! | [`node`] | [`CsiNode`] trait — publish, unpublish, node info. |
//! | [`transport`] | Unix-socket client/server. |
//!
//! [csi]: https://github.com/container-storage-interface/spec

pub mod error;
pub mod identity;
pub mod message;
pub mod node;
pub mod transport;
pub mod types;

// Re-export the most commonly used items at crate root for convenience.
pub use error::{Code, CsiError, Status};
pub use identity::CsiIdentity;
pub use message::CsiMessage;
pub use node::CsiNode;
pub use types::*;
