//! Local Unix-socket transport for CSI messages.
//!
//! This module provides [`CsiClient`] and [`CsiServer`] that exchange
//! JSON-encoded [`CsiMessage`] values over a Unix domain socket.  A
//! connection carries one request and one response; each side signals the
//! end of its message by shutting down its write half.
//!
//! [`CsiClient`]: client::CsiClient
//! [`CsiServer`]: server::CsiServer
//! [`CsiMessage`]: crate::message::CsiMessage

pub mod client;
pub mod server;

/// Upper bound on a single encoded message.
pub const MAX_MESSAGE_SIZE: u64 = 4 * 1024 * 1024;
