//! CSI error types.
//!
//! All errors in the `libcsi` crate are represented by the [`CsiError`] enum,
//! which derives [`thiserror::Error`].  Handlers only ever produce the
//! `InvalidArgument`, `Internal` and `Unimplemented` kinds; `Transport` is
//! raised on the client side when a response never arrives intact.
//!
//! [`Status`] is the wire form of an error: a gRPC-style numeric [`Code`]
//! plus a message.  The conversions in both directions are the only place
//! the service error taxonomy meets the transport.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for CSI operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CsiError {
    /// The caller supplied an invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An operating-system or otherwise unclassified internal failure.
    #[error("internal error: {0}")]
    Internal(String),

    /// The called method is not supported by this plugin.
    #[error("unimplemented: {0}")]
    Unimplemented(String),

    /// A Unix-socket / framing-level error.
    #[error("transport error: {0}")]
    Transport(String),
}

impl CsiError {
    /// Create a [`CsiError::Transport`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn transport<E: std::fmt::Display>(e: E) -> Self {
        Self::Transport(e.to_string())
    }

    /// Create a [`CsiError::Internal`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }

    /// Build the standard "method X not implemented" error.
    pub fn unimplemented(method: &str) -> Self {
        Self::Unimplemented(format!("method {method} not implemented"))
    }

    /// The status code this error is reported with.
    pub const fn code(&self) -> Code {
        match self {
            Self::InvalidArgument(_) => Code::InvalidArgument,
            Self::Internal(_) => Code::Internal,
            Self::Unimplemented(_) => Code::Unimplemented,
            Self::Transport(_) => Code::Unavailable,
        }
    }

    /// The bare message, without the kind prefix added by `Display`.
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidArgument(m)
            | Self::Internal(m)
            | Self::Unimplemented(m)
            | Self::Transport(m) => m,
        }
    }
}

/// gRPC status codes used by the CSI node service.
///
/// The numeric values match the gRPC status code table so that tooling
/// written against real CSI drivers reads them the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", from = "i32")]
pub enum Code {
    /// Client specified an invalid argument.
    InvalidArgument = 3,
    /// Operation is not implemented or not supported.
    Unimplemented = 12,
    /// Internal error.
    Internal = 13,
    /// The service is currently unavailable.
    Unavailable = 14,
    /// Any code this crate does not model.
    Unknown = 2,
}

impl From<i32> for Code {
    fn from(i: i32) -> Self {
        match i {
            3 => Code::InvalidArgument,
            12 => Code::Unimplemented,
            13 => Code::Internal,
            14 => Code::Unavailable,
            _ => Code::Unknown,
        }
    }
}

impl From<Code> for i32 {
    fn from(code: Code) -> i32 {
        code as i32
    }
}

/// Wire representation of a failed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Status code.
    pub code: Code,
    /// Human-readable message.
    pub message: String,
}

impl From<&CsiError> for Status {
    fn from(err: &CsiError) -> Self {
        Self {
            code: err.code(),
            message: err.message().to_owned(),
        }
    }
}

impl From<CsiError> for Status {
    fn from(err: CsiError) -> Self {
        Self::from(&err)
    }
}

impl From<Status> for CsiError {
    fn from(status: Status) -> Self {
        match status.code {
            Code::InvalidArgument => Self::InvalidArgument(status.message),
            Code::Unimplemented => Self::Unimplemented(status.message),
            Code::Internal => Self::Internal(status.message),
            Code::Unavailable | Code::Unknown => Self::Transport(status.message),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "code = {} desc = {}", i32::from(self.code), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CsiError::InvalidArgument("request missing required volume id".into());
        assert_eq!(
            err.to_string(),
            "invalid argument: request missing required volume id"
        );
    }

    #[test]
    fn unimplemented_message() {
        let err = CsiError::unimplemented("NodeStageVolume");
        assert_eq!(err.message(), "method NodeStageVolume not implemented");
        assert_eq!(err.code(), Code::Unimplemented);
    }

    #[test]
    fn status_preserves_kind() {
        let err = CsiError::Internal("unable to unmount \"/mnt/x\": EINVAL".into());
        let status = Status::from(&err);
        assert_eq!(status.code, Code::Internal);
        assert_eq!(CsiError::from(status), err);
    }

    #[test]
    fn status_code_is_numeric_on_the_wire() {
        let status = Status::from(CsiError::InvalidArgument("bad".into()));
        let json = serde_json::to_string(&status).expect("serialize");
        assert_eq!(json, r#"{"code":3,"message":"bad"}"#);
    }

    #[test]
    fn unknown_code_maps_to_transport() {
        let status: Status = serde_json::from_str(r#"{"code":7,"message":"denied"}"#).unwrap();
        assert_eq!(status.code, Code::Unknown);
        assert!(matches!(CsiError::from(status), CsiError::Transport(_)));
    }
}
