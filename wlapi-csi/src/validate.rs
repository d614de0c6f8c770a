//! Request validation for the node service.
//!
//! Validation runs before anything touches the filesystem.  Each request
//! kind has an ordered table of rules; the first rule that does not hold
//! decides the rejection, so the order below is part of the contract.

use libcsi::{CsiError, NodePublishVolumeRequest, NodeUnpublishVolumeRequest};
use thiserror::Error;

use crate::capability::{is_ephemeral, is_plain_mount, is_read_only_access_mode};

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("request missing required volume id")]
    MissingVolumeId,
    #[error("request missing required target path")]
    MissingTargetPath,
    #[error("request missing required volume capability")]
    MissingVolumeCapability,
    #[error("request missing required volume capability access type")]
    MissingAccessType,
    #[error("request volume capability access type must be mount")]
    AccessTypeNotPlainMount,
    #[error("request missing required volume capability access mode")]
    MissingAccessMode,
    #[error("request volume capability access mode must not be read-only")]
    ReadOnlyAccessMode,
    #[error("only ephemeral volumes are supported")]
    NotEphemeral,
}

impl From<Rejection> for CsiError {
    fn from(rejection: Rejection) -> Self {
        CsiError::InvalidArgument(rejection.to_string())
    }
}

/// A named precondition: `holds` must return `true` for the request to pass.
struct Rule<R> {
    rejection: Rejection,
    holds: fn(&R) -> bool,
}

const PUBLISH_RULES: &[Rule<NodePublishVolumeRequest>] = &[
    Rule {
        rejection: Rejection::MissingVolumeId,
        holds: |r| !r.volume_id.is_empty(),
    },
    Rule {
        rejection: Rejection::MissingTargetPath,
        holds: |r| !r.target_path.is_empty(),
    },
    Rule {
        rejection: Rejection::MissingVolumeCapability,
        holds: |r| r.volume_capability.is_some(),
    },
    Rule {
        rejection: Rejection::MissingAccessType,
        holds: |r| {
            r.volume_capability
                .as_ref()
                .is_some_and(|c| c.access_type.is_some())
        },
    },
    Rule {
        rejection: Rejection::AccessTypeNotPlainMount,
        holds: |r| r.volume_capability.as_ref().is_some_and(is_plain_mount),
    },
    Rule {
        rejection: Rejection::MissingAccessMode,
        holds: |r| {
            r.volume_capability
                .as_ref()
                .is_some_and(|c| c.access_mode.is_some())
        },
    },
    Rule {
        rejection: Rejection::ReadOnlyAccessMode,
        holds: |r| {
            r.volume_capability
                .as_ref()
                .and_then(|c| c.access_mode)
                .is_some_and(|mode| !is_read_only_access_mode(mode))
        },
    },
    Rule {
        rejection: Rejection::NotEphemeral,
        holds: |r| is_ephemeral(&r.volume_context),
    },
];

const UNPUBLISH_RULES: &[Rule<NodeUnpublishVolumeRequest>] = &[
    Rule {
        rejection: Rejection::MissingVolumeId,
        holds: |r| !r.volume_id.is_empty(),
    },
    Rule {
        rejection: Rejection::MissingTargetPath,
        holds: |r| !r.target_path.is_empty(),
    },
];

fn check<R>(rules: &[Rule<R>], req: &R) -> Result<(), Rejection> {
    match rules.iter().find(|rule| !(rule.holds)(req)) {
        Some(rule) => Err(rule.rejection),
        None => Ok(()),
    }
}

/// Accept a publish request only if it asks for an ephemeral, plain-mount,
/// non-read-only volume with both identifiers set.
pub fn validate_publish(req: &NodePublishVolumeRequest) -> Result<(), Rejection> {
    check(PUBLISH_RULES, req)
}

/// Accept an unpublish request when both identifiers are set.
pub fn validate_unpublish(req: &NodeUnpublishVolumeRequest) -> Result<(), Rejection> {
    check(UNPUBLISH_RULES, req)
}
