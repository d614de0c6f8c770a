//! Predicates over the capability profile this plugin supports.

use std::collections::HashMap;

use libcsi::{AccessMode, VolumeCapability};

/// Volume context key the orchestrator sets for inline ephemeral volumes.
pub const EPHEMERAL_CONTEXT_KEY: &str = "csi.storage.k8s.io/ephemeral";

/// `true` when the capability is a `mount` with no fs type and no flags.
///
/// Block access, and any attempt to pass a filesystem type or custom mount
/// flags through to the bind mount, is not a plain mount.
pub fn is_plain_mount(capability: &VolumeCapability) -> bool {
    match capability.mount() {
        None => false,
        Some(mount) => mount.fs_type.is_empty() && mount.mount_flags.is_empty(),
    }
}

pub fn is_read_only_access_mode(mode: AccessMode) -> bool {
    mode == AccessMode::SingleNodeReaderOnly
}

/// `true` only when the ephemeral marker is present and exactly `"true"`.
pub fn is_ephemeral(volume_context: &HashMap<String, String>) -> bool {
    volume_context
        .get(EPHEMERAL_CONTEXT_KEY)
        .is_some_and(|v| v == "true")
}

#[cfg(test)]
mod tests {
    use libcsi::{AccessType, MountVolume};

    use super::*;

    fn mount_capability(fs_type: &str, flags: &[&str]) -> VolumeCapability {
        VolumeCapability {
            access_type: Some(AccessType::Mount(MountVolume {
                fs_type: fs_type.to_owned(),
                mount_flags: flags.iter().map(|f| (*f).to_owned()).collect(),
            })),
            access_mode: Some(AccessMode::SingleNodeWriter),
        }
    }

    #[test]
    fn plain_mount_only() {
        assert!(is_plain_mount(&mount_capability("", &[])));
        assert!(!is_plain_mount(&mount_capability("ext4", &[])));
        assert!(!is_plain_mount(&mount_capability("", &["noexec"])));
        assert!(!is_plain_mount(&VolumeCapability {
            access_type: Some(AccessType::Block),
            access_mode: Some(AccessMode::SingleNodeWriter),
        }));
        assert!(!is_plain_mount(&VolumeCapability::default()));
    }

    #[test]
    fn only_single_node_reader_is_read_only() {
        assert!(is_read_only_access_mode(AccessMode::SingleNodeReaderOnly));
        assert!(!is_read_only_access_mode(AccessMode::SingleNodeWriter));
        assert!(!is_read_only_access_mode(AccessMode::MultiNodeReaderOnly));
        assert!(!is_read_only_access_mode(AccessMode::SingleNodeMultiWriter));
    }

    #[test]
    fn ephemeral_marker_must_be_exactly_true() {
        let ctx = |v: &str| HashMap::from([(EPHEMERAL_CONTEXT_KEY.to_owned(), v.to_owned())]);
        assert!(is_ephemeral(&ctx("true")));
        assert!(!is_ephemeral(&ctx("True")));
        assert!(!is_ephemeral(&ctx("false")));
        assert!(!is_ephemeral(&ctx("")));
        assert!(!is_ephemeral(&HashMap::new()));
    }
}
