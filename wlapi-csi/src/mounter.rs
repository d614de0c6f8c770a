//! Bind-mount management for published volumes.
//!
//! [`MountOperator`] turns a validated publish into "directory exists and
//! the Workload API directory is bound read-only onto it", and an unpublish
//! into the exact inverse.  It keeps no state: the mount table is the only
//! record of what has been published.
//!
//! The raw mount syscalls go through the [`Mounter`] trait so the operator
//! can be exercised without `CAP_SYS_ADMIN`.  Directory creation and removal
//! always hit the real filesystem.

use std::path::{Path, PathBuf};

use libcsi::CsiError;
use nix::errno::Errno;
use nix::mount::{MntFlags, MsFlags};
use nix::sys::stat::Mode;
use nix::sys::statvfs::FsFlags;
use tracing::{info, warn};

/// Low-level mount syscalls.
pub trait Mounter: Send + Sync {
    /// `mount(2)` with no filesystem type and no data.
    fn mount(&self, source: Option<&Path>, target: &Path, flags: MsFlags) -> nix::Result<()>;

    /// `umount2(2)`.
    fn umount(&self, target: &Path, flags: MntFlags) -> nix::Result<()>;

    /// Per-mount flags of the mount holding `path` that a read-only remount
    /// of a bind from it must carry over.
    fn inherited_flags(&self, path: &Path) -> nix::Result<MsFlags>;
}

/// Map `statvfs(3)` flags to the `MsFlags` a bind remount has to repeat.
///
/// A bind remount replaces every per-mount flag, so anything not listed
/// again is cleared.  `MS_RDONLY` is not included; the caller adds it.
pub fn inherited_ms_flags(fs: FsFlags) -> MsFlags {
    const MAPPING: &[(FsFlags, MsFlags)] = &[
        (FsFlags::ST_NOSUID, MsFlags::MS_NOSUID),
        (FsFlags::ST_NODEV, MsFlags::MS_NODEV),
        (FsFlags::ST_NOEXEC, MsFlags::MS_NOEXEC),
        (FsFlags::ST_NOATIME, MsFlags::MS_NOATIME),
        (FsFlags::ST_NODIRATIME, MsFlags::MS_NODIRATIME),
        (FsFlags::ST_RELATIME, MsFlags::MS_RELATIME),
    ];
    MAPPING
        .iter()
        .filter(|(st, _)| fs.contains(*st))
        .fold(MsFlags::empty(), |acc, (_, ms)| acc | *ms)
}

/// [`Mounter`] backed by the host's mount syscalls.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMounter;

impl Mounter for SystemMounter {
    fn mount(&self, source: Option<&Path>, target: &Path, flags: MsFlags) -> nix::Result<()> {
        nix::mount::mount(source, target, None::<&str>, flags, None::<&str>)
    }

    fn umount(&self, target: &Path, flags: MntFlags) -> nix::Result<()> {
        nix::mount::umount2(target, flags)
    }

    fn inherited_flags(&self, path: &Path) -> nix::Result<MsFlags> {
        nix::sys::statvfs::statvfs(path).map(|st| inherited_ms_flags(st.flags()))
    }
}

/// Performs the publish / unpublish filesystem transitions.
#[derive(Debug)]
pub struct MountOperator<M = SystemMounter> {
    /// Directory holding the agent's Workload API socket.  Only ever read
    /// through the bind mount.
    source_dir: PathBuf,
    mounter: M,
}

impl MountOperator<SystemMounter> {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self::with_mounter(source_dir, SystemMounter)
    }
}

impl<M: Mounter> MountOperator<M> {
    pub fn with_mounter(source_dir: impl Into<PathBuf>, mounter: M) -> Self {
        Self {
            source_dir: source_dir.into(),
            mounter,
        }
    }

    pub fn mounter(&self) -> &M {
        &self.mounter
    }

    /// Create `target` and bind the source directory onto it read-only.
    ///
    /// An existing `target` directory is reused.  A target that is already
    /// mounted is not detected here; the kernel decides what a second mount
    /// on top of it means.  A directory created before a failed mount is
    /// left in place.
    ///
    /// The read-only remount keeps the source mount's `nosuid`, `nodev`,
    /// `noexec` and atime flags.
    pub fn publish(&self, target: &Path) -> Result<(), CsiError> {
        create_target_dir(target)?;

        let inherited = self
            .mounter
            .inherited_flags(&self.source_dir)
            .map_err(|e| {
                CsiError::Internal(format!(
                    "unable to read mount flags of {:?}: {e}",
                    self.source_dir
                ))
            })?;

        self.mounter
            .mount(
                Some(self.source_dir.as_path()),
                target,
                MsFlags::MS_BIND | MsFlags::MS_RDONLY,
            )
            .map_err(|e| {
                CsiError::Internal(format!(
                    "unable to mount {:?} to {:?}: {e}",
                    self.source_dir, target
                ))
            })?;

        // MS_RDONLY is ignored on the initial bind; it only takes effect on
        // a remount of the bind.
        if let Err(e) = self.mounter.mount(
            None,
            target,
            MsFlags::MS_BIND | MsFlags::MS_REMOUNT | MsFlags::MS_RDONLY | inherited,
        ) {
            if let Err(detach) = self.mounter.umount(target, MntFlags::MNT_DETACH) {
                warn!(
                    target = %target.display(),
                    error = %detach,
                    "unable to detach writable bind mount",
                );
            } else {
                warn!(target = %target.display(), "detached writable bind mount");
            }
            return Err(CsiError::Internal(format!(
                "unable to remount {target:?} read-only: {e}"
            )));
        }

        info!(
            source = %self.source_dir.display(),
            target = %target.display(),
            "workload API directory published",
        );
        Ok(())
    }

    /// Unmount `target` and remove the directory.
    ///
    /// The unmount is neither forced nor lazy.  Unpublishing a path that is
    /// not mounted fails with the kernel's `EINVAL`.
    pub fn unpublish(&self, target: &Path) -> Result<(), CsiError> {
        self.mounter
            .umount(target, MntFlags::empty())
            .map_err(|e| CsiError::Internal(format!("unable to unmount {target:?}: {e}")))?;

        std::fs::remove_dir(target).map_err(|e| {
            CsiError::Internal(format!("unable to remove target path {target:?}: {e}"))
        })?;

        info!(target = %target.display(), "workload API directory unpublished");
        Ok(())
    }
}

/// `mkdir` with mode 0777 (before umask); an existing entry is accepted.
fn create_target_dir(target: &Path) -> Result<(), CsiError> {
    match nix::unistd::mkdir(target, Mode::S_IRWXU | Mode::S_IRWXG | Mode::S_IRWXO) {
        Ok(()) | Err(Errno::EEXIST) => Ok(()),
        Err(e) => Err(CsiError::Internal(format!(
            "unable to create target path {target:?}: {e}"
        ))),
    }
}
