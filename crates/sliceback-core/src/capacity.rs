//! Filesystem capacity probing.
//!
//! Computes how many bytes may still be written to the filesystem backing
//! a slice's target directory, and the effective budget a slice may spend
//! given the run's configured [`SliceLimit`](crate::config::SliceLimit).

use std::path::Path;

use nix::sys::statvfs::statvfs;

use crate::Error;
use crate::Result;
use crate::config::SliceLimit;

/// Capacity and free space of the filesystem containing a given path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskUsage {
    /// Total size of the filesystem, in bytes.
    pub capacity_bytes: u64,
    /// Bytes available to the current (non-root) user.
    pub free_bytes: u64,
}

/// Queries the filesystem containing `path` for total capacity and free
/// space available to the current user.
///
/// Mirrors the original implementation's raw `statvfs()` call: capacity is
/// `f_blocks * f_frsize`, and free space is `f_bavail * f_frsize` (the
/// space available to an unprivileged user, not `f_bfree`, which includes
/// blocks reserved for the superuser).
///
/// # Errors
///
/// Returns [`Error::CapacityProbe`] if the underlying `statvfs(2)` call
/// fails (e.g. the path does not exist).
pub fn free_space(path: &Path) -> Result<DiskUsage> {
    let stats = statvfs(path).map_err(|errno| Error::CapacityProbe {
        path: path.to_path_buf(),
        source: std::io::Error::from(errno),
    })?;

    let block_size = stats.block_size();
    let capacity_bytes = stats.blocks() * block_size;
    let free_bytes = stats.blocks_available() * block_size;

    Ok(DiskUsage {
        capacity_bytes,
        free_bytes,
    })
}

/// Returns the number of bytes the next slice may spend, given the
/// configured [`SliceLimit`] and the filesystem's current free space.
///
/// `target_is_remote` applies the 90% scratch-space discount described by
/// the original spec: when the destination is remote, slices are staged on
/// a local scratch filesystem that the operator may also be using for
/// other things, so only nine tenths of its free space is ever offered to
/// a slice. A local target gets the full free space.
///
/// `Unlimited` yields that (possibly discounted) free space; `Megabytes(n)`
/// yields `min(n megabytes, discounted free space)`, so a generous
/// configured limit never overstates what the filesystem can actually
/// hold.
#[must_use]
pub fn effective_capacity(limit: SliceLimit, usage: DiskUsage, target_is_remote: bool) -> u64 {
    let available = if target_is_remote {
        usage.free_bytes / 10 * 9
    } else {
        usage.free_bytes
    };
    match limit {
        SliceLimit::Unlimited => available,
        SliceLimit::Megabytes(mb) => {
            let configured = u64::from(mb) * 1024 * 1024;
            configured.min(available)
        }
    }
}
