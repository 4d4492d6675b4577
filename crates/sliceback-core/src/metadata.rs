//! Tar-representable metadata extracted from a source file's `stat()`.
//!
//! The `tar` crate's safe `Header` API only exposes setters for `mtime`,
//! `uid`, `gid`, and `mode`; `atime`/`ctime` are GNU-format extension
//! fields reachable only through `Header::as_gnu_mut`'s raw byte arrays.
//! This module extracts all six from `stat()`; the Tar Slice Writer is
//! the one that encodes `atime`/`ctime` into those raw fields.

/// Permission bits, owner, group, and the three `stat()` timestamps
/// taken from a source file's metadata, applied to a tar entry
/// regardless of whether that entry's payload ends up compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Unix permission bits (e.g. `0o644`).
    pub mode: u32,
    /// Numeric user ID.
    pub uid: u64,
    /// Numeric group ID.
    pub gid: u64,
    /// Modification time, seconds since the Unix epoch.
    pub mtime: u64,
    /// Access time, seconds since the Unix epoch.
    pub atime: u64,
    /// Change time (last inode metadata change), seconds since the
    /// Unix epoch.
    pub ctime: u64,
}

impl EntryMetadata {
    /// Extracts tar-representable metadata from `metadata`.
    #[must_use]
    pub fn from_std(metadata: &std::fs::Metadata) -> Self {
        from_std_impl(metadata)
    }
}

#[cfg(unix)]
fn from_std_impl(metadata: &std::fs::Metadata) -> EntryMetadata {
    use std::os::unix::fs::MetadataExt;

    // atime/ctime/mtime can be negative for dates before the epoch;
    // clamp to 0 rather than wrapping into a huge unsigned value.
    #[allow(clippy::cast_sign_loss)]
    EntryMetadata {
        mode: metadata.mode(),
        uid: u64::from(metadata.uid()),
        gid: u64::from(metadata.gid()),
        mtime: metadata.mtime().max(0) as u64,
        atime: metadata.atime().max(0) as u64,
        ctime: metadata.ctime().max(0) as u64,
    }
}

#[cfg(not(unix))]
fn from_std_impl(metadata: &std::fs::Metadata) -> EntryMetadata {
    let mode = if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    };
    let mtime = metadata
        .modified()
        .ok()
        .and_then(|modified| modified.duration_since(std::time::UNIX_EPOCH).ok())
        .map_or(0, |duration| duration.as_secs());

    // Neither access nor change time is exposed by `std::fs::Metadata`
    // outside `cfg(unix)`; fall back to `mtime` for both, the same
    // degradation already applied to owner/group/mode on this platform.
    EntryMetadata {
        mode,
        uid: 0,
        gid: 0,
        mtime,
        atime: mtime,
        ctime: mtime,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_metadata_from_a_real_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let metadata = std::fs::metadata(file.path()).unwrap();
        let entry = EntryMetadata::from_std(&metadata);
        assert!(entry.mode > 0);
    }

    #[test]
    fn atime_and_ctime_are_populated() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let metadata = std::fs::metadata(file.path()).unwrap();
        let entry = EntryMetadata::from_std(&metadata);
        // A freshly created file's atime/ctime are at or after the Unix
        // epoch; the main thing under test is that these fields are no
        // longer always zero/absent.
        assert!(entry.atime > 0);
        assert!(entry.ctime > 0);
    }
}
