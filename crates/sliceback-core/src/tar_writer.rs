//! A thin, stateful wrapper over a streaming tar encoder, exposing only
//! the lifecycle a slice needs.
//!
//! Rust's borrow checker does not allow a per-entry writer handle to
//! outlive the call that produces it, so the conceptual
//! `prepare_writing`/`write_data`/`done_writing` contract collapses into
//! a single streaming [`TarSliceWriter::add_file_entry`] call per file.

use std::fs::File;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;

use tar::Builder;
use tar::EntryType;
use tar::Header;

use crate::Error;
use crate::Result;
use crate::cancellation::CancellationToken;
use crate::io::CancellableReader;
use crate::io::is_cancellation;
use crate::metadata::EntryMetadata;

/// An open tar stream for one slice.
///
/// `close` is the only operation that writes the end-of-archive marker;
/// it consumes `self` by value so a slice can never be closed twice.
pub struct TarSliceWriter {
    builder: Builder<BufWriter<File>>,
}

/// Computes the archive entry name for `path`: the absolute source path
/// with its leading `/` replaced by `./`.
///
/// This is a literal-path scheme, not a relative/common-prefix one: two
/// include roots with no common ancestor both appear in the same slice
/// rooted at `.`. `suffix` (e.g. a codec's [`extension`](crate::config::Codec::extension))
/// is appended after the path, so a compressed entry's name carries the
/// codec suffix while its header metadata still reflects the original
/// file.
#[must_use]
pub fn archive_name_for(path: &Path, suffix: &str) -> String {
    let rendered = path.to_string_lossy();
    let stripped = rendered.strip_prefix('/').unwrap_or(&rendered);
    format!("./{stripped}{suffix}")
}

fn header_with_metadata(entry_type: EntryType, metadata: &EntryMetadata, size: u64) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_size(size);
    header.set_mode(metadata.mode);
    header.set_uid(metadata.uid);
    header.set_gid(metadata.gid);
    header.set_mtime(metadata.mtime);
    set_gnu_access_and_change_time(&mut header, metadata.atime, metadata.ctime);
    header.set_cksum();
    header
}

/// Encodes `atime`/`ctime` into a GNU-format header's extension fields.
///
/// `tar::Header`'s safe API has no setter for either (only the common
/// `mtime` field is exposed), so this writes the raw octal-ASCII,
/// NUL-terminated 12-byte fields `GnuHeader::as_gnu_mut` exposes —
/// the same numeric encoding the crate's own setters use for `mtime`.
/// A no-op if `header` was not built via `Header::new_gnu`.
fn set_gnu_access_and_change_time(header: &mut Header, atime: u64, ctime: u64) {
    if let Some(gnu) = header.as_gnu_mut() {
        gnu.atime = octal_field(atime);
        gnu.ctime = octal_field(ctime);
    }
}

fn octal_field(value: u64) -> [u8; 12] {
    let text = format!("{value:011o}\0");
    let mut field = [0u8; 12];
    field.copy_from_slice(text.as_bytes());
    field
}

impl TarSliceWriter {
    /// Creates (truncating any existing file) the slice file at `path`
    /// and begins a tar stream on top of it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be created.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            builder: Builder::new(BufWriter::new(file)),
        })
    }

    /// Appends a directory entry (no payload) carrying `metadata`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the write fails.
    pub fn write_dir(&mut self, archive_path: &str, metadata: &EntryMetadata) -> Result<()> {
        let mut header = header_with_metadata(EntryType::Directory, metadata, 0);
        self.builder
            .append_data(&mut header, archive_path, std::io::empty())?;
        Ok(())
    }

    /// Appends a symlink entry pointing at `target`, carrying `metadata`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the write fails.
    pub fn write_symlink(
        &mut self,
        archive_path: &str,
        metadata: &EntryMetadata,
        target: &Path,
    ) -> Result<()> {
        let mut header = header_with_metadata(EntryType::Symlink, metadata, 0);
        self.builder.append_link(&mut header, archive_path, target)?;
        Ok(())
    }

    /// Streams `size` bytes from `reader` into a file entry named
    /// `archive_path`, carrying `metadata`. Returns the number of bytes
    /// copied.
    ///
    /// Checked for cancellation via a [`CancellableReader`] wrapped
    /// around `reader`; on cancellation the slice retains a truncated
    /// entry, which the caller is responsible for discarding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if `cancel` trips mid-copy, or
    /// [`Error::Io`] for any other read/write failure.
    pub fn add_file_entry(
        &mut self,
        archive_path: &str,
        metadata: &EntryMetadata,
        size: u64,
        reader: &mut dyn Read,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let mut header = header_with_metadata(EntryType::Regular, metadata, size);
        let mut cancellable = CancellableReader::new(reader, cancel);
        self.builder
            .append_data(&mut header, archive_path, &mut cancellable)
            .map_err(|e| if is_cancellation(&e) { Error::Cancelled } else { Error::Io(e) })?;
        Ok(size)
    }

    /// Flushes the underlying file, without finalizing the tar stream.
    ///
    /// Used by the Slice Lifecycle Manager before re-stating the slice's
    /// on-disk size, so the stat reflects bytes that are actually
    /// visible to the filesystem rather than sitting in this writer's
    /// internal buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the flush fails.
    pub fn flush(&mut self) -> Result<()> {
        self.builder.get_mut().flush()?;
        Ok(())
    }

    /// Finalizes the tar stream (writes the two 512-byte zero-block
    /// terminator) and flushes the underlying file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if finalizing or flushing fails.
    pub fn close(mut self) -> Result<()> {
        self.builder.finish()?;
        self.builder.get_mut().flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tempfile::tempdir;

    use super::*;

    fn sample_metadata() -> EntryMetadata {
        EntryMetadata {
            mode: 0o644,
            uid: 1000,
            gid: 1000,
            mtime: 1_700_000_000,
            atime: 1_700_000_100,
            ctime: 1_700_000_200,
        }
    }

    #[test]
    fn archive_name_replaces_leading_slash() {
        assert_eq!(
            archive_name_for(Path::new("/home/user/file.txt"), ""),
            "./home/user/file.txt"
        );
        assert_eq!(
            archive_name_for(Path::new("/home/user/file.txt"), ".bz2"),
            "./home/user/file.txt.bz2"
        );
    }

    #[test]
    fn writes_a_readable_tar_stream() {
        let dir = tempdir().unwrap();
        let slice_path = dir.path().join("run.001.tar");
        let cancel = CancellationToken::new();

        let mut writer = TarSliceWriter::open(&slice_path).unwrap();
        writer
            .write_dir("./home/user", &sample_metadata())
            .unwrap();
        let mut data = Cursor::new(b"hello".to_vec());
        writer
            .add_file_entry("./home/user/a.txt", &sample_metadata(), 5, &mut data, &cancel)
            .unwrap();
        writer.close().unwrap();

        let file = File::open(&slice_path).unwrap();
        let mut archive = tar::Archive::new(file);
        let entries: Vec<_> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_path_buf())
            .collect();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn cancellation_mid_copy_is_reported() {
        let dir = tempdir().unwrap();
        let slice_path = dir.path().join("run.001.tar");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut writer = TarSliceWriter::open(&slice_path).unwrap();
        let payload = vec![0u8; 8192 * 60];
        let mut data = Cursor::new(payload.clone());
        let result = writer.add_file_entry(
            "./big.bin",
            &sample_metadata(),
            payload.len() as u64,
            &mut data,
            &cancel,
        );
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn header_carries_access_and_change_time() {
        let header = header_with_metadata(EntryType::Regular, &sample_metadata(), 5);
        let gnu = header.as_gnu().unwrap();
        assert_eq!(gnu.atime, octal_field(1_700_000_100));
        assert_eq!(gnu.ctime, octal_field(1_700_000_200));
    }

    #[test]
    fn symlink_entry_round_trips() {
        let dir = tempdir().unwrap();
        let slice_path = dir.path().join("run.001.tar");

        let mut writer = TarSliceWriter::open(&slice_path).unwrap();
        writer
            .write_symlink("./link", &sample_metadata(), Path::new("/target/path"))
            .unwrap();
        writer.close().unwrap();

        let file = File::open(&slice_path).unwrap();
        let mut archive = tar::Archive::new(file);
        let mut entries = archive.entries().unwrap();
        let entry = entries.next().unwrap().unwrap();
        assert_eq!(entry.header().entry_type(), EntryType::Symlink);
    }
}
