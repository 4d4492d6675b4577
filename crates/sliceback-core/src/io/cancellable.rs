//! A reader wrapper that observes a [`CancellationToken`] at block
//! boundaries, mirroring how [`super::counting::CountingWriter`] tracks
//! bytes rather than bytes-per-se.

use std::io;
use std::io::Read;

use crate::cancellation::CancellationToken;

/// Number of blocks copied between cancellation checks (~400 KiB at the
/// 8 KiB block size used throughout this crate).
const CHECK_EVERY_N_BLOCKS: u32 = 50;

/// Sentinel wrapped in the `io::Error` a [`CancellableReader`] returns
/// when it observes cancellation, so callers can distinguish "the run
/// was cancelled" from "the underlying reader actually failed".
#[derive(Debug)]
struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Returns whether `err` originated from a [`CancellableReader`] that
/// observed cancellation, as opposed to a genuine I/O failure.
#[must_use]
pub fn is_cancellation(err: &io::Error) -> bool {
    err.get_ref()
        .is_some_and(|inner| inner.downcast_ref::<Cancelled>().is_some())
}

/// Wraps a reader, checking `cancel` every [`CHECK_EVERY_N_BLOCKS`] reads
/// and failing with a cancellation-tagged `io::Error` instead of
/// returning further bytes once cancellation is observed.
pub struct CancellableReader<'a, R> {
    inner: R,
    cancel: &'a CancellationToken,
    blocks_since_check: u32,
}

impl<'a, R> CancellableReader<'a, R> {
    /// Wraps `inner`, checking `cancel` every [`CHECK_EVERY_N_BLOCKS`] reads.
    pub fn new(inner: R, cancel: &'a CancellationToken) -> Self {
        Self {
            inner,
            cancel,
            blocks_since_check: 0,
        }
    }
}

impl<R: Read> Read for CancellableReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.blocks_since_check += 1;
        if self.blocks_since_check >= CHECK_EVERY_N_BLOCKS {
            self.blocks_since_check = 0;
            if self.cancel.is_cancelled() {
                return Err(io::Error::new(io::ErrorKind::Interrupted, Cancelled));
            }
        }
        self.inner.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::io::Read;

    use super::*;

    #[test]
    fn passes_bytes_through_when_not_cancelled() {
        let cancel = CancellationToken::new();
        let data = vec![7u8; 32];
        let mut reader = CancellableReader::new(Cursor::new(data.clone()), &cancel);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn stops_after_enough_blocks_once_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let data = vec![0u8; 4096];
        let mut reader = CancellableReader::new(Cursor::new(data), &cancel);
        let mut out = [0u8; 1];
        let mut saw_cancellation = false;
        for _ in 0..CHECK_EVERY_N_BLOCKS + 1 {
            match reader.read(&mut out) {
                Ok(_) => {}
                Err(e) => {
                    assert!(is_cancellation(&e));
                    saw_cancellation = true;
                    break;
                }
            }
        }
        assert!(saw_cancellation);
    }

    #[test]
    fn genuine_io_errors_are_not_mistaken_for_cancellation() {
        let err = io::Error::new(io::ErrorKind::Other, "disk on fire");
        assert!(!is_cancellation(&err));
    }
}
