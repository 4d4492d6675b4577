//! Progress and diagnostic events emitted by a running backup.
//!
//! This crate has no logging dependency (none of the corpus this engine
//! is grounded on pulls in `log`/`tracing` either); instead, a run emits
//! [`Event`] values through whatever [`EventSink`] the caller supplies.

use std::path::PathBuf;

/// Something happened during a run that the caller might want to show.
#[derive(Debug, Clone)]
pub enum Event {
    /// An informational message, typically captured stdout from a
    /// [`ScriptHook`](crate::collaborators::ScriptHook).
    Logging(String),
    /// A recoverable problem: a file was skipped, an upload was retried,
    /// a hook exited non-zero. The run continues.
    Warning(String),
    /// Progress on the file currently being added: bytes copied so far
    /// out of its known total (compressed or raw, whichever applies).
    FileProgress {
        /// The source path being added.
        path: PathBuf,
        /// Bytes streamed into the current slice so far.
        bytes_done: u64,
        /// Total bytes this entry will contribute.
        bytes_total: u64,
    },
    /// The current slice's on-disk size changed after an entry was
    /// written and re-stated.
    SliceProgress {
        /// 1-based slice number.
        slice_num: u32,
        /// Bytes written to the slice so far.
        bytes_written: u64,
    },
    /// A new slice was opened.
    NewSlice {
        /// 1-based slice number.
        slice_num: u32,
        /// The slice's filename.
        archive_name: String,
    },
    /// The run's cumulative byte total changed.
    TotalBytesChanged(u64),
    /// The run's cumulative file count changed.
    TotalFilesChanged(u64),
    /// The effective capacity computed for the slice about to be opened.
    TargetCapacity(u64),
}

/// Receives [`Event`]s as a run progresses.
///
/// Delivered in order, to a single subscriber; the Archiver Controller
/// never buffers more than one event ahead of the sink.
pub trait EventSink {
    /// Handles one emitted event.
    fn emit(&mut self, event: Event);
}

impl EventSink for std::sync::mpsc::Sender<Event> {
    fn emit(&mut self, event: Event) {
        // The receiving end may have been dropped (e.g. a caller that
        // only wants the final `RunReport`); that is not a run failure.
        let _ = self.send(event);
    }
}

/// An [`EventSink`] that discards every event.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: Event) {}
}
