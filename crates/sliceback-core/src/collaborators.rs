//! Pluggable collaborators the embedding application supplies: moving a
//! finished slice to its destination, surfacing interactive decisions,
//! and running an external script at slice lifecycle points.
//!
//! This crate defines only the traits; the CLI binary ships one
//! concrete, non-interactive-by-default implementation of each.

use std::path::Path;

use crate::Result;

/// Moves a finished slice to its final (possibly remote) destination.
pub trait Sink {
    /// Uploads the slice at `slice_path` (named `slice_name`).
    ///
    /// # Errors
    ///
    /// Returns an error if the upload fails; the caller decides whether
    /// to retry based on [`Prompter::ask_retry_upload`].
    fn upload(&self, slice_path: &Path, slice_name: &str) -> Result<()>;
}

/// A [`Sink`] that always fails, for callers that never upload (a local
/// target never invokes a `Sink` at all) but still need to supply one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl Sink for NoopSink {
    fn upload(&self, _slice_path: &Path, slice_name: &str) -> Result<()> {
        Err(crate::Error::Upload {
            slice_name: slice_name.to_string(),
            source: std::io::Error::other("no sink configured for a local target"),
        })
    }
}

/// What the operator chose when an upload failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try the upload again.
    Retry,
    /// Leave this slice unuploaded and continue the run.
    Skip,
    /// Cancel the run.
    Cancel,
}

/// What the operator chose when asked to change removable media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaDecision {
    /// Media was changed; continue opening the next slice.
    Continue,
    /// Cancel the run instead.
    Cancel,
}

/// Surfaces yes/no/retry decisions to whatever is driving an
/// interactive run.
pub trait Prompter {
    /// Asks whether a failed upload of `slice_name` should be retried.
    fn ask_retry_upload(&self, slice_name: &str, error: &crate::Error) -> RetryDecision;

    /// Asks the operator to change removable media before opening slice
    /// number `slice_num`.
    fn ask_media_change(&self, slice_num: u32) -> MediaDecision;

    /// Asks whether an existing target should be overwritten.
    fn ask_overwrite_target(&self) -> bool;
}

/// The point in a slice's lifecycle a [`ScriptHook`] is invoked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    /// Just before a new slice is opened.
    SliceInit,
    /// Just after a slice's tar stream is closed, before upload.
    SliceClosed,
    /// After a slice has been successfully uploaded (or, in
    /// non-interactive mode, after an unuploaded skip).
    SliceFinished,
}

/// The outcome of running an external script for a [`HookEvent`].
#[derive(Debug, Clone)]
pub struct HookOutcome {
    /// Whether the subprocess exited successfully.
    pub success: bool,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

/// Runs an external script at defined points in a slice's lifecycle.
///
/// A non-zero exit is advisory: the Slice Lifecycle Manager logs it as
/// an [`Event::Warning`](crate::events::Event::Warning) and continues
/// the run rather than failing it.
pub trait ScriptHook {
    /// Runs the hook for `event`, invoked as
    /// `script <phase> <archive_path> <target> <mount_point_if_local>`.
    ///
    /// `target` is the configured [`crate::config::Target`] rendered as a
    /// single token (a local path, or a remote destination string);
    /// `mount_point` is `Some` only when the target is
    /// [`crate::config::Target::Local`].
    ///
    /// # Errors
    ///
    /// Returns an error only if the subprocess could not be spawned at
    /// all (not for a non-zero exit, which is reported via
    /// [`HookOutcome::success`]).
    fn run(
        &self,
        event: HookEvent,
        archive_path: &Path,
        target: &str,
        mount_point: Option<&Path>,
    ) -> Result<HookOutcome>;
}

/// A [`ScriptHook`] that does nothing, successfully, at every phase.
///
/// Used as the default hook by [`crate::archiver::ArchiveRunBuilder`]
/// when the embedding application has no `slice_script` configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopScriptHook;

impl ScriptHook for NoopScriptHook {
    fn run(
        &self,
        _event: HookEvent,
        _archive_path: &Path,
        _target: &str,
        _mount_point: Option<&Path>,
    ) -> Result<HookOutcome> {
        Ok(HookOutcome {
            success: true,
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}
