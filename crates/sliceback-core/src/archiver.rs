//! The top-level state machine: coordinates traversal, slice rotation,
//! per-file compression, and cancellation, and is the crate's public
//! entry point.

use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;

use tempfile::NamedTempFile;

use crate::Error;
use crate::Result;
use crate::cancellation::CancellationToken;
use crate::capacity::effective_capacity;
use crate::capacity::free_space;
use crate::collaborators::Prompter;
use crate::collaborators::ScriptHook;
use crate::collaborators::Sink;
use crate::compressor;
use crate::config::Codec;
use crate::config::Config;
use crate::events::Event;
use crate::events::EventSink;
use crate::events::NullSink;
use crate::metadata::EntryMetadata;
use crate::slice::SliceLifecycleManager;
use crate::slice::resolve_file_prefix;
use crate::tar_writer::TarSliceWriter;
use crate::tar_writer::archive_name_for;
use crate::traversal;
use crate::traversal::EntryType as WalkEntryType;
use crate::traversal::ExcludeSet;

/// How a completed or aborted run concluded.
///
/// Fatal I/O failures that leave a slice corrupt are not represented
/// here: they propagate as `Err(Error)` from [`ArchiverController::run`]
/// instead of a `RunOutcome` variant, since `Error` wraps non-`Clone`
/// I/O errors and `Result` already exists to carry them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every included, non-excluded, non-oversize file was archived.
    Completed,
    /// The run completed, but at least one file was skipped (unreadable
    /// or larger than any slice could ever hold).
    CompletedWithSkips,
    /// The run was cancelled; the in-progress slice was deleted.
    Cancelled,
}

/// A file that did not make it into any slice, and why.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    /// The source path that was skipped.
    pub path: PathBuf,
    /// Human-readable reason (surfaced to the operator as a warning too).
    pub reason: String,
}

/// Summary of one completed (or cancelled) run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// How the run concluded.
    pub outcome: RunOutcome,
    /// Cumulative payload bytes archived across all slices.
    pub total_bytes: u64,
    /// Cumulative archived-entry count (files; directories and symlinks
    /// do not count toward this total).
    pub total_files: u64,
    /// Files that were not archived.
    pub skipped_files: Vec<SkippedFile>,
    /// Number of slices opened during the run (including a cancelled
    /// run's final, discarded slice).
    pub slices_written: u32,
}

/// Picks the codec to use for this run from `config`'s preference list.
///
/// The original spec describes this as a dynamic, environment-probed
/// selection ("derived at run start from what the environment offers");
/// since `bzip2` and `flate2` are both always linked by this crate, the
/// selection degenerates to "the first entry of the preference list", or
/// [`Codec::None`] if `compress_files` is off or the list is empty.
fn select_codec(config: &Config) -> Codec {
    if !config.compress_files {
        return Codec::None;
    }
    config
        .compression_preference
        .first()
        .copied()
        .unwrap_or(Codec::None)
}

/// Coordinates one full run of the archiving engine: traversal, slicing,
/// per-file compression, and cancellation.
///
/// Owns only the run's [`Config`] and its [`CancellationToken`]; the
/// mutable run state (slice bookkeeping) lives in the
/// [`SliceLifecycleManager`] created fresh inside [`Self::run`], so a
/// single controller can be reused to start another run once the
/// previous one has returned.
pub struct ArchiverController {
    config: Config,
    cancel: CancellationToken,
}

impl ArchiverController {
    /// Creates a controller for `config`, with a fresh cancellation token.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Returns a cheaply-cloneable handle that can cancel this
    /// controller's in-progress run from any thread.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Requests cancellation of the in-progress run.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Runs the archiver: validates `config`, resolves `includes` and
    /// `excludes` to absolute paths (relative roots against the current
    /// working directory, trailing separators and `.`/`..` components
    /// stripped — see [`traversal::absolutize`]), walks `includes`
    /// (skipping `excludes`), and writes every selected entry into one
    /// or more slices.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `config` fails
    /// validation or `includes` is empty, or any other [`Error`] variant
    /// that implies a slice was left corrupt (write failure, capacity
    /// probe failure) — these are not recoverable mid-run and abort the
    /// entire run rather than being recorded as a skip.
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &self,
        includes: &[PathBuf],
        excludes: &ExcludeSet,
        hook: &dyn ScriptHook,
        sink: Option<&dyn Sink>,
        prompter: Option<&dyn Prompter>,
        events: &mut dyn EventSink,
    ) -> Result<RunReport> {
        self.config.validate()?;
        if includes.is_empty() {
            return Err(Error::InvalidConfiguration {
                reason: "no include paths configured".to_string(),
            });
        }

        let includes = includes
            .iter()
            .map(|path| traversal::absolutize(path))
            .collect::<Result<Vec<_>>>()?;
        let excludes = excludes.resolved()?;

        let codec = select_codec(&self.config);
        let base_name = self.config.target.local_dir().to_path_buf();
        std::fs::create_dir_all(&base_name)?;
        let file_prefix = resolve_file_prefix(&self.config.file_prefix, SystemTime::now());

        let mut manager = SliceLifecycleManager::new(base_name.clone(), file_prefix);
        let mut writer = manager.open_next_slice(&self.config, hook, prompter, events)?;
        let mut slices_written = 1u32;

        let mut total_bytes = 0u64;
        let mut total_files = 0u64;
        let mut skipped_files = Vec::new();

        for entry in traversal::walk(&includes, &excludes) {
            if self.cancel.is_cancelled() {
                return Ok(self.abandon(manager, writer, total_bytes, total_files, skipped_files));
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    events.emit(Event::Warning(format!("skipped unreadable entry: {err}")));
                    skipped_files.push(SkippedFile {
                        path: PathBuf::new(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            if entry.path == manager.current_path() {
                continue;
            }

            match entry.entry_type {
                WalkEntryType::Directory => {
                    let archive_path = archive_name_for(&entry.path, "");
                    writer.write_dir(&archive_path, &entry.metadata)?;
                }
                WalkEntryType::Symlink(target) => {
                    if manager.rotate_if_needed(0) {
                        let rotated = self.rotate(&mut manager, writer, hook, sink, prompter, events)?;
                        let Some(next) = rotated else {
                            return Ok(self.finish_cancelled(
                                slices_written,
                                total_bytes,
                                total_files,
                                skipped_files,
                            ));
                        };
                        writer = next;
                        slices_written += 1;
                    }
                    let archive_path = archive_name_for(&entry.path, "");
                    writer.write_symlink(&archive_path, &entry.metadata, &target)?;
                    manager.refresh_slice_bytes_from_disk(&mut writer, events)?;
                }
                WalkEntryType::File => {
                    let (next_writer, outcome) = self.add_file(
                        &entry.path,
                        &entry.metadata,
                        codec,
                        &base_name,
                        &mut manager,
                        writer,
                        hook,
                        sink,
                        prompter,
                        events,
                        &mut slices_written,
                    )?;
                    writer = next_writer;
                    match outcome {
                        FileOutcome::Added { bytes } => {
                            total_bytes += bytes;
                            total_files += 1;
                            events.emit(Event::TotalBytesChanged(total_bytes));
                            events.emit(Event::TotalFilesChanged(total_files));
                        }
                        FileOutcome::Skipped(reason) => {
                            events.emit(Event::Warning(format!(
                                "skipped {}: {reason}",
                                entry.path.display()
                            )));
                            skipped_files.push(SkippedFile {
                                path: entry.path.clone(),
                                reason,
                            });
                        }
                        FileOutcome::CancelledMidStream => {
                            return Ok(self.abandon(manager, writer, total_bytes, total_files, skipped_files));
                        }
                        FileOutcome::CancelledDuringRotation => {
                            return Ok(self.finish_cancelled(
                                slices_written,
                                total_bytes,
                                total_files,
                                skipped_files,
                            ));
                        }
                    }
                }
            }
        }

        let close = manager.close_current_slice(writer, &self.config, hook, sink, prompter, events)?;
        if close.cancelled {
            return Ok(RunReport {
                outcome: RunOutcome::Cancelled,
                total_bytes,
                total_files,
                skipped_files,
                slices_written,
            });
        }

        let outcome = if skipped_files.is_empty() {
            RunOutcome::Completed
        } else {
            RunOutcome::CompletedWithSkips
        };
        Ok(RunReport {
            outcome,
            total_bytes,
            total_files,
            skipped_files,
            slices_written,
        })
    }

    /// Deletes the currently open (and therefore incomplete) slice and
    /// returns a `Cancelled` report. The slice file is removed without
    /// running `slice_closed`/`slice_finished` or uploading — a
    /// cancelled run's in-progress slice is discarded outright, never
    /// handed to the Sink.
    fn abandon(
        &self,
        manager: SliceLifecycleManager,
        writer: TarSliceWriter,
        total_bytes: u64,
        total_files: u64,
        skipped_files: Vec<SkippedFile>,
    ) -> RunReport {
        let path = manager.current_path();
        drop(writer);
        let _ = std::fs::remove_file(path);
        RunReport {
            outcome: RunOutcome::Cancelled,
            total_bytes,
            total_files,
            skipped_files,
            slices_written: manager.slice_num(),
        }
    }

    fn finish_cancelled(
        &self,
        slices_written: u32,
        total_bytes: u64,
        total_files: u64,
        skipped_files: Vec<SkippedFile>,
    ) -> RunReport {
        RunReport {
            outcome: RunOutcome::Cancelled,
            total_bytes,
            total_files,
            skipped_files,
            slices_written,
        }
    }

    /// Closes the current slice and opens the next one, emitting
    /// `SliceProgress(100)` for the slice being closed first.
    ///
    /// Returns `Ok(None)` if the operator cancelled the run while being
    /// prompted for a failed upload retry.
    fn rotate(
        &self,
        manager: &mut SliceLifecycleManager,
        writer: TarSliceWriter,
        hook: &dyn ScriptHook,
        sink: Option<&dyn Sink>,
        prompter: Option<&dyn Prompter>,
        events: &mut dyn EventSink,
    ) -> Result<Option<TarSliceWriter>> {
        events.emit(Event::SliceProgress {
            slice_num: manager.slice_num(),
            bytes_written: manager.slice_capacity(),
        });
        let close = manager.close_current_slice(writer, &self.config, hook, sink, prompter, events)?;
        if close.cancelled {
            return Ok(None);
        }
        let next = manager.open_next_slice(&self.config, hook, prompter, events)?;
        Ok(Some(next))
    }

    /// Adds one regular file to the current slice, rotating first if
    /// necessary. Dispatches to the raw or compressed path per
    /// `self.config.compress_files`.
    #[allow(clippy::too_many_arguments)]
    fn add_file(
        &self,
        path: &Path,
        metadata: &EntryMetadata,
        codec: Codec,
        base_name: &Path,
        manager: &mut SliceLifecycleManager,
        mut writer: TarSliceWriter,
        hook: &dyn ScriptHook,
        sink: Option<&dyn Sink>,
        prompter: Option<&dyn Prompter>,
        events: &mut dyn EventSink,
        slices_written: &mut u32,
    ) -> Result<(TarSliceWriter, FileOutcome)> {
        if codec == Codec::None {
            let Ok(file_metadata) = std::fs::metadata(path) else {
                return Ok((writer, FileOutcome::Skipped("unreadable".to_string())));
            };
            let size = file_metadata.len();

            let max_capacity = self.max_slice_capacity(base_name)?;
            if max_capacity == 0 {
                return Err(Error::NoCapacity {
                    slice_num: manager.slice_num(),
                    path: path.to_path_buf(),
                });
            }
            if size > max_capacity {
                return Ok((
                    writer,
                    FileOutcome::Skipped("larger than any slice this run could ever open".to_string()),
                ));
            }

            if manager.rotate_if_needed(size) {
                let rotated = self.rotate(manager, writer, hook, sink, prompter, events)?;
                let Some(next) = rotated else {
                    return Ok((placeholder_writer()?, FileOutcome::CancelledDuringRotation));
                };
                writer = next;
                *slices_written += 1;
            }

            let Ok(mut source) = std::fs::File::open(path) else {
                return Ok((writer, FileOutcome::Skipped("unreadable".to_string())));
            };
            let archive_path = archive_name_for(path, "");
            let result = writer.add_file_entry(&archive_path, metadata, size, &mut source, &self.cancel);
            match result {
                Ok(written) => {
                    manager.refresh_slice_bytes_from_disk(&mut writer, events)?;
                    events.emit(Event::FileProgress {
                        path: path.to_path_buf(),
                        bytes_done: written,
                        bytes_total: written,
                    });
                    Ok((writer, FileOutcome::Added { bytes: written }))
                }
                Err(Error::Cancelled) => Ok((writer, FileOutcome::CancelledMidStream)),
                Err(err) => Err(err),
            }
        } else {
            let Ok(mut source) = std::fs::File::open(path) else {
                return Ok((writer, FileOutcome::Skipped("unreadable".to_string())));
            };
            let Ok(mut scratch) = NamedTempFile::new_in(base_name) else {
                return Ok((
                    writer,
                    FileOutcome::Skipped("could not allocate scratch file".to_string()),
                ));
            };

            let compressed = compressor::compress(codec, &mut source, &mut scratch, &self.cancel);
            let compressed_size = match compressed {
                Ok(size) => size,
                Err(Error::Cancelled) => return Ok((writer, FileOutcome::CancelledMidStream)),
                Err(err) => return Err(err),
            };

            let max_capacity = self.max_slice_capacity(base_name)?;
            if max_capacity == 0 {
                return Err(Error::NoCapacity {
                    slice_num: manager.slice_num(),
                    path: path.to_path_buf(),
                });
            }
            if compressed_size > max_capacity {
                return Ok((
                    writer,
                    FileOutcome::Skipped("larger than any slice this run could ever open".to_string()),
                ));
            }

            if manager.rotate_if_needed(compressed_size) {
                let rotated = self.rotate(manager, writer, hook, sink, prompter, events)?;
                let Some(next) = rotated else {
                    return Ok((placeholder_writer()?, FileOutcome::CancelledDuringRotation));
                };
                writer = next;
                *slices_written += 1;
            }

            let mut scratch_file = scratch.reopen()?;
            let archive_path = archive_name_for(path, compressor::extension_for(codec));
            let result = writer.add_file_entry(
                &archive_path,
                metadata,
                compressed_size,
                &mut scratch_file,
                &self.cancel,
            );
            match result {
                Ok(written) => {
                    manager.refresh_slice_bytes_from_disk(&mut writer, events)?;
                    events.emit(Event::FileProgress {
                        path: path.to_path_buf(),
                        bytes_done: written,
                        bytes_total: written,
                    });
                    Ok((writer, FileOutcome::Added { bytes: written }))
                }
                Err(Error::Cancelled) => Ok((writer, FileOutcome::CancelledMidStream)),
                Err(err) => Err(err),
            }
        }
    }

    /// The capacity a freshly-opened, empty slice could ever have right
    /// now — the oversize guard from the original spec's file-add
    /// algorithm, probed against the current free space rather than any
    /// already-open slice's (possibly smaller, already partially spent)
    /// capacity. A result of `0` means no slice could be opened at all,
    /// which the caller reports as [`Error::NoCapacity`] rather than an
    /// oversize skip.
    fn max_slice_capacity(&self, base_name: &Path) -> Result<u64> {
        let usage = free_space(base_name)?;
        Ok(effective_capacity(self.config.max_slice_size, usage, self.config.target.is_remote()))
    }
}

/// A throwaway writer satisfying `add_file`'s `(TarSliceWriter,
/// FileOutcome)` return type on the `Cancelled` path after `rotate`
/// already closed the previous slice and returned `None` — there is no
/// slice left open at that point, so the caller discards this value
/// without writing to it.
fn placeholder_writer() -> Result<TarSliceWriter> {
    let scratch = NamedTempFile::new()?;
    TarSliceWriter::open(scratch.path())
}

enum FileOutcome {
    Added { bytes: u64 },
    Skipped(String),
    /// Cancellation was observed while streaming this file's bytes; the
    /// returned writer is the still-open current slice and must be
    /// deleted by the caller, same as a cancellation caught at the top
    /// of the walk loop.
    CancelledMidStream,
    /// Cancellation was observed as the operator's answer to a failed
    /// upload retry prompt during rotation, after the previous slice had
    /// already been closed to disk. That slice is left in place; the
    /// returned writer is a throwaway placeholder the caller must not
    /// touch.
    CancelledDuringRotation,
}

/// Fluent builder composing a [`Config`] with include/exclude lists,
/// playing the role the rest of this crate's file-oriented spec calls
/// the Archiver Controller's setup phase.
pub struct ArchiveRunBuilder {
    config: Config,
    includes: Vec<PathBuf>,
    excludes: ExcludeSet,
}

impl ArchiveRunBuilder {
    /// Starts a new builder targeting `target`.
    #[must_use]
    pub fn new(target: crate::config::Target) -> Self {
        Self {
            config: Config::new().with_target(target),
            includes: Vec::new(),
            excludes: ExcludeSet::new(),
        }
    }

    /// Adds an include root. Relative paths are resolved against the
    /// current working directory.
    #[must_use]
    pub fn include(mut self, path: impl Into<PathBuf>) -> Self {
        self.includes.push(path.into());
        self
    }

    /// Excludes a single file by absolute path.
    #[must_use]
    pub fn exclude_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.excludes.add_file(path.into());
        self
    }

    /// Excludes a directory (and its whole subtree) by absolute path.
    #[must_use]
    pub fn exclude_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.excludes.add_dir(path.into());
        self
    }

    /// Replaces the builder's configuration, keeping `target` already
    /// set by [`Self::new`] unless `config` overrides it too.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Runs the archiver with a no-op script hook and no prompter
    /// (non-interactive policies), discarding events. `sink` is only
    /// invoked for a remote target; pass
    /// [`NoopSink`](crate::collaborators::NoopSink) for a local one.
    ///
    /// # Errors
    ///
    /// See [`ArchiverController::run`].
    pub fn run(self, sink: &mut dyn Sink) -> Result<RunReport> {
        let hook = crate::collaborators::NoopScriptHook;
        let controller = ArchiverController::new(self.config);
        controller.run(
            &self.includes,
            &self.excludes,
            &hook,
            Some(sink),
            None,
            &mut NullSink,
        )
    }

    /// Runs the archiver, delivering every [`Event`] to `events`.
    ///
    /// # Errors
    ///
    /// See [`ArchiverController::run`].
    #[allow(clippy::too_many_arguments)]
    pub fn run_with_events(
        self,
        hook: &dyn ScriptHook,
        sink: Option<&dyn Sink>,
        prompter: Option<&dyn Prompter>,
        events: &mut dyn EventSink,
    ) -> Result<RunReport> {
        let controller = ArchiverController::new(self.config);
        controller.run(&self.includes, &self.excludes, hook, sink, prompter, events)
    }
}
