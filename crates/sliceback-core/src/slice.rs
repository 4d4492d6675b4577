//! Owns the sequence of slices that make up one run: naming, opening,
//! capacity tracking, closing, and handing a finished slice off to the
//! script hook and the sink.

use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::Error;
use crate::Result;
use crate::capacity::effective_capacity;
use crate::capacity::free_space;
use crate::collaborators::HookEvent;
use crate::collaborators::MediaDecision;
use crate::collaborators::Prompter;
use crate::collaborators::RetryDecision;
use crate::collaborators::ScriptHook;
use crate::collaborators::Sink;
use crate::config::Config;
use crate::events::Event;
use crate::events::EventSink;
use crate::tar_writer::TarSliceWriter;

/// Formats a `strftime`-style `YYYYMMDD-HHMMSS` timestamp from `now`,
/// used as the default `file_prefix` when the run's configuration
/// leaves it empty.
///
/// Deliberately takes `now` as a parameter rather than calling
/// `SystemTime::now()` internally, so the naming convention stays
/// testable without wall-clock dependence.
#[must_use]
pub fn resolve_file_prefix(configured: &str, now: SystemTime) -> String {
    if !configured.is_empty() {
        return configured.to_string();
    }

    let secs = now
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());

    // A minimal civil-from-days calendar conversion (days since the Unix
    // epoch, proleptic Gregorian), since this crate does not depend on a
    // date/time crate for one formatted fallback prefix.
    let days = secs / 86400;
    let time_of_day = secs % 86400;
    let (year, month, day) = civil_from_days(days as i64);
    let (hour, minute, second) = (time_of_day / 3600, (time_of_day % 3600) / 60, time_of_day % 60);

    format!("{year:04}{month:02}{day:02}-{hour:02}{minute:02}{second:02}")
}

/// Howard Hinnant's `civil_from_days` algorithm, converting a day count
/// since 1970-01-01 into a proleptic-Gregorian (year, month, day).
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}

fn slice_file_name(file_prefix: &str, slice_num: u32) -> String {
    format!("{file_prefix}.{slice_num:03}.tar")
}

/// Renders `config`'s target as the `<target> <mount_point_if_local>`
/// pair a [`ScriptHook`] is invoked with.
fn hook_target_and_mount(config: &Config) -> (String, Option<PathBuf>) {
    match &config.target {
        crate::config::Target::Local(path) => (path.display().to_string(), Some(path.clone())),
        crate::config::Target::Remote { destination, .. } => (destination.clone(), None),
    }
}

/// What happened when a finished slice was handed off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseOutcome {
    /// Whether the slice was uploaded via the [`Sink`].
    pub uploaded: bool,
    /// Whether the operator cancelled the run while retrying an upload.
    pub cancelled: bool,
}

/// Owns the run-scoped slice bookkeeping: the resolved base name,
/// current slice number, current slice's archive name, and its capacity
/// and running byte count.
pub struct SliceLifecycleManager {
    base_name: PathBuf,
    file_prefix: String,
    slice_num: u32,
    archive_name: String,
    slice_capacity: u64,
    slice_bytes: u64,
}

impl SliceLifecycleManager {
    /// Creates a manager for slices written under `base_name`, named
    /// with the already-resolved `file_prefix` (see
    /// [`resolve_file_prefix`]).
    #[must_use]
    pub fn new(base_name: PathBuf, file_prefix: String) -> Self {
        Self {
            base_name,
            file_prefix,
            slice_num: 0,
            archive_name: String::new(),
            slice_capacity: 0,
            slice_bytes: 0,
        }
    }

    /// 1-based number of the currently open slice.
    #[must_use]
    pub const fn slice_num(&self) -> u32 {
        self.slice_num
    }

    /// Effective byte budget for the currently open slice.
    #[must_use]
    pub const fn slice_capacity(&self) -> u64 {
        self.slice_capacity
    }

    /// Bytes written to the currently open slice, as of the last
    /// [`Self::refresh_slice_bytes_from_disk`] call.
    #[must_use]
    pub const fn slice_bytes(&self) -> u64 {
        self.slice_bytes
    }

    /// Filename of the currently open slice.
    #[must_use]
    pub fn archive_name(&self) -> &str {
        &self.archive_name
    }

    /// Full path of the currently open slice.
    #[must_use]
    pub fn current_path(&self) -> PathBuf {
        self.base_name.join(&self.archive_name)
    }

    /// Returns true when adding `next_entry_size` bytes would overflow
    /// the current slice's capacity. Does not itself rotate; the
    /// Archiver Controller decides sequencing against the oversize
    /// guard first.
    #[must_use]
    pub const fn rotate_if_needed(&self, next_entry_size: u64) -> bool {
        self.slice_bytes + next_entry_size > self.slice_capacity
    }

    /// Increments `slice_num`, names the next slice, probes capacity,
    /// runs the `slice_init` hook, prompts for a media change if
    /// configured and applicable, and opens the tar writer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the operator cancels a requested
    /// media change, [`Error::CapacityProbe`] if the probe fails, or
    /// [`Error::Io`] if the slice file cannot be created.
    pub fn open_next_slice(
        &mut self,
        config: &Config,
        hook: &dyn ScriptHook,
        prompter: Option<&dyn Prompter>,
        events: &mut dyn EventSink,
    ) -> Result<TarSliceWriter> {
        let is_first_slice = self.slice_num == 0;
        self.slice_num += 1;

        if config.media_needs_change
            && !config.target.is_remote()
            && !is_first_slice
            && let Some(prompter) = prompter
            && prompter.ask_media_change(self.slice_num) == MediaDecision::Cancel
        {
            return Err(Error::Cancelled);
        }

        self.archive_name = slice_file_name(&self.file_prefix, self.slice_num);
        let path = self.current_path();

        let usage = free_space(&self.base_name)?;
        self.slice_capacity = effective_capacity(config.max_slice_size, usage, config.target.is_remote());
        self.slice_bytes = 0;
        events.emit(Event::TargetCapacity(self.slice_capacity));

        let (target, mount_point) = hook_target_and_mount(config);
        let outcome = hook.run(HookEvent::SliceInit, &path, &target, mount_point.as_deref())?;
        if !outcome.success {
            events.emit(Event::Warning(format!(
                "slice_init hook failed for {}: {}",
                self.archive_name, outcome.stderr
            )));
        }

        let writer = TarSliceWriter::open(&path)?;
        events.emit(Event::NewSlice {
            slice_num: self.slice_num,
            archive_name: self.archive_name.clone(),
        });
        Ok(writer)
    }

    /// Closes `writer`, runs the `slice_closed` hook, and — for a remote
    /// target — uploads via `sink`, retrying on operator request and
    /// running `slice_finished` once the slice is handed off.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if closing the writer fails, or
    /// [`Error::Upload`] if a non-interactive (or exhausted-retry)
    /// upload fails.
    pub fn close_current_slice(
        &mut self,
        writer: TarSliceWriter,
        config: &Config,
        hook: &dyn ScriptHook,
        sink: Option<&dyn Sink>,
        prompter: Option<&dyn Prompter>,
        events: &mut dyn EventSink,
    ) -> Result<CloseOutcome> {
        writer.close()?;

        let (target, mount_point) = hook_target_and_mount(config);
        let slice_path = self.current_path();

        let closed = hook.run(
            HookEvent::SliceClosed,
            &slice_path,
            &target,
            mount_point.as_deref(),
        )?;
        if !closed.success {
            events.emit(Event::Warning(format!(
                "slice_closed hook failed for {}: {}",
                self.archive_name, closed.stderr
            )));
        }

        if !config.target.is_remote() {
            let finished = hook.run(
                HookEvent::SliceFinished,
                &slice_path,
                &target,
                mount_point.as_deref(),
            )?;
            if !finished.success {
                events.emit(Event::Warning(format!(
                    "slice_finished hook failed for {}: {}",
                    self.archive_name, finished.stderr
                )));
            }
            return Ok(CloseOutcome {
                uploaded: false,
                cancelled: false,
            });
        }

        let Some(sink) = sink else {
            return Err(Error::InvalidConfiguration {
                reason: "remote target configured without a Sink".to_string(),
            });
        };

        let mut attempt = sink.upload(&slice_path, &self.archive_name);

        loop {
            match attempt {
                Ok(()) => {
                    let finished = hook.run(
                        HookEvent::SliceFinished,
                        &slice_path,
                        &target,
                        mount_point.as_deref(),
                    )?;
                    if !finished.success {
                        events.emit(Event::Warning(format!(
                            "slice_finished hook failed for {}: {}",
                            self.archive_name, finished.stderr
                        )));
                    }
                    return Ok(CloseOutcome {
                        uploaded: true,
                        cancelled: false,
                    });
                }
                Err(err) if config.interactive => {
                    let Some(prompter) = prompter else {
                        return Err(Error::Upload {
                            slice_name: self.archive_name.clone(),
                            source: std::io::Error::other(err.to_string()),
                        });
                    };
                    match prompter.ask_retry_upload(&self.archive_name, &err) {
                        RetryDecision::Retry => {
                            attempt = sink.upload(&slice_path, &self.archive_name);
                        }
                        RetryDecision::Skip => {
                            events.emit(Event::Warning(format!(
                                "upload skipped for {}",
                                self.archive_name
                            )));
                            let finished = hook.run(
                                HookEvent::SliceFinished,
                                &slice_path,
                                &target,
                                mount_point.as_deref(),
                            )?;
                            if !finished.success {
                                events.emit(Event::Warning(format!(
                                    "slice_finished hook failed for {}: {}",
                                    self.archive_name, finished.stderr
                                )));
                            }
                            return Ok(CloseOutcome {
                                uploaded: false,
                                cancelled: false,
                            });
                        }
                        RetryDecision::Cancel => {
                            return Ok(CloseOutcome {
                                uploaded: false,
                                cancelled: true,
                            });
                        }
                    }
                }
                Err(err) => {
                    return Err(Error::Upload {
                        slice_name: self.archive_name.clone(),
                        source: std::io::Error::other(err.to_string()),
                    });
                }
            }
        }
    }

    /// Updates `slice_bytes` to `n` and emits [`Event::SliceProgress`].
    pub fn record_bytes_written(&mut self, n: u64, events: &mut dyn EventSink) {
        self.slice_bytes = n;
        events.emit(Event::SliceProgress {
            slice_num: self.slice_num,
            bytes_written: n,
        });
    }

    /// Flushes `writer`'s underlying file and re-stats the slice from
    /// disk, updating `slice_bytes` to the actual on-disk size.
    ///
    /// Chosen over arithmetic tracking of header/payload/padding bytes:
    /// flushing then re-stating absorbs tar-format bookkeeping drift
    /// without the writer needing to expose its internal accounting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if flushing or stating the slice fails.
    pub fn refresh_slice_bytes_from_disk(
        &mut self,
        writer: &mut TarSliceWriter,
        events: &mut dyn EventSink,
    ) -> Result<()> {
        writer.flush()?;
        let size = std::fs::metadata(self.current_path())?.len();
        self.record_bytes_written(size, events);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_prefix_falls_back_to_a_timestamp() {
        let now = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000);
        let prefix = resolve_file_prefix("", now);
        assert_eq!(prefix, "20231114-221320");
    }

    #[test]
    fn configured_prefix_is_used_verbatim() {
        assert_eq!(
            resolve_file_prefix("nightly", SystemTime::UNIX_EPOCH),
            "nightly"
        );
    }

    #[test]
    fn slice_names_follow_the_naming_convention() {
        assert_eq!(slice_file_name("nightly", 1), "nightly.001.tar");
        assert_eq!(slice_file_name("nightly", 42), "nightly.042.tar");
    }

    #[test]
    fn rotate_if_needed_compares_against_capacity() {
        let mut manager = SliceLifecycleManager::new(PathBuf::from("/backups"), "run".to_string());
        manager.slice_capacity = 100;
        manager.slice_bytes = 90;
        assert!(manager.rotate_if_needed(20));
        assert!(!manager.rotate_if_needed(10));
        assert!(!manager.rotate_if_needed(0));
    }

    #[test]
    fn new_manager_has_no_slice_open_yet() {
        let manager = SliceLifecycleManager::new(PathBuf::from("/backups"), "run".to_string());
        assert_eq!(manager.slice_num(), 0);
        assert_eq!(manager.slice_capacity(), 0);
    }
}
