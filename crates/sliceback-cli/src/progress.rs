//! Progress bar rendering for a running backup, driven by `Event`s
//! emitted through the `sliceback_core::EventSink` trait.

use console::Term;
use indicatif::ProgressBar;
use indicatif::ProgressState;
use indicatif::ProgressStyle;
use sliceback_core::Event;
use sliceback_core::EventSink;
use std::fmt::Write;

/// Renders one slice's progress as an indicatif bar, restyled each time
/// a new slice opens. Warnings and hook output are printed above the
/// bar so they survive the bar's redraw. Automatically cleans up on
/// drop.
pub struct CliProgress {
    bar: ProgressBar,
    total_files: u64,
    total_bytes: u64,
}

impl CliProgress {
    /// Creates a progress bar with no known length yet; the first
    /// `TargetCapacity` event sets it.
    #[must_use]
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(Self::style());
        Self {
            bar,
            total_files: 0,
            total_bytes: 0,
        }
    }

    /// Whether stdout is a terminal worth drawing a bar to.
    #[must_use]
    pub fn should_show() -> bool {
        Term::stdout().is_term()
    }

    fn style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .with_key("eta", |state: &ProgressState, w: &mut dyn Write| {
                write!(w, "{}", humanize_duration(state.eta())).unwrap_or(());
            })
            .progress_chars("█▓░")
    }

    fn set_message(&self) {
        self.bar
            .set_message(format!("{} files, {}", self.total_files, humanize_bytes(self.total_bytes)));
    }
}

impl Default for CliProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

impl EventSink for CliProgress {
    fn emit(&mut self, event: Event) {
        match event {
            Event::Logging(message) => self.bar.println(message),
            Event::Warning(message) => self.bar.println(format!("warning: {message}")),
            Event::SliceProgress { bytes_written, .. } => self.bar.set_position(bytes_written),
            Event::NewSlice {
                slice_num,
                archive_name,
            } => {
                self.bar.set_position(0);
                self.bar
                    .println(format!("opening slice {slice_num}: {archive_name}"));
                self.set_message();
            }
            Event::TotalBytesChanged(total) => {
                self.total_bytes = total;
                self.set_message();
            }
            Event::TotalFilesChanged(total) => {
                self.total_files = total;
                self.set_message();
            }
            Event::TargetCapacity(capacity) => self.bar.set_length(capacity),
            Event::FileProgress { .. } => {}
        }
    }
}

/// Converts bytes to human-readable format (KB, MB, GB, TB).
fn humanize_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Converts duration to human-readable format.
fn humanize_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize_bytes() {
        assert_eq!(humanize_bytes(0), "0 B");
        assert_eq!(humanize_bytes(1024), "1.0 KB");
        assert_eq!(humanize_bytes(1024 * 1024), "1.0 MB");
        assert_eq!(humanize_bytes(1024_u64.pow(4)), "1.0 TB");
    }

    #[test]
    fn test_humanize_duration() {
        assert_eq!(humanize_duration(std::time::Duration::from_secs(0)), "0s");
        assert_eq!(
            humanize_duration(std::time::Duration::from_secs(90)),
            "1m30s"
        );
        assert_eq!(
            humanize_duration(std::time::Duration::from_secs(3661)),
            "1h1m"
        );
    }

    #[test]
    fn tracks_totals_from_events() {
        let mut progress = CliProgress::new();
        progress.emit(Event::TargetCapacity(1024));
        progress.emit(Event::TotalBytesChanged(512));
        progress.emit(Event::TotalFilesChanged(3));
        assert_eq!(progress.total_bytes, 512);
        assert_eq!(progress.total_files, 3);
    }
}
