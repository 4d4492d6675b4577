//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use anyhow::Result;
use console::Term;
use console::style;
use sliceback_core::RunOutcome;
use sliceback_core::RunReport;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn format_number(n: u64) -> String {
        let s = n.to_string();
        let mut result = String::new();
        let mut count = 0;

        for c in s.chars().rev() {
            if count == 3 {
                result.push(',');
                count = 0;
            }
            result.push(c);
            count += 1;
        }

        result.chars().rev().collect()
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_run_result(&self, report: &RunReport) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let (symbol, label) = match report.outcome {
            RunOutcome::Completed => ("✓", "Backup complete"),
            RunOutcome::CompletedWithSkips => ("⚠", "Backup complete, with skipped files"),
            RunOutcome::Cancelled => ("✗", "Backup cancelled"),
        };

        if self.use_colors {
            let styled = match report.outcome {
                RunOutcome::Completed => style(symbol).green().bold(),
                RunOutcome::CompletedWithSkips => style(symbol).yellow().bold(),
                RunOutcome::Cancelled => style(symbol).red().bold(),
            };
            let _ = self.term.write_line(&format!("{styled} {label}"));
        } else {
            let _ = self.term.write_line(label);
        }

        let _ = self
            .term
            .write_line(&format!("  Files archived:   {}", Self::format_number(report.total_files)));
        let _ = self.term.write_line(&format!(
            "  Total size:       {}",
            Self::format_size(report.total_bytes)
        ));
        let _ = self
            .term
            .write_line(&format!("  Slices written:   {}", report.slices_written));

        if !report.skipped_files.is_empty() {
            let _ = self.term.write_line(&format!(
                "  Files skipped:    {}",
                report.skipped_files.len()
            ));
        }

        if self.verbose && !report.skipped_files.is_empty() {
            let _ = self.term.write_line("");
            if self.use_colors {
                let _ = self
                    .term
                    .write_line(&format!("{}", style("Skipped:").yellow().bold()));
            } else {
                let _ = self.term.write_line("Skipped:");
            }
            for skipped in &report.skipped_files {
                let _ = self
                    .term
                    .write_line(&format!("  - {}: {}", skipped.path.display(), skipped.reason));
            }
        }

        Ok(())
    }

    fn format_error(&self, error: &anyhow::Error) {
        // Always show errors, even in quiet mode.
        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {error:?}", style("ERROR:").red().bold()));
        } else {
            let _ = self.term.write_line(&format!("ERROR: {error:?}"));
        }
    }

    fn format_success(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {message}", style("✓").green().bold()));
        } else {
            let _ = self.term.write_line(message);
        }
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {message}", style("⚠").yellow().bold()));
        } else {
            let _ = self.term.write_line(&format!("WARNING: {message}"));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_bytes() {
        assert_eq!(HumanFormatter::format_size(0), "0 B");
        assert_eq!(HumanFormatter::format_size(512), "512 B");
        assert_eq!(HumanFormatter::format_size(1023), "1023 B");
    }

    #[test]
    fn test_format_size_kilobytes() {
        assert_eq!(HumanFormatter::format_size(1024), "1.0 KB");
        assert_eq!(HumanFormatter::format_size(1536), "1.5 KB");
    }

    #[test]
    fn test_format_size_megabytes() {
        assert_eq!(HumanFormatter::format_size(1024 * 1024), "1.0 MB");
    }

    #[test]
    fn test_format_size_gigabytes() {
        assert_eq!(HumanFormatter::format_size(1024 * 1024 * 1024), "1.0 GB");
    }

    #[test]
    fn test_format_number_thousands() {
        assert_eq!(HumanFormatter::format_number(1000), "1,000");
        assert_eq!(HumanFormatter::format_number(1_234_567), "1,234,567");
    }
}
