//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use anyhow::Result;
use serde::Serialize;
use sliceback_core::RunOutcome;
use sliceback_core::RunReport;
use std::io::Write;
use std::io::{self};

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_run_result(&self, report: &RunReport) -> Result<()> {
        #[derive(Serialize)]
        struct SkippedOutput {
            path: String,
            reason: String,
        }

        #[derive(Serialize)]
        struct RunOutput {
            outcome: String,
            total_bytes: u64,
            total_files: u64,
            slices_written: u32,
            skipped_files: Vec<SkippedOutput>,
        }

        let outcome = match report.outcome {
            RunOutcome::Completed => "completed",
            RunOutcome::CompletedWithSkips => "completed_with_skips",
            RunOutcome::Cancelled => "cancelled",
        };

        let skipped_files = report
            .skipped_files
            .iter()
            .map(|s| SkippedOutput {
                path: s.path.display().to_string(),
                reason: s.reason.clone(),
            })
            .collect();

        let data = RunOutput {
            outcome: outcome.to_string(),
            total_bytes: report.total_bytes,
            total_files: report.total_files,
            slices_written: report.slices_written,
            skipped_files,
        };

        let output = JsonOutput::success("backup", data);
        Self::output(&output)
    }

    fn format_error(&self, error: &anyhow::Error) {
        let output = JsonOutput::<()>::error("backup", format!("{error:?}"));
        let _ = Self::output(&output);
    }

    fn format_success(&self, message: &str) {
        #[derive(Serialize)]
        struct SuccessData {
            message: String,
        }

        let output = JsonOutput::success(
            "backup",
            SuccessData {
                message: message.to_string(),
            },
        );
        let _ = Self::output(&output);
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData {
            message: String,
        }

        let output = JsonOutput::success(
            "warning",
            WarningData {
                message: message.to_string(),
            },
        );
        let _ = Self::output(&output);
    }
}
