//! Error conversion utilities for the CLI.
//!
//! Converts the engine's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use sliceback_core::Error;

/// Converts a [`sliceback_core::Error`] to a user-friendly `anyhow`
/// error with a HINT where one is actionable.
pub fn convert_run_error(err: Error) -> anyhow::Error {
    match err {
        Error::InvalidConfiguration { reason } => {
            anyhow!("invalid configuration: {reason}\nHINT: check --target, --include, and --profile.")
        }
        Error::CapacityProbe { path, source } => {
            anyhow!(
                "could not determine free space for '{}': {source}\n\
                 HINT: check that the target directory exists and is mounted.",
                path.display()
            )
        }
        Error::NoCapacity { slice_num, path } => {
            anyhow!(
                "no capacity available to open slice {slice_num} at '{}'\n\
                 HINT: free up space on the target filesystem, or raise --max-slice-size.",
                path.display()
            )
        }
        Error::InvalidProfileLine { line_number, line } => {
            anyhow!("invalid profile line {line_number}: `{line}`\nHINT: see the profile grammar in the README.")
        }
        Error::Upload { slice_name, source } => {
            anyhow!(
                "failed to upload slice '{slice_name}': {source}\n\
                 HINT: pass --interactive to be prompted to retry, skip, or cancel."
            )
        }
        Error::Cancelled => anyhow!("backup cancelled"),
        Error::Io(io_err) => anyhow::Error::from(io_err).context("I/O error during backup"),
    }
}
