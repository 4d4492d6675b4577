//! Error types for the archiving engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a backup.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration was rejected by `Config::validate`.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Why the configuration was rejected.
        reason: String,
    },

    /// The capacity probe for a slice's target filesystem failed.
    #[error("failed to determine free space for {path}: {source}")]
    CapacityProbe {
        /// The path whose filesystem could not be probed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A slice was opened with zero effective capacity; no file can be
    /// added to it.
    #[error("no capacity available to open slice {slice_num} at {path}")]
    NoCapacity {
        /// The slice number that could not be opened.
        slice_num: u32,
        /// The path the slice would have been opened at.
        path: PathBuf,
    },

    /// A profile file line could not be parsed.
    #[error("invalid profile line {line_number}: {line}")]
    InvalidProfileLine {
        /// 1-based line number within the profile file.
        line_number: usize,
        /// The offending line's raw text.
        line: String,
    },

    /// A `Sink` upload failed and the run is not interactive (or the
    /// operator chose not to retry).
    #[error("failed to upload slice {slice_name}: {source}")]
    Upload {
        /// The slice that failed to upload.
        slice_name: String,
        /// The underlying error reported by the `Sink`.
        #[source]
        source: std::io::Error,
    },

    /// The run was cancelled mid-stream while adding a file's payload.
    #[error("operation cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_capacity_display() {
        let err = Error::NoCapacity {
            slice_num: 3,
            path: PathBuf::from("/backup/run.003.tar"),
        };
        let text = err.to_string();
        assert!(text.contains('3'));
        assert!(text.contains("run.003.tar"));
    }

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn invalid_profile_line_display() {
        let err = Error::InvalidProfileLine {
            line_number: 7,
            line: "Q nonsense".to_string(),
        };
        assert!(err.to_string().contains('7'));
    }
}
