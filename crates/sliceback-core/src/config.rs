//! Configuration for a backup run.

use std::path::PathBuf;

use crate::Error;
use crate::Result;

/// Where a finished slice ultimately lives.
///
/// A `Local` target is a plain filesystem path; the Slice Lifecycle
/// Manager writes slices directly there and never invokes a `Sink`.
/// A `Remote` target is an opaque destination string interpreted by the
/// embedding application's `Sink`; slices are first written to a local
/// staging directory, then handed to the `Sink` for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A local directory that receives slices directly.
    Local(PathBuf),
    /// An opaque remote destination, uploaded via a `Sink`.
    Remote {
        /// Local staging directory slices are written into before upload.
        staging: PathBuf,
        /// Destination string passed to the `Sink`, e.g. a URL.
        destination: String,
    },
}

impl Target {
    /// The directory a slice file is actually opened in, regardless of
    /// whether it is local or staged for remote upload.
    #[must_use]
    pub fn local_dir(&self) -> &std::path::Path {
        match self {
            Self::Local(path) => path,
            Self::Remote { staging, .. } => staging,
        }
    }

    /// Whether this target requires a `Sink` upload after each slice closes.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Parses the single-token target encoding shared by `--target` and
    /// the profile grammar's `S` line: a bare path means `Local`;
    /// `remote:<staging>,<destination>` means `Remote`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if a `remote:` token is
    /// missing its comma-separated destination half.
    pub fn parse(token: &str) -> Result<Self> {
        match token.strip_prefix("remote:") {
            Some(rest) => {
                let Some((staging, destination)) = rest.split_once(',') else {
                    return Err(Error::InvalidConfiguration {
                        reason: format!(
                            "remote target `{token}` must be `remote:<staging>,<destination>`"
                        ),
                    });
                };
                Ok(Self::Remote {
                    staging: PathBuf::from(staging),
                    destination: destination.to_string(),
                })
            }
            None => Ok(Self::Local(PathBuf::from(token))),
        }
    }
}

/// Per-slice byte budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceLimit {
    /// No explicit limit; a slice is bounded only by free space.
    Unlimited,
    /// Bounded to this many megabytes (as reported by the Capacity Probe,
    /// whichever is smaller between this and free space).
    Megabytes(u32),
}

impl Default for SliceLimit {
    fn default() -> Self {
        Self::Unlimited
    }
}

/// Per-file compression codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// No compression; bytes are stored verbatim.
    None,
    /// gzip (DEFLATE), via `flate2`.
    Gzip,
    /// bzip2, via the `bzip2` crate.
    Bzip2,
}

impl Codec {
    /// The filename suffix appended to a compressed entry's archive name.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Gzip => ".gz",
            Self::Bzip2 => ".bz2",
        }
    }
}

/// The ordered list of codecs tried when `compress_files` is enabled
/// without pinning a specific codec.
///
/// Default: `[Bzip2, Gzip]`, matching the original implementation's MIME
/// lookup which preferred bzip2 and fell back to gzip.
#[must_use]
pub const fn default_compression_preference() -> [Codec; 2] {
    [Codec::Bzip2, Codec::Gzip]
}

/// Full configuration for one backup run.
///
/// # Examples
///
/// ```
/// use sliceback_core::config::{Config, SliceLimit, Target};
///
/// let config = Config::default()
///     .with_target(Target::Local("/tmp/backups".into()))
///     .with_max_slice_size(SliceLimit::Megabytes(650))
///     .with_compress_files(true);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Where finished slices are written (and, for remote targets,
    /// uploaded to).
    pub target: Target,
    /// Prefix used when naming slices; defaults to a run-start timestamp
    /// (`YYYYMMDD-HHMMSS`) when left empty.
    pub file_prefix: String,
    /// Per-slice byte budget.
    pub max_slice_size: SliceLimit,
    /// Whether the operator should be prompted to change removable media
    /// between slices. A no-op when `target` is `Remote`.
    pub media_needs_change: bool,
    /// Whether each file is compressed individually before being added
    /// to the current slice.
    pub compress_files: bool,
    /// The codec preference order tried when `compress_files` is set.
    pub compression_preference: Vec<Codec>,
    /// An external script invoked at slice lifecycle points
    /// (`slice_init`, `slice_closed`, `slice_finished`).
    pub slice_script: Option<PathBuf>,
    /// Whether prompts (media change, upload retry, overwrite) are
    /// surfaced interactively, or answered with a fixed non-interactive
    /// policy.
    pub interactive: bool,
}

impl Default for Config {
    /// Secure/sane defaults: no compression, non-interactive,
    /// unlimited slice size, no media-change prompting.
    fn default() -> Self {
        Self {
            target: Target::Local(PathBuf::from(".")),
            file_prefix: String::new(),
            max_slice_size: SliceLimit::Unlimited,
            media_needs_change: false,
            compress_files: false,
            compression_preference: default_compression_preference().to_vec(),
            slice_script: None,
            interactive: false,
        }
    }
}

impl Config {
    /// Creates a new `Config` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the backup target.
    #[must_use]
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Sets the slice filename prefix.
    #[must_use]
    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    /// Sets the per-slice byte budget.
    #[must_use]
    pub const fn with_max_slice_size(mut self, limit: SliceLimit) -> Self {
        self.max_slice_size = limit;
        self
    }

    /// Sets whether media-change prompting is requested.
    #[must_use]
    pub const fn with_media_needs_change(mut self, needed: bool) -> Self {
        self.media_needs_change = needed;
        self
    }

    /// Sets whether per-file compression is enabled.
    #[must_use]
    pub const fn with_compress_files(mut self, compress: bool) -> Self {
        self.compress_files = compress;
        self
    }

    /// Sets the external slice lifecycle script.
    #[must_use]
    pub fn with_slice_script(mut self, script: Option<PathBuf>) -> Self {
        self.slice_script = script;
        self
    }

    /// Sets whether the run is interactive.
    #[must_use]
    pub const fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `max_slice_size` is
    /// `Megabytes(0)` (a zero-byte budget can never hold a directory
    /// entry, let alone a file, and would only manifest later as a
    /// confusing `NoCapacity` error on the first file add) or if
    /// `compression_preference` is empty while `compress_files` is set.
    pub fn validate(&self) -> Result<()> {
        if matches!(self.max_slice_size, SliceLimit::Megabytes(0)) {
            return Err(Error::InvalidConfiguration {
                reason: "max_slice_size of 0 megabytes can never hold a slice".to_string(),
            });
        }
        if self.compress_files && self.compression_preference.is_empty() {
            return Err(Error::InvalidConfiguration {
                reason: "compress_files is set but compression_preference is empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_megabyte_limit_rejected() {
        let config = Config::default().with_max_slice_size(SliceLimit::Megabytes(0));
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn empty_preference_with_compression_rejected() {
        let mut config = Config::default().with_compress_files(true);
        config.compression_preference.clear();
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn builder_methods_compose() {
        let config = Config::default()
            .with_target(Target::Local(PathBuf::from("/backups")))
            .with_file_prefix("nightly")
            .with_max_slice_size(SliceLimit::Megabytes(700))
            .with_compress_files(true)
            .with_interactive(true);

        assert_eq!(config.target, Target::Local(PathBuf::from("/backups")));
        assert_eq!(config.file_prefix, "nightly");
        assert_eq!(config.max_slice_size, SliceLimit::Megabytes(700));
        assert!(config.compress_files);
        assert!(config.interactive);
    }

    #[test]
    fn remote_target_is_remote() {
        let target = Target::Remote {
            staging: PathBuf::from("/tmp/stage"),
            destination: "s3://bucket/prefix".to_string(),
        };
        assert!(target.is_remote());

        let local = Target::Local(PathBuf::from("/backups"));
        assert!(!local.is_remote());
    }
}
