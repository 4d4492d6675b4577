//! Batch-configuring a run from a profile file: a sequence of
//! one-letter-tagged lines describing a target, its slice size, prefix,
//! media/compression policy, and file selection.
//!
//! Unlike the other modules here, a profile is not itself invoked by
//! the Archiver Controller — it is a convenience the CLI parses into a
//! single [`Config`] (plus includes/excludes), then hands to
//! [`crate::archiver::ArchiveRunBuilder`].

use std::path::PathBuf;

use crate::Error;
use crate::Result;
use crate::config::Config;
use crate::config::SliceLimit;
use crate::config::Target;
use crate::traversal::ExcludeSet;

/// A parsed profile: the backup run's configuration, ready to hand to
/// [`crate::archiver::ArchiveRunBuilder::with_config`], plus the
/// include/exclude paths it named.
#[derive(Debug, Clone)]
pub struct ProfilePass {
    /// The backup run's configuration.
    pub config: Config,
    /// Include roots named by `I` lines.
    pub includes: Vec<PathBuf>,
    /// Excludes named by `E` lines.
    pub excludes: ExcludeSet,
}

/// Parses the one-letter-tagged line grammar described in the profile
/// file format.
///
/// `file_prefix` and `max_slice_megabytes` are reset to their defaults
/// before the first line is parsed, matching the original parser's
/// `loadProfile`, which resets both so that a profile written before
/// these settings existed does not silently inherit a previous run's
/// values. A later `M` line overwrites an earlier one — only the last
/// target in the file is used, mirroring the original, which assigns
/// the target once, after the whole file has been read.
///
/// Blank lines and lines whose tag is unrecognized are ignored.
///
/// # Errors
///
/// Returns [`Error::InvalidProfileLine`] if a recognized tag's value is
/// malformed (a non-numeric `S`, a non-`0`/`1` `C`/`Z`, a `remote:` `M`
/// missing its destination half, or a tag line with no value).
pub fn parse(contents: &str) -> Result<ProfilePass> {
    let mut target_token: Option<String> = None;
    let mut file_prefix = String::new();
    let mut max_slice_size = SliceLimit::Unlimited;
    let mut media_needs_change = false;
    let mut compress_files = false;
    let mut includes = Vec::new();
    let mut excludes = ExcludeSet::new();

    for (index, raw_line) in contents.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        let Some((tag, rest)) = line.split_once(' ') else {
            continue;
        };
        let value = rest.trim();

        let invalid = || Error::InvalidProfileLine {
            line_number,
            line: line.to_string(),
        };

        match tag {
            "M" => {
                if value.is_empty() {
                    return Err(invalid());
                }
                target_token = Some(value.to_string());
            }
            "P" => {
                if value.is_empty() {
                    return Err(invalid());
                }
                file_prefix = value.to_string();
            }
            "S" => {
                let megabytes: u32 = value.parse().map_err(|_| invalid())?;
                max_slice_size = if megabytes == 0 {
                    SliceLimit::Unlimited
                } else {
                    SliceLimit::Megabytes(megabytes)
                };
            }
            "C" => media_needs_change = parse_bool_flag(value).ok_or_else(invalid)?,
            "Z" => compress_files = parse_bool_flag(value).ok_or_else(invalid)?,
            "I" => includes.push(PathBuf::from(value)),
            "E" => {
                let path = PathBuf::from(value);
                if path.is_dir() {
                    excludes.add_dir(path);
                } else {
                    excludes.add_file(path);
                }
            }
            _ => {}
        }
    }

    let Some(target_token) = target_token else {
        return Err(Error::InvalidProfileLine {
            line_number: 0,
            line: "no `M` line naming a target".to_string(),
        });
    };
    let target = Target::parse(&target_token).map_err(|_| Error::InvalidProfileLine {
        line_number: 0,
        line: format!("M {target_token}"),
    })?;

    let config = Config::new()
        .with_target(target)
        .with_file_prefix(file_prefix)
        .with_max_slice_size(max_slice_size)
        .with_media_needs_change(media_needs_change)
        .with_compress_files(compress_files);

    Ok(ProfilePass {
        config,
        includes,
        excludes,
    })
}

fn parse_bool_flag(value: &str) -> Option<bool> {
    match value {
        "0" => Some(false),
        "1" => Some(true),
        _ => None,
    }
}
