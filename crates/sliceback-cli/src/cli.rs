//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sliceback")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run an incremental, sliced backup
    Backup(BackupArgs),
}

#[derive(clap::Args)]
pub struct BackupArgs {
    /// Where finished slices are written: a local directory, or
    /// `remote:<staging>,<destination>` for an upload target
    #[arg(long, value_name = "TARGET")]
    pub target: Option<String>,

    /// Prefix used when naming slices (default: a run-start timestamp)
    #[arg(long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Per-slice byte budget, with an optional K/M/G/T suffix (default: unlimited)
    #[arg(long, value_name = "SIZE", value_parser = parse_byte_size)]
    pub max_slice_size: Option<u64>,

    /// Compress each file individually before adding it to the current slice
    #[arg(long)]
    pub compress: bool,

    /// Prompt to change removable media between slices (no-op for remote targets)
    #[arg(long)]
    pub media_needs_change: bool,

    /// External script invoked at slice lifecycle points
    #[arg(long, value_name = "PATH")]
    pub slice_script: Option<PathBuf>,

    /// Surface upload-retry/media-change/overwrite prompts on stdin
    /// instead of answering them with a fixed non-interactive policy
    #[arg(long)]
    pub interactive: bool,

    /// Profile file (`M`/`P`/`S`/`C`/`Z`/`I`/`E` lines) describing a
    /// backup pass, used instead of the other flags
    #[arg(long, value_name = "PATH")]
    pub profile: Option<PathBuf>,

    /// Root path to include in the backup (repeatable)
    #[arg(long = "include", value_name = "PATH")]
    pub includes: Vec<PathBuf>,

    /// Path to exclude from the backup, file or directory (repeatable)
    #[arg(long = "exclude", value_name = "PATH")]
    pub excludes: Vec<PathBuf>,
}

/// Parse byte size with optional suffix (K, M, G, T)
#[allow(clippy::option_if_let_else)]
pub fn parse_byte_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty byte size".to_string());
    }

    let (num_str, multiplier) = if let Some(stripped) = s.strip_suffix('T') {
        (stripped, 1024_u64.pow(4))
    } else if let Some(stripped) = s.strip_suffix('G') {
        (stripped, 1024_u64.pow(3))
    } else if let Some(stripped) = s.strip_suffix('M') {
        (stripped, 1024_u64.pow(2))
    } else if let Some(stripped) = s.strip_suffix('K') {
        (stripped, 1024)
    } else {
        (s, 1)
    };

    num_str
        .parse::<u64>()
        .map(|n| n * multiplier)
        .map_err(|_| format!("invalid byte size: {s}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_byte_size() {
        assert_eq!(parse_byte_size("100").unwrap(), 100);
        assert_eq!(parse_byte_size("1K").unwrap(), 1024);
        assert_eq!(parse_byte_size("2M").unwrap(), 2 * 1024 * 1024);
        assert_eq!(parse_byte_size("3G").unwrap(), 3 * 1024 * 1024 * 1024);
        assert_eq!(parse_byte_size("1T").unwrap(), 1024_u64.pow(4));
        assert!(parse_byte_size("invalid").is_err());
        assert!(parse_byte_size("").is_err());
    }
}
