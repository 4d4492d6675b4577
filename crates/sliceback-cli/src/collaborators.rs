//! Reference implementations of the engine's pluggable collaborators,
//! suitable for scripted/unattended use plus a minimal interactive
//! `Prompter` over stdin for local runs.

use std::io::BufRead;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;

use sliceback_core::Error;
use sliceback_core::Result;
use sliceback_core::collaborators::HookEvent;
use sliceback_core::collaborators::HookOutcome;
use sliceback_core::collaborators::MediaDecision;
use sliceback_core::collaborators::Prompter;
use sliceback_core::collaborators::RetryDecision;
use sliceback_core::collaborators::ScriptHook;
use sliceback_core::collaborators::Sink;

/// Copies a finished slice to a second local path, standing in for a
/// real remote transport (S3, SFTP, tape) an embedding application
/// would supply instead.
pub struct LocalSink;

impl Sink for LocalSink {
    fn upload(&self, slice_path: &Path, slice_name: &str) -> Result<()> {
        let destination = slice_path
            .parent()
            .map(|dir| dir.join(slice_name))
            .unwrap_or_else(|| PathBuf::from(slice_name));
        std::fs::copy(slice_path, destination).map_err(|source| Error::Upload {
            slice_name: slice_name.to_string(),
            source,
        })?;
        Ok(())
    }
}

/// Runs `--slice-script` as a subprocess, invoked as
/// `script <phase> <archive_path> <target> <mount_point_if_local>`.
pub struct ProcessScriptHook {
    script: PathBuf,
}

impl ProcessScriptHook {
    /// Wraps the script at `script`.
    #[must_use]
    pub fn new(script: PathBuf) -> Self {
        Self { script }
    }
}

impl ScriptHook for ProcessScriptHook {
    fn run(
        &self,
        event: HookEvent,
        archive_path: &Path,
        target: &str,
        mount_point: Option<&Path>,
    ) -> Result<HookOutcome> {
        let event_name = match event {
            HookEvent::SliceInit => "slice_init",
            HookEvent::SliceClosed => "slice_closed",
            HookEvent::SliceFinished => "slice_finished",
        };

        let output = Command::new(&self.script)
            .arg(event_name)
            .arg(archive_path)
            .arg(target)
            .arg(mount_point.unwrap_or_else(|| Path::new("")))
            .output()?;

        Ok(HookOutcome {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Reads yes/no/retry decisions from stdin, for a local interactive run.
pub struct StdioPrompter;

impl StdioPrompter {
    fn ask(prompt: &str) -> String {
        print!("{prompt} ");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        let _ = std::io::stdin().lock().read_line(&mut line);
        line.trim().to_lowercase()
    }
}

impl Prompter for StdioPrompter {
    fn ask_retry_upload(&self, slice_name: &str, error: &Error) -> RetryDecision {
        match Self::ask(&format!(
            "upload of {slice_name} failed ({error}); (r)etry, (s)kip, or (c)ancel?"
        ))
        .as_str()
        {
            "s" | "skip" => RetryDecision::Skip,
            "c" | "cancel" => RetryDecision::Cancel,
            _ => RetryDecision::Retry,
        }
    }

    fn ask_media_change(&self, slice_num: u32) -> MediaDecision {
        match Self::ask(&format!(
            "insert media for slice {slice_num} and press enter, or (c)ancel:"
        ))
        .as_str()
        {
            "c" | "cancel" => MediaDecision::Cancel,
            _ => MediaDecision::Continue,
        }
    }

    fn ask_overwrite_target(&self) -> bool {
        matches!(Self::ask("target already exists; overwrite? (y/n)").as_str(), "y" | "yes")
    }
}
