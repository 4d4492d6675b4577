//! Backup command implementation.

use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use sliceback_core::ArchiverController;
use sliceback_core::Config;
use sliceback_core::Event;
use sliceback_core::EventSink;
use sliceback_core::ExcludeSet;
use sliceback_core::RunOutcome;
use sliceback_core::RunReport;
use sliceback_core::Target;
use sliceback_core::collaborators::Prompter;
use sliceback_core::collaborators::ScriptHook;
use sliceback_core::collaborators::Sink;
use sliceback_core::config::SliceLimit;
use sliceback_core::events::NullSink;

use crate::cli::BackupArgs;
use crate::collaborators::LocalSink;
use crate::collaborators::ProcessScriptHook;
use crate::collaborators::StdioPrompter;
use crate::error::convert_run_error;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;

/// One target configuration plus its include/exclude paths, ready to
/// hand to [`ArchiverController::run`].
struct Pass {
    config: Config,
    includes: Vec<PathBuf>,
    excludes: ExcludeSet,
}

fn excludes_from_args(paths: &[PathBuf]) -> ExcludeSet {
    let mut excludes = ExcludeSet::new();
    for path in paths {
        if path.is_dir() {
            excludes.add_dir(path.clone());
        } else {
            excludes.add_file(path.clone());
        }
    }
    excludes
}

fn passes_from_args(args: &BackupArgs) -> Result<Vec<Pass>> {
    if let Some(profile_path) = &args.profile {
        let contents = std::fs::read_to_string(profile_path)
            .with_context(|| format!("failed to read profile '{}'", profile_path.display()))?;
        let parsed = sliceback_core::profile::parse(&contents).map_err(convert_run_error)?;
        return Ok(vec![Pass {
            config: parsed.config,
            includes: parsed.includes,
            excludes: parsed.excludes,
        }]);
    }

    let target = args
        .target
        .as_deref()
        .map(Target::parse)
        .transpose()
        .map_err(convert_run_error)?
        .unwrap_or_else(|| Target::Local(PathBuf::from(".")));

    let max_slice_size = args.max_slice_size.map_or(SliceLimit::Unlimited, |bytes| {
        let megabytes = (bytes / (1024 * 1024)) as u32;
        if megabytes == 0 {
            SliceLimit::Unlimited
        } else {
            SliceLimit::Megabytes(megabytes)
        }
    });

    let mut config = Config::new()
        .with_target(target)
        .with_max_slice_size(max_slice_size)
        .with_compress_files(args.compress)
        .with_media_needs_change(args.media_needs_change)
        .with_interactive(args.interactive);
    if let Some(prefix) = &args.prefix {
        config = config.with_file_prefix(prefix.clone());
    }
    if let Some(script) = &args.slice_script {
        config = config.with_slice_script(Some(script.clone()));
    }

    Ok(vec![Pass {
        config,
        includes: args.includes.clone(),
        excludes: excludes_from_args(&args.excludes),
    }])
}

/// Runs the `backup` subcommand: one pass built from plain flags, or
/// one pass parsed from a profile's `M`/`P`/`S`/`C`/`Z`/`I`/`E` lines
/// when `--profile` is given.
pub fn execute(
    args: &BackupArgs,
    formatter: &dyn OutputFormatter,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let passes = passes_from_args(args)?;
    if passes.is_empty() {
        bail!("no backup pass to run");
    }

    let mut any_cancelled = false;

    for pass in passes {
        let hook: Box<dyn ScriptHook> = match &pass.config.slice_script {
            Some(script) => Box::new(ProcessScriptHook::new(script.clone())),
            None => Box::new(sliceback_core::collaborators::NoopScriptHook),
        };
        let sink: Option<Box<dyn Sink>> = if pass.config.target.is_remote() {
            Some(Box::new(LocalSink))
        } else {
            None
        };
        let prompter: Option<Box<dyn Prompter>> = if pass.config.interactive {
            Some(Box::new(StdioPrompter))
        } else {
            None
        };

        let show_progress = !json && !quiet && CliProgress::should_show();
        let mut progress = show_progress.then(CliProgress::new);
        let mut events: Box<dyn EventSink> = match &mut progress {
            Some(progress) => Box::new(ForwardToProgress(progress)),
            None => Box::new(NullSink),
        };

        let controller = ArchiverController::new(pass.config);
        let report: RunReport = controller
            .run(
                &pass.includes,
                &pass.excludes,
                hook.as_ref(),
                sink.as_deref(),
                prompter.as_deref(),
                events.as_mut(),
            )
            .map_err(convert_run_error)?;

        drop(events);
        any_cancelled |= report.outcome == RunOutcome::Cancelled;
        formatter.format_run_result(&report)?;
    }

    if any_cancelled {
        bail!("backup cancelled");
    }

    Ok(())
}

/// Adapts a borrowed [`CliProgress`] to [`EventSink`] so it can be
/// boxed alongside [`NullSink`] behind one trait object.
struct ForwardToProgress<'a>(&'a mut CliProgress);

impl EventSink for ForwardToProgress<'_> {
    fn emit(&mut self, event: Event) {
        self.0.emit(event);
    }
}
