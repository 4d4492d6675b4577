//! Sliceback CLI - command-line front end for incremental, sliced
//! file-tree backups.

mod cli;
mod collaborators;
mod commands;
mod error;
mod output;
mod progress;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);

    let result = match &cli.command {
        cli::Commands::Backup(args) => {
            commands::backup::execute(args, &*formatter, cli.json, cli.quiet)
        }
    };

    if let Err(err) = &result {
        formatter.format_error(err);
    }
    result
}
