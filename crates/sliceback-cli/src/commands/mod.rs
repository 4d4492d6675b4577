//! Subcommand implementations.

pub mod backup;
