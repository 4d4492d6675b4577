//! Incremental, sliced, file-level backup archiving engine.
//!
//! `sliceback-core` walks a set of include/exclude paths and writes the
//! selected files into one or more tar-format archive "slices", each
//! bounded by a configurable byte budget. Files may optionally be
//! compressed individually (bzip2 preferred, gzip fallback) before being
//! embedded in the current slice. When a file would overflow the current
//! slice, the engine closes it and opens the next, handing the finished
//! slice to a pluggable [`collaborators::Sink`] when the target is remote.
//!
//! This crate is the engine only: traversal, compression, slicing, and
//! cancellation. It has no GUI, no prompt dialogs, and no upload
//! transport of its own — those are the [`collaborators::Sink`],
//! [`collaborators::Prompter`], and [`collaborators::ScriptHook`] traits,
//! implemented by the embedding application (see the `sliceback-cli`
//! crate for reference implementations).
//!
//! # Examples
//!
//! ```no_run
//! use sliceback_core::ArchiveRunBuilder;
//! use sliceback_core::collaborators::NoopSink;
//! use sliceback_core::config::Target;
//!
//! # fn main() -> sliceback_core::Result<()> {
//! let report = ArchiveRunBuilder::new(Target::Local("/tmp/backups".into()))
//!     .include("/home/user/documents")
//!     .exclude_file("/home/user/documents/scratch.tmp")
//!     .run(&mut NoopSink)?;
//! println!("archived {} files across {} slices", report.total_files, report.slices_written);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod archiver;
pub mod cancellation;
pub mod capacity;
pub mod collaborators;
pub mod compressor;
pub mod config;
pub mod error;
pub mod events;
pub mod io;
pub mod metadata;
pub mod profile;
pub mod slice;
pub mod tar_writer;
pub mod traversal;

pub use archiver::ArchiveRunBuilder;
pub use archiver::ArchiverController;
pub use archiver::RunOutcome;
pub use archiver::RunReport;
pub use archiver::SkippedFile;
pub use cancellation::CancellationToken;
pub use config::Codec;
pub use config::Config;
pub use config::SliceLimit;
pub use config::Target;
pub use error::Error;
pub use error::Result;
pub use events::Event;
pub use events::EventSink;
pub use profile::ProfilePass;
pub use traversal::ExcludeSet;
