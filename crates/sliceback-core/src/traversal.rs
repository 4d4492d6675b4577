//! Walks the configured include paths, yielding entries in the order the
//! Archiver Controller can add directly to the current slice.

use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use walkdir::WalkDir;

use crate::Error;
use crate::Result;
use crate::metadata::EntryMetadata;

/// What kind of filesystem object a [`WalkEntry`] refers to.
#[derive(Debug, Clone)]
pub enum EntryType {
    /// A regular file.
    File,
    /// A directory (yielded before any of its children).
    Directory,
    /// A symlink, carrying the link target read once during the walk so
    /// the Tar Slice Writer never needs to re-`readlink`.
    Symlink(PathBuf),
}

/// One entry produced by [`walk`].
#[derive(Debug, Clone)]
pub struct WalkEntry {
    /// Absolute path of the entry.
    pub path: PathBuf,
    /// What kind of entry this is.
    pub entry_type: EntryType,
    /// Tar-representable metadata taken from the entry's own `stat()`
    /// (the symlink's own metadata, not the target it points at).
    pub metadata: EntryMetadata,
}

/// Absolute paths excluded from a walk, by exact match (not glob).
///
/// A directory in `dirs` excludes its entire subtree; a path in `files`
/// excludes only that single entry.
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    dirs: HashSet<PathBuf>,
    files: HashSet<PathBuf>,
}

impl ExcludeSet {
    /// Creates an empty exclude set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Excludes `path` and its entire subtree.
    pub fn add_dir(&mut self, path: PathBuf) {
        self.dirs.insert(path);
    }

    /// Excludes the single file at `path`.
    pub fn add_file(&mut self, path: PathBuf) {
        self.files.insert(path);
    }

    fn excludes(&self, path: &Path) -> bool {
        self.dirs.contains(path) || self.files.contains(path)
    }

    /// Returns a copy with every excluded path resolved via
    /// [`absolutize`], so exclude matching lines up with include roots
    /// regardless of how each path was originally spelled (relative,
    /// with a trailing separator, with `.`/`..` components).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the current directory cannot be
    /// determined while resolving a relative path.
    pub fn resolved(&self) -> Result<Self> {
        let dirs = self.dirs.iter().map(|path| absolutize(path)).collect::<Result<HashSet<_>>>()?;
        let files = self.files.iter().map(|path| absolutize(path)).collect::<Result<HashSet<_>>>()?;
        Ok(Self { dirs, files })
    }
}

/// Resolves `path` to an absolute, lexically normalized path: joins it
/// against the current working directory if relative, strips a
/// trailing separator, and collapses `.`/`..` components.
///
/// Deliberately lexical, not [`std::fs::canonicalize`]: it does not
/// follow symlinks, so an include root that is itself a symlink still
/// walks as the literal path named on the command line rather than the
/// path its target resolves to.
///
/// # Errors
///
/// Returns [`Error::Io`] if `path` is relative and the current
/// directory cannot be determined.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut result = PathBuf::new();
    for component in joined.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                result.pop();
            }
            other => result.push(other.as_os_str()),
        }
    }
    Ok(result)
}

fn entry_from_path(path: &Path) -> Result<WalkEntry> {
    let symlink_metadata = std::fs::symlink_metadata(path)?;

    if symlink_metadata.file_type().is_symlink() {
        let target = std::fs::read_link(path)?;
        return Ok(WalkEntry {
            path: path.to_path_buf(),
            entry_type: EntryType::Symlink(target),
            metadata: EntryMetadata::from_std(&symlink_metadata),
        });
    }

    if symlink_metadata.is_dir() {
        return Ok(WalkEntry {
            path: path.to_path_buf(),
            entry_type: EntryType::Directory,
            metadata: EntryMetadata::from_std(&symlink_metadata),
        });
    }

    let metadata = std::fs::metadata(path)?;
    Ok(WalkEntry {
        path: path.to_path_buf(),
        entry_type: EntryType::File,
        metadata: EntryMetadata::from_std(&metadata),
    })
}

/// Walks every `include_paths` root, yielding entries pre-order (a
/// directory's own entry before its children), never following
/// symlinks, and skipping any path (and, for directories, its subtree)
/// present in `excludes`.
///
/// `include_paths` must already be absolute; `excludes` is matched by
/// exact path, so both sides of the comparison must already be resolved
/// via [`absolutize`]/[`ExcludeSet::resolved`] before this function is
/// invoked (`ArchiverController::run` does this for its callers).
///
/// An unreadable directory or file yields `Err` for that entry rather
/// than aborting the whole walk; the caller (Archiver Controller) is
/// expected to treat such an error as recoverable: warn and continue.
pub fn walk<'a>(
    include_paths: &'a [PathBuf],
    excludes: &'a ExcludeSet,
) -> impl Iterator<Item = Result<WalkEntry>> + 'a {
    include_paths.iter().flat_map(move |root| walk_root(root, excludes))
}

fn walk_root<'a>(root: &'a Path, excludes: &'a ExcludeSet) -> Box<dyn Iterator<Item = Result<WalkEntry>> + 'a> {
    if excludes.excludes(root) {
        return Box::new(std::iter::empty());
    }

    let Ok(root_symlink_metadata) = std::fs::symlink_metadata(root) else {
        return Box::new(std::iter::once(entry_from_path(root)));
    };

    if !root_symlink_metadata.is_dir() || root_symlink_metadata.file_type().is_symlink() {
        return Box::new(std::iter::once(entry_from_path(root)));
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(move |entry| !excludes.excludes(entry.path()));

    Box::new(walker.map(move |entry| match entry {
        Ok(entry) => entry_from_path(entry.path()),
        Err(err) => Err(Error::Io(std::io::Error::other(format!(
            "walk error under {}: {err}",
            root.display()
        )))),
    }))
}
