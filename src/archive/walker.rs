//! Depth-first traversal of a source tree
//!
//! [`EntryWalker`] yields the root first and every directory before its
//! children, in file-name order, so the encoder can rely on parents being
//! recorded ahead of anything inside them. Symbolic links are never followed.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use tracing::debug;
use walkdir::WalkDir;

use super::entry::{mode_of, Entry, EntryKind};
use crate::error::{VaultError, VaultResult};

/// Lazy iterator over the entries of a directory tree
///
/// The first error ends the walk: the iterator yields it once and then
/// returns `None`.
pub struct EntryWalker {
    root: PathBuf,
    inner: walkdir::IntoIter,
    failed: bool,
}

impl EntryWalker {
    /// Start a walk at `root`, which must be a directory
    pub fn new(root: impl Into<PathBuf>) -> VaultResult<Self> {
        let root = root.into();
        let metadata =
            std::fs::symlink_metadata(&root).map_err(|e| VaultError::traversal(&root, e))?;
        if !metadata.is_dir() {
            return Err(VaultError::traversal(
                &root,
                io::Error::new(io::ErrorKind::InvalidInput, "source is not a directory"),
            ));
        }

        let inner = WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        Ok(Self {
            root,
            inner,
            failed: false,
        })
    }

    fn to_entry(&self, dir_entry: walkdir::DirEntry) -> VaultResult<Entry> {
        let path = dir_entry.path();
        let metadata = dir_entry
            .metadata()
            .map_err(|e| VaultError::traversal(path, io::Error::from(e)))?;

        let relative_path = relative_path(&self.root, path)?;
        let kind = EntryKind::from_metadata(&metadata);
        let size = if kind == EntryKind::File {
            metadata.len()
        } else {
            0
        };
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);

        debug!(path = %relative_path.display(), %kind, size, "walked entry");

        Ok(Entry {
            relative_path,
            kind,
            mode: mode_of(&metadata),
            size,
            mtime,
            source: path.to_path_buf(),
        })
    }
}

impl Iterator for EntryWalker {
    type Item = VaultResult<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let result = match self.inner.next()? {
            Ok(dir_entry) => self.to_entry(dir_entry),
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.root.clone());
                Err(VaultError::traversal(path, io::Error::from(err)))
            }
        };

        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

/// Walk the whole tree up front; a failed walk returns no entries at all
pub fn walk_all(root: impl Into<PathBuf>) -> VaultResult<Vec<Entry>> {
    EntryWalker::new(root)?.collect()
}

/// Path of `path` below `root`, normal components only
fn relative_path(root: &Path, path: &Path) -> VaultResult<PathBuf> {
    let stripped = path.strip_prefix(root).map_err(|_| {
        VaultError::traversal(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "path escapes the walk root"),
        )
    })?;

    let mut relative = PathBuf::new();
    for component in stripped.components() {
        match component {
            Component::Normal(name) => relative.push(name),
            Component::CurDir => {}
            _ => {
                return Err(VaultError::traversal(
                    path,
                    io::Error::new(io::ErrorKind::InvalidInput, "unexpected path component"),
                ))
            }
        }
    }
    Ok(relative)
}
