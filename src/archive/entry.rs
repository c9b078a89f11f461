//! Entry model shared by the walker, encoder and decoder

use std::fs::{File, Metadata};
use std::io;
use std::path::{Path, PathBuf};

/// Node type recorded for an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file with content
    File,
    /// Directory, no content
    Directory,
    /// Symlink, FIFO, device or socket; stored as a header-only shell
    Other,
}

impl EntryKind {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let file_type = metadata.file_type();
        if file_type.is_file() {
            EntryKind::File
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::Other
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::File => write!(f, "file"),
            EntryKind::Directory => write!(f, "directory"),
            EntryKind::Other => write!(f, "other"),
        }
    }
}

/// One node of a tree being archived
#[derive(Debug, Clone)]
pub struct Entry {
    /// Path relative to the tree root; empty for the root itself
    ///
    /// Kept as raw OS path bytes so names that are not valid UTF-8 survive.
    pub relative_path: PathBuf,
    pub kind: EntryKind,
    /// Permission bits
    pub mode: u32,
    /// Content length; always 0 unless `kind` is `File`
    pub size: u64,
    /// Modification time in seconds since the epoch
    pub mtime: u64,
    /// Absolute location of the node on disk
    pub source: PathBuf,
}

impl Entry {
    pub fn is_root(&self) -> bool {
        self.relative_path.as_os_str().is_empty()
    }

    /// Open the content stream of a regular file
    pub fn open_content(&self) -> io::Result<File> {
        File::open(&self.source)
    }

    /// Name used inside the container; the root is stored as `.`
    pub fn archive_path(&self) -> &Path {
        if self.is_root() {
            Path::new(".")
        } else {
            &self.relative_path
        }
    }
}

/// Permission bits of a node
#[cfg(unix)]
pub fn mode_of(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

/// Permission bits of a node
#[cfg(not(unix))]
pub fn mode_of(metadata: &Metadata) -> u32 {
    match (metadata.is_dir(), metadata.permissions().readonly()) {
        (true, _) => 0o755,
        (false, true) => 0o444,
        (false, false) => 0o644,
    }
}

/// Set POSIX permission bits on Unix.
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

/// Only the read-only bit survives on non-Unix targets.
#[cfg(not(unix))]
pub fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    let mut permissions = std::fs::metadata(path)?.permissions();
    permissions.set_readonly(mode & 0o222 == 0);
    std::fs::set_permissions(path, permissions)
}
