//! Archive encoder: entries in, gzip-compressed tar stream out
//!
//! Each entry becomes one tar header followed by exactly `size` content
//! bytes. The whole tar stream goes through a single gzip stream.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Builder, EntryType, Header};
use tracing::{debug, info};

use super::entry::{Entry, EntryKind};
use super::walker::EntryWalker;
use crate::error::{VaultError, VaultResult};

/// Counters reported once an archive is finished
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeStats {
    pub entries: u64,
    pub files: u64,
    pub directories: u64,
    pub others: u64,
    pub content_bytes: u64,
}

/// Streams entries into a compressed container
pub struct ArchiveEncoder<W: Write> {
    builder: Builder<GzEncoder<W>>,
    /// Destination label used in error messages
    target: PathBuf,
    stats: EncodeStats,
}

impl<W: Write> ArchiveEncoder<W> {
    pub fn new(sink: W, target: impl Into<PathBuf>) -> Self {
        let gz = GzEncoder::new(sink, Compression::default());
        Self {
            builder: Builder::new(gz),
            target: target.into(),
            stats: EncodeStats::default(),
        }
    }

    /// Append one entry; regular files are streamed from disk
    pub fn append(&mut self, entry: &Entry) -> VaultResult<()> {
        let mut header = Header::new_gnu();
        header.set_mode(entry.mode);
        header.set_mtime(entry.mtime);

        match entry.kind {
            EntryKind::File => {
                header.set_entry_type(EntryType::Regular);
                header.set_size(entry.size);

                let file = entry
                    .open_content()
                    .map_err(|e| VaultError::traversal(&entry.source, e))?;
                let content = ExactReader::new(file, entry.size);

                self.builder
                    .append_data(&mut header, entry.archive_path(), content)
                    .map_err(|e| self.error_for(entry, e))?;

                self.stats.files += 1;
                self.stats.content_bytes += entry.size;
            }
            EntryKind::Directory => {
                header.set_entry_type(EntryType::Directory);
                header.set_size(0);
                self.builder
                    .append_data(&mut header, entry.archive_path(), io::empty())
                    .map_err(|e| self.error_for(entry, e))?;
                self.stats.directories += 1;
            }
            EntryKind::Other => {
                // Shell only: type and mode survive, content does not.
                header.set_size(0);
                match std::fs::read_link(&entry.source) {
                    Ok(link_target) => {
                        header.set_entry_type(EntryType::Symlink);
                        self.builder
                            .append_link(&mut header, entry.archive_path(), link_target)
                            .map_err(|e| self.error_for(entry, e))?;
                    }
                    // Not a link: FIFO, socket or device.
                    Err(e) if e.kind() == io::ErrorKind::InvalidInput => {
                        header.set_entry_type(EntryType::Fifo);
                        self.builder
                            .append_data(&mut header, entry.archive_path(), io::empty())
                            .map_err(|e| self.error_for(entry, e))?;
                    }
                    Err(e) => return Err(VaultError::traversal(&entry.source, e)),
                }
                self.stats.others += 1;
            }
        }

        self.stats.entries += 1;
        debug!(path = %entry.archive_path().display(), kind = %entry.kind, size = entry.size, "encoded entry");
        Ok(())
    }

    /// Close the tar layer, then the gzip layer, and hand back the sink
    ///
    /// The caller still owns flushing and syncing the returned sink.
    pub fn finish(self) -> VaultResult<(W, EncodeStats)> {
        let target = self.target;
        let gz = self
            .builder
            .into_inner()
            .map_err(|e| VaultError::encoding(&target, e))?;
        let sink = gz.finish().map_err(|e| VaultError::encoding(&target, e))?;
        Ok((sink, self.stats))
    }

    fn error_for(&self, entry: &Entry, err: io::Error) -> VaultError {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            // The source file changed size while it was being read.
            VaultError::traversal(&entry.source, err)
        } else {
            VaultError::encoding(&self.target, err)
        }
    }
}

/// Encode every entry under `root` into `sink`
pub fn encode_tree<W: Write>(
    root: &Path,
    sink: W,
    target: impl Into<PathBuf>,
) -> VaultResult<(W, EncodeStats)> {
    let target = target.into();
    info!(source = %root.display(), target = %target.display(), "encoding archive");

    let mut encoder = ArchiveEncoder::new(sink, &target);
    for entry in EntryWalker::new(root)? {
        encoder.append(&entry?)?;
    }
    let (sink, stats) = encoder.finish()?;

    info!(
        target = %target.display(),
        entries = stats.entries,
        bytes = stats.content_bytes,
        "archive encoded"
    );
    Ok((sink, stats))
}

/// Reader that yields exactly `remaining` bytes or fails
///
/// tar pads short content silently, so a file that shrank mid-read would
/// otherwise corrupt every header after it.
struct ExactReader<R> {
    inner: io::Take<R>,
    remaining: u64,
}

impl<R: Read> ExactReader<R> {
    fn new(inner: R, len: u64) -> Self {
        Self {
            inner: inner.take(len),
            remaining: len,
        }
    }
}

impl<R: Read> Read for ExactReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let n = self.inner.read(buf)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("file ended {} bytes early", self.remaining),
            ));
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}
