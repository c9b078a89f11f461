//! Archive decoder: compressed tar stream in, directory tree out
//!
//! Entries are processed strictly in stored order. Directories are created as
//! they are met; regular files get their parent created, their exact content
//! copied and their mode applied. Anything else is skipped. A failure stops
//! extraction where it is: whatever was already written stays on disk.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::{Archive, EntryType};
use tracing::{debug, info, warn};

use super::entry::{set_mode, EntryKind};
use crate::error::{VaultError, VaultResult};

/// Counters reported once an archive is fully extracted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub files: u64,
    pub directories: u64,
    pub skipped: u64,
    pub content_bytes: u64,
}

/// Header-level view of one stored entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySummary {
    pub path: String,
    pub kind: EntryKind,
    pub mode: u32,
    pub size: u64,
}

/// Reads a compressed container produced by the encoder
pub struct ArchiveDecoder<R: Read> {
    archive: Archive<GzDecoder<R>>,
    /// Archive label used in error messages
    source: PathBuf,
}

impl ArchiveDecoder<BufReader<File>> {
    /// Open an archive file for reading; the file is never written to
    pub fn open(path: &Path) -> VaultResult<Self> {
        let file = File::open(path).map_err(|e| VaultError::decoding(path, e))?;
        Ok(Self::new(BufReader::new(file), path))
    }
}

impl<R: Read> ArchiveDecoder<R> {
    pub fn new(reader: R, source: impl Into<PathBuf>) -> Self {
        Self {
            archive: Archive::new(GzDecoder::new(reader)),
            source: source.into(),
        }
    }

    /// Recreate every stored entry below `target`
    pub fn extract_to(mut self, target: &Path) -> VaultResult<DecodeStats> {
        info!(archive = %self.source.display(), target = %target.display(), "restoring archive");

        fs::create_dir_all(target).map_err(|e| self.write_error(target, e))?;

        let mut stats = DecodeStats::default();
        // Directory modes wait until their contents are in place.
        let mut directory_modes: Vec<(PathBuf, u32)> = Vec::new();

        let entries = self
            .archive
            .entries()
            .map_err(|e| VaultError::decoding(&self.source, e))?;

        for entry in entries {
            let mut entry = entry.map_err(|e| VaultError::decoding(&self.source, e))?;
            let raw_path = entry
                .path()
                .map_err(|e| VaultError::decoding(&self.source, e))?
                .into_owned();
            let relative = sanitize(&raw_path)
                .ok_or_else(|| {
                    VaultError::decoding(
                        &self.source,
                        format!("refusing unsafe entry path '{}'", raw_path.display()),
                    )
                })?;
            let header = entry.header();
            let entry_type = header.entry_type();
            let mode = header
                .mode()
                .map_err(|e| VaultError::decoding(&self.source, e))?;
            let declared = header
                .size()
                .map_err(|e| VaultError::decoding(&self.source, e))?;
            let destination = target.join(&relative);

            match kind_of(entry_type) {
                EntryKind::Directory => {
                    fs::create_dir_all(&destination)
                        .map_err(|e| write_error(&self.source, &destination, e))?;
                    directory_modes.push((destination, mode));
                    stats.directories += 1;
                }
                EntryKind::File => {
                    if let Some(parent) = destination.parent() {
                        fs::create_dir_all(parent)
                            .map_err(|e| write_error(&self.source, parent, e))?;
                    }
                    let copied = copy_exact(&mut entry, &destination, declared)
                        .map_err(|e| write_error(&self.source, &destination, e))?;
                    if copied != declared {
                        return Err(VaultError::decoding(
                            &self.source,
                            format!(
                                "entry '{}' is truncated: expected {} bytes, got {}",
                                raw_path.display(),
                                declared,
                                copied
                            ),
                        ));
                    }
                    set_mode(&destination, mode)
                        .map_err(|e| write_error(&self.source, &destination, e))?;

                    stats.files += 1;
                    stats.content_bytes += copied;
                    debug!(path = %relative.display(), size = copied, "restored file");
                }
                EntryKind::Other => {
                    warn!(
                        path = %raw_path.display(),
                        ?entry_type,
                        "skipping unsupported entry"
                    );
                    stats.skipped += 1;
                }
            }
        }

        // Drain to the gzip trailer so a cut after the last entry is caught.
        let mut rest = self.archive.into_inner();
        io::copy(&mut rest, &mut io::sink()).map_err(|e| VaultError::decoding(&self.source, e))?;

        for (path, mode) in directory_modes.iter().rev() {
            set_mode(path, *mode).map_err(|e| write_error(&self.source, path, e))?;
        }

        info!(
            archive = %self.source.display(),
            files = stats.files,
            directories = stats.directories,
            skipped = stats.skipped,
            bytes = stats.content_bytes,
            "archive restored"
        );
        Ok(stats)
    }

    /// List stored entries without writing anything
    pub fn entries(mut self) -> VaultResult<Vec<EntrySummary>> {
        let mut summaries = Vec::new();
        let entries = self
            .archive
            .entries()
            .map_err(|e| VaultError::decoding(&self.source, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| VaultError::decoding(&self.source, e))?;
            let header = entry.header();
            summaries.push(EntrySummary {
                path: entry
                    .path()
                    .map_err(|e| VaultError::decoding(&self.source, e))?
                    .to_string_lossy()
                    .into_owned(),
                kind: kind_of(header.entry_type()),
                mode: header
                    .mode()
                    .map_err(|e| VaultError::decoding(&self.source, e))?,
                size: header
                    .size()
                    .map_err(|e| VaultError::decoding(&self.source, e))?,
            });
        }

        let mut rest = self.archive.into_inner();
        io::copy(&mut rest, &mut io::sink()).map_err(|e| VaultError::decoding(&self.source, e))?;
        Ok(summaries)
    }

    fn write_error(&self, path: &Path, err: io::Error) -> VaultError {
        write_error(&self.source, path, err)
    }
}

fn write_error(archive: &Path, path: &Path, err: io::Error) -> VaultError {
    VaultError::decoding(archive, format!("failed to write {}: {}", path.display(), err))
}

fn kind_of(entry_type: EntryType) -> EntryKind {
    match entry_type {
        EntryType::Regular | EntryType::Continuous => EntryKind::File,
        EntryType::Directory => EntryKind::Directory,
        _ => EntryKind::Other,
    }
}

/// Stored path reduced to normal components; `None` if it could escape
fn sanitize(path: &Path) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(clean)
}

/// Copy up to `len` bytes of `reader` into a new file at `path`
fn copy_exact<R: Read>(reader: &mut R, path: &Path, len: u64) -> io::Result<u64> {
    let mut out = BufWriter::new(File::create(path)?);
    let copied = io::copy(&mut reader.take(len), &mut out)?;
    out.flush()?;
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::encoder::encode_tree;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    fn encode(root: &Path) -> Vec<u8> {
        encode_tree(root, Vec::new(), "memory").unwrap().0
    }

    #[test]
    fn test_extract_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        fs::create_dir_all(src.join("empty/deeper")).unwrap();
        fs::create_dir_all(src.join("conf")).unwrap();
        fs::write(src.join("conf/site.conf"), b"server_name example.com;").unwrap();
        fs::write(src.join("zero.bin"), b"").unwrap();

        let bytes = encode(&src);
        let out = temp_dir.path().join("out");
        let stats = ArchiveDecoder::new(&bytes[..], "memory")
            .extract_to(&out)
            .unwrap();

        assert_eq!(
            fs::read(out.join("conf/site.conf")).unwrap(),
            b"server_name example.com;"
        );
        assert_eq!(fs::read(out.join("zero.bin")).unwrap(), b"");
        assert!(out.join("empty/deeper").is_dir());
        assert_eq!(stats.files, 2);
        assert_eq!(stats.directories, 4);
    }

    #[test]
    fn test_truncated_stream_is_decoding_error() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let payload: Vec<u8> = (0..200_000u32).flat_map(|i| i.to_le_bytes()).collect();
        fs::write(src.join("big.bin"), &payload).unwrap();

        let bytes = encode(&src);
        let cut = &bytes[..bytes.len() / 2];

        let err = ArchiveDecoder::new(cut, "memory")
            .extract_to(&temp_dir.path().join("out"))
            .unwrap_err();
        assert!(err.is_decoding());
    }

    #[test]
    fn test_garbage_is_decoding_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = ArchiveDecoder::new(&b"definitely not gzip"[..], "memory")
            .extract_to(&temp_dir.path().join("out"))
            .unwrap_err();
        assert!(err.is_decoding());
    }

    #[test]
    fn test_parent_dir_entries_are_refused() {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(4);
        header.set_mode(0o644);
        // set_path rejects `..`, so write the name bytes directly.
        let name = b"../escape.txt";
        header.as_old_mut().name[..name.len()].copy_from_slice(name);
        header.set_cksum();
        builder.append(&header, &b"evil"[..]).unwrap();
        let bytes = builder.into_inner().unwrap().finish().unwrap();

        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out");
        let err = ArchiveDecoder::new(&bytes[..], "memory")
            .extract_to(&out)
            .unwrap_err();

        assert!(err.is_decoding());
        assert!(!temp_dir.path().join("escape.txt").exists());
    }

    #[test]
    fn test_entries_lists_without_extracting() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), b"abc").unwrap();

        let bytes = encode(temp_dir.path());
        let summaries = ArchiveDecoder::new(&bytes[..], "memory").entries().unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[1].path, "a.txt");
        assert_eq!(summaries[1].kind, EntryKind::File);
        assert_eq!(summaries[1].size, 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_modes_are_applied() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        fs::create_dir_all(src.join("private")).unwrap();
        fs::write(src.join("private/key.pem"), b"secret").unwrap();
        set_mode(&src.join("private/key.pem"), 0o600).unwrap();
        set_mode(&src.join("private"), 0o700).unwrap();
        fs::write(src.join("run.sh"), b"#!/bin/sh\n").unwrap();
        set_mode(&src.join("run.sh"), 0o755).unwrap();

        let bytes = encode(&src);
        let out = temp_dir.path().join("out");
        ArchiveDecoder::new(&bytes[..], "memory")
            .extract_to(&out)
            .unwrap();

        let mode = |p: &str| fs::metadata(out.join(p)).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode("private/key.pem"), 0o600);
        assert_eq!(mode("private"), 0o700);
        assert_eq!(mode("run.sh"), 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_entries_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("target.txt"), b"t").unwrap();
        std::os::unix::fs::symlink("target.txt", src.join("alias")).unwrap();

        let bytes = encode(&src);
        let out = temp_dir.path().join("out");
        let stats = ArchiveDecoder::new(&bytes[..], "memory")
            .extract_to(&out)
            .unwrap();

        assert_eq!(stats.skipped, 1);
        assert!(out.join("target.txt").exists());
        assert!(fs::symlink_metadata(out.join("alias")).is_err());
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize(Path::new("./a/b")), Some(PathBuf::from("a/b")));
        assert_eq!(sanitize(Path::new(".")), Some(PathBuf::new()));
        assert_eq!(sanitize(Path::new("a/../../b")), None);
        assert_eq!(sanitize(Path::new("/etc/passwd")), None);
    }
}
