//! Archive file naming convention
//!
//! Archives are named `<name>-<kind>-<YYYY-MM-DD-HH-mm-ss>.tar.gz` (UTC).
//! The filename is the archive's identity and its default remote key.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};

/// Suffix every archive carries
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";
const TIMESTAMP_LEN: usize = 19;

/// The parsed parts of an archive filename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveName {
    /// Human label, may contain `-`
    pub name: String,
    /// Backup category tag, never contains `-`
    pub kind: String,
    /// Creation instant, second resolution
    pub timestamp: DateTime<Utc>,
}

impl ArchiveName {
    /// Build a name, validating both labels
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> VaultResult<Self> {
        let name = name.into();
        let kind = kind.into();

        validate_label("name", &name)?;
        validate_label("kind", &kind)?;
        if kind.contains('-') {
            return Err(VaultError::Validation(format!(
                "Backup kind must not contain '-': {}",
                kind
            )));
        }

        Ok(Self {
            name,
            kind,
            // Sub-second precision is not part of the name.
            timestamp: timestamp.with_nanosecond(0).unwrap_or(timestamp),
        })
    }

    /// The archive filename for this name
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}-{}{}",
            self.name,
            self.kind,
            self.timestamp.format(TIMESTAMP_FORMAT),
            ARCHIVE_SUFFIX
        )
    }

    /// Parse a filename that follows the convention
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(ARCHIVE_SUFFIX)?;
        if stem.len() < TIMESTAMP_LEN + 4 || !stem.is_char_boundary(stem.len() - TIMESTAMP_LEN) {
            return None;
        }

        let (labels, stamp) = stem.split_at(stem.len() - TIMESTAMP_LEN);
        let labels = labels.strip_suffix('-')?;
        let (name, kind) = labels.rsplit_once('-')?;
        if name.is_empty() || kind.is_empty() {
            return None;
        }

        let naive = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
        Some(Self {
            name: name.to_string(),
            kind: kind.to_string(),
            timestamp: DateTime::from_naive_utc_and_offset(naive, Utc),
        })
    }
}

impl std::fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

/// Returns true if the filename carries the archive suffix
pub fn has_archive_suffix(file_name: &str) -> bool {
    file_name.ends_with(ARCHIVE_SUFFIX) && file_name.len() > ARCHIVE_SUFFIX.len()
}

fn validate_label(field: &str, value: &str) -> VaultResult<()> {
    if value.trim().is_empty() {
        return Err(VaultError::Validation(format!(
            "Backup {} must not be empty",
            field
        )));
    }
    if value.contains('/') || value.contains('\\') || value.contains("..") {
        return Err(VaultError::Validation(format!(
            "Backup {} must not contain path separators or '..': {}",
            field, value
        )));
    }
    if value.starts_with('.') {
        return Err(VaultError::Validation(format!(
            "Backup {} must not start with '.': {}",
            field, value
        )));
    }
    Ok(())
}
