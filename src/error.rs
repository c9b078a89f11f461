//! Custom error types for Hostvault
//!
//! Every archive, catalog and transfer operation reports failures through
//! [`VaultError`]. Each variant carries the path or remote key it failed on.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for Hostvault operations
#[derive(Error, Debug)]
pub enum VaultError {
    /// A source node could not be read while walking a tree
    #[error("Traversal error at {}: {source}", .path.display())]
    Traversal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the container or the compressed stream failed
    #[error("Encoding error at {}: {source}", .path.display())]
    Encoding {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive is malformed or truncated, or the restore could not write
    #[error("Decoding error at {}: {message}", .path.display())]
    Decoding { path: PathBuf, message: String },

    /// The storage root could not be enumerated
    #[error("Catalog error at {}: {source}", .path.display())]
    Catalog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The object store rejected or failed a transfer
    #[error("Transfer error for '{key}': {message}")]
    Transfer { key: String, message: String },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller-supplied values that cannot be used
    #[error("Validation error: {0}")]
    Validation(String),

    /// File I/O errors outside the archive pipeline
    #[error("I/O error: {0}")]
    Io(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },
}

impl VaultError {
    pub fn traversal(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Traversal {
            path: path.into(),
            source,
        }
    }

    pub fn encoding(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Encoding {
            path: path.into(),
            source,
        }
    }

    pub fn decoding(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::Decoding {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn catalog(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Catalog {
            path: path.into(),
            source,
        }
    }

    pub fn transfer(key: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Transfer {
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Create a "not found" error for archives
    pub fn archive_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Archive",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a decoding error
    pub fn is_decoding(&self) -> bool {
        matches!(self, Self::Decoding { .. })
    }

    /// Check if this is a traversal error
    pub fn is_traversal(&self) -> bool {
        matches!(self, Self::Traversal { .. })
    }

    /// Check if a retry of the same call could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transfer { .. })
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_yaml::Error> for VaultError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for Hostvault operations
pub type VaultResult<T> = Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_path() {
        let err = VaultError::decoding("/var/backups/a.tar.gz", "unexpected end of archive");
        assert_eq!(
            err.to_string(),
            "Decoding error at /var/backups/a.tar.gz: unexpected end of archive"
        );
        assert!(err.is_decoding());
    }

    #[test]
    fn test_not_found_error() {
        let err = VaultError::archive_not_found("site1-full-2025-01-01-00-00-00.tar.gz");
        assert_eq!(
            err.to_string(),
            "Archive not found: site1-full-2025-01-01-00-00-00.tar.gz"
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_traversal_keeps_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = VaultError::traversal("/srv/site/secret", io_err);
        assert!(err.is_traversal());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_only_transfer_is_transient() {
        assert!(VaultError::transfer("k", "timeout").is_transient());
        assert!(!VaultError::Config("bad".into()).is_transient());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let vault_err: VaultError = io_err.into();
        assert!(matches!(vault_err, VaultError::Io(_)));
    }
}
