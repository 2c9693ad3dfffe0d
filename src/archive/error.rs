//! Error types for the archive backends.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while opening or reading an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The file is not an archive this backend understands.
    #[error("failed to open archive {}: {reason}", path.display())]
    OpenFailed {
        /// Path of the archive.
        path: PathBuf,
        /// Why the backend rejected it.
        reason: String,
    },

    /// The archive is encrypted and the password is missing or wrong.
    #[error("invalid password for archive {}", path.display())]
    InvalidPassword {
        /// Path of the archive.
        path: PathBuf,
    },

    /// No entry has this exact path.
    #[error("archive entry not found: {path}")]
    EntryNotFound {
        /// Requested entry path.
        path: String,
    },

    /// Reading or writing an entry failed.
    #[error("IO error on archive entry {path}: {source}")]
    Io {
        /// Entry path.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The zip container is corrupted or uses an unsupported feature.
    #[error("zip error on archive entry {path}: {source}")]
    Zip {
        /// Entry path.
        path: String,
        /// The underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },

    /// The archive was closed.
    #[error("archive is closed")]
    Closed,
}

impl ArchiveError {
    /// Creates an open failure.
    pub fn open_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::OpenFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid password error.
    pub fn invalid_password(path: impl Into<PathBuf>) -> Self {
        Self::InvalidPassword { path: path.into() }
    }

    /// Creates an entry not found error.
    pub fn entry_not_found(path: impl Into<String>) -> Self {
        Self::EntryNotFound { path: path.into() }
    }

    /// Creates an IO error for the entry `path`.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a zip error for the entry `path`.
    ///
    /// Missing entries are reported as [`ArchiveError::EntryNotFound`].
    pub fn zip(path: impl Into<String>, source: zip::result::ZipError) -> Self {
        let path = path.into();
        match source {
            zip::result::ZipError::FileNotFound => Self::EntryNotFound { path },
            source => Self::Zip { path, source },
        }
    }

    /// Returns true when the error means the entry does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::EntryNotFound { .. } => true,
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
