//! Random access to the entries of a packaged publication.
//!
//! Two backends are bundled: [`ExplodedArchive`] for a plain directory tree
//! and [`ZipArchive`] for a zip container such as an EPUB. Both expose their
//! entries under `/`-rooted POSIX paths and support ranged reads. Archive
//! I/O is blocking; async callers go through
//! [`ArchiveResource`](crate::resource::ArchiveResource), which moves reads
//! to the blocking thread pool.

mod container;
mod error;
mod exploded;
mod factory;

use std::fmt;
use std::ops::Range;
use std::path::PathBuf;

use bytes::Bytes;

pub use container::ZipArchive;
pub use error::ArchiveError;
pub use exploded::ExplodedArchive;
pub use factory::{
    ArchiveFactory, DefaultArchiveFactory, ExplodedArchiveFactory, ZipArchiveFactory,
};

/// Metadata of an entry, as recorded when the archive was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Absolute path of the entry, such as `/OEBPS/chapter1.xhtml`.
    pub path: String,
    /// Uncompressed length in bytes, when known.
    pub length: Option<u64>,
    /// Whether the entry is stored compressed.
    pub is_compressed: bool,
    /// Compressed length in bytes. Only set for compressed entries.
    pub compressed_length: Option<u64>,
}

/// Read access to a packaged publication.
pub trait Archive: Send + Sync + fmt::Debug {
    /// Returns the entries, sorted by path.
    fn entries(&self) -> Vec<ArchiveEntry>;

    /// Returns the entry at exactly `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::EntryNotFound`] when no entry has this path.
    fn entry(&self, path: &str) -> Result<ArchiveEntry, ArchiveError>;

    /// Reads the content of the entry at `path`, or only `range` of it.
    ///
    /// Ranges running past the end of the entry are truncated.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry does not exist, the archive is closed,
    /// or the underlying read fails.
    fn read(&self, path: &str, range: Option<Range<u64>>) -> Result<Bytes, ArchiveError>;

    /// Releases the underlying handle. Later reads fail with
    /// [`ArchiveError::Closed`].
    fn close(&self);

    /// Returns the on-disk location of the entry, for backends storing
    /// entries as plain files.
    fn file_path(&self, path: &str) -> Option<PathBuf> {
        let _ = path;
        None
    }

    /// Returns the write capability of the archive, if supported.
    fn as_mutable(&self) -> Option<&dyn MutableArchive> {
        None
    }
}

/// Archive whose entries can be replaced in place.
pub trait MutableArchive: Archive {
    /// Replaces the content of the entry at `path`, creating it if needed.
    ///
    /// `deflated` selects compressed storage for backends supporting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive is closed or cannot be written.
    fn replace(&self, path: &str, data: &[u8], deflated: bool) -> Result<(), ArchiveError>;
}

/// Clamps `range` to an entry of `length` bytes.
pub(crate) fn clamp_entry_range(range: Option<Range<u64>>, length: u64) -> Range<u64> {
    match range {
        Some(range) => crate::resource::clamp_range(range, length),
        None => 0..length,
    }
}

/// Converts an absolute entry path to the relative form used on disk and in
/// zip central directories.
pub(crate) fn relative_path(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}
