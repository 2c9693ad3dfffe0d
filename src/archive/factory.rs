//! Opening archives without knowing their format up front.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::{Archive, ArchiveError, ExplodedArchive, ZipArchive};

/// Opens archives of one or several formats.
pub trait ArchiveFactory: Send + Sync {
    /// Opens the archive at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::OpenFailed`] when the file is not in a format
    /// this factory supports, or [`ArchiveError::InvalidPassword`] when the
    /// password does not decrypt it.
    fn open(&self, path: &Path, password: Option<&str>) -> Result<Arc<dyn Archive>, ArchiveError>;
}

/// Opens directories as [`ExplodedArchive`]s. Passwords are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplodedArchiveFactory;

impl ArchiveFactory for ExplodedArchiveFactory {
    fn open(&self, path: &Path, _password: Option<&str>) -> Result<Arc<dyn Archive>, ArchiveError> {
        Ok(Arc::new(ExplodedArchive::open(path)?))
    }
}

/// Opens zip containers as [`ZipArchive`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveFactory;

impl ArchiveFactory for ZipArchiveFactory {
    fn open(&self, path: &Path, password: Option<&str>) -> Result<Arc<dyn Archive>, ArchiveError> {
        Ok(Arc::new(ZipArchive::open(path, password)?))
    }
}

/// Tries the exploded directory backend, then the zip backend.
pub struct DefaultArchiveFactory {
    factories: Vec<Box<dyn ArchiveFactory>>,
}

impl Default for DefaultArchiveFactory {
    fn default() -> Self {
        Self {
            factories: vec![
                Box::new(ExplodedArchiveFactory),
                Box::new(ZipArchiveFactory),
            ],
        }
    }
}

impl DefaultArchiveFactory {
    /// Creates the factory with the bundled backends.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArchiveFactory for DefaultArchiveFactory {
    fn open(&self, path: &Path, password: Option<&str>) -> Result<Arc<dyn Archive>, ArchiveError> {
        let mut last_error = ArchiveError::open_failed(path, "no archive backend available");
        for factory in &self.factories {
            match factory.open(path, password) {
                Ok(archive) => return Ok(archive),
                Err(error @ ArchiveError::InvalidPassword { .. }) => return Err(error),
                Err(error) => {
                    debug!(path = %path.display(), %error, "archive backend rejected file");
                    last_error = error;
                }
            }
        }
        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_directory_opens_as_exploded() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("mimetype"), "application/epub+zip").unwrap();
        let archive = DefaultArchiveFactory::new().open(dir.path(), None).unwrap();
        assert!(archive.file_path("/mimetype").is_some());
    }

    #[test]
    fn test_zip_file_opens_as_zip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("book.zip");
        let mut writer = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
        writer
            .start_file("mimetype", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"application/epub+zip").unwrap();
        writer.finish().unwrap();

        let archive = DefaultArchiveFactory::new().open(&path, None).unwrap();
        assert!(archive.file_path("/mimetype").is_none());
        assert_eq!(archive.entries().len(), 1);
    }

    #[test]
    fn test_unsupported_file_reports_last_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "plain text").unwrap();
        let error = DefaultArchiveFactory::new().open(&path, None).unwrap_err();
        assert!(matches!(error, ArchiveError::OpenFailed { .. }));
    }
}
