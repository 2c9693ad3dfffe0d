//! Resources stored as archive entries.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::{Resource, ResourceError, clamp_range};
use crate::archive::Archive;
use crate::link::Link;

/// Entry of an [`Archive`] exposed as a resource.
///
/// Archive I/O is blocking and runs on the tokio blocking pool.
#[derive(Debug)]
pub struct ArchiveResource {
    link: Link,
    archive: Arc<dyn Archive>,
    path: String,
    file: Option<PathBuf>,
}

impl ArchiveResource {
    /// Creates a resource reading the entry at `path`.
    pub fn new(link: Link, archive: Arc<dyn Archive>, path: impl Into<String>) -> Self {
        let path = path.into();
        let file = archive.file_path(&path);
        Self {
            link,
            archive,
            path,
            file,
        }
    }

    /// Returns the entry path.
    #[must_use]
    pub fn entry_path(&self) -> &str {
        &self.path
    }

    async fn read_entry(&self, range: Option<Range<u64>>) -> Result<Bytes, ResourceError> {
        let archive = Arc::clone(&self.archive);
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || archive.read(&path, range))
            .await
            .map_err(ResourceError::other)?
            .map_err(ResourceError::from_archive)
    }
}

#[async_trait]
impl Resource for ArchiveResource {
    fn link(&self) -> &Link {
        &self.link
    }

    fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    async fn length(&self) -> Result<u64, ResourceError> {
        let entry = self
            .archive
            .entry(&self.path)
            .map_err(ResourceError::from_archive)?;
        match entry.length {
            Some(length) => Ok(length),
            None => Ok(self.read_entry(None).await?.len() as u64),
        }
    }

    async fn read(&self, range: Option<Range<u64>>) -> Result<Bytes, ResourceError> {
        let range = match range {
            Some(range) => {
                let range = clamp_range(range, self.length().await?);
                if range.is_empty() {
                    return Ok(Bytes::new());
                }
                Some(range)
            }
            None => None,
        };
        self.read_entry(range).await
    }
}
