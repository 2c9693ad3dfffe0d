//! Resources stored as local files.

use std::io::SeekFrom;
use std::ops::Range;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::OnceCell;
use tracing::instrument;

use super::{Resource, ResourceError, clamp_range};
use crate::link::Link;

/// Resource backed by a file on the local filesystem.
#[derive(Debug)]
pub struct FileResource {
    link: Link,
    path: PathBuf,
    length: OnceCell<u64>,
}

impl FileResource {
    /// Creates a resource reading the file at `path`.
    pub fn new(link: Link, path: impl Into<PathBuf>) -> Self {
        Self {
            link,
            path: path.into(),
            length: OnceCell::new(),
        }
    }

    /// Returns the file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Resource for FileResource {
    fn link(&self) -> &Link {
        &self.link
    }

    fn file(&self) -> Option<&Path> {
        Some(&self.path)
    }

    async fn length(&self) -> Result<u64, ResourceError> {
        self.length
            .get_or_try_init(|| async {
                let metadata = fs::metadata(&self.path)
                    .await
                    .map_err(ResourceError::from_io)?;
                if metadata.is_dir() {
                    return Err(ResourceError::message(format!(
                        "{} is a directory",
                        self.path.display()
                    )));
                }
                Ok(metadata.len())
            })
            .await
            .copied()
    }

    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    async fn read(&self, range: Option<Range<u64>>) -> Result<Bytes, ResourceError> {
        let Some(range) = range else {
            let data = fs::read(&self.path).await.map_err(ResourceError::from_io)?;
            return Ok(Bytes::from(data));
        };

        let range = clamp_range(range, self.length().await?);
        if range.is_empty() {
            return Ok(Bytes::new());
        }

        let mut file = File::open(&self.path)
            .await
            .map_err(ResourceError::from_io)?;
        file.seek(SeekFrom::Start(range.start))
            .await
            .map_err(ResourceError::from_io)?;
        let mut data = Vec::new();
        file.take(range.end - range.start)
            .read_to_end(&mut data)
            .await
            .map_err(ResourceError::from_io)?;
        Ok(Bytes::from(data))
    }
}
