//! Fetcher serving the entries of an archive.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::instrument;

use super::{Fetcher, rooted};
use crate::archive::{Archive, ArchiveError, ArchiveFactory, DefaultArchiveFactory};
use crate::link::Link;
use crate::media_type;
use crate::resource::{ArchiveResource, FailureResource, Resource};

/// Fetcher exposing every entry of an [`Archive`].
#[derive(Debug, Clone)]
pub struct ArchiveFetcher {
    archive: Arc<dyn Archive>,
}

impl ArchiveFetcher {
    /// Creates a fetcher over an opened archive.
    #[must_use]
    pub fn new(archive: Arc<dyn Archive>) -> Self {
        Self { archive }
    }

    /// Opens the directory or zip container at `path` with the
    /// [`DefaultArchiveFactory`].
    ///
    /// # Errors
    ///
    /// Returns the [`ArchiveError`] of the last backend tried.
    #[instrument(level = "debug", skip(password), fields(path = %path.display()))]
    pub async fn open(path: PathBuf, password: Option<String>) -> Result<Self, ArchiveError> {
        let opening = path.clone();
        let archive = tokio::task::spawn_blocking(move || {
            DefaultArchiveFactory::new().open(&opening, password.as_deref())
        })
        .await
        .map_err(|e| ArchiveError::open_failed(&path, e.to_string()))??;
        Ok(Self::new(archive))
    }

    /// Returns the underlying archive.
    #[must_use]
    pub fn archive(&self) -> &Arc<dyn Archive> {
        &self.archive
    }
}

impl Fetcher for ArchiveFetcher {
    fn links(&self) -> Vec<Link> {
        self.archive
            .entries()
            .into_iter()
            .map(|entry| {
                let link = Link::new(entry.path.as_str());
                match media_type::guess_from_path(&entry.path) {
                    Some(media_type) => link.with_media_type(media_type.essence_str()),
                    None => link,
                }
            })
            .collect()
    }

    fn get(&self, link: &Link) -> Box<dyn Resource> {
        let path = rooted(&link.href_path());
        if self.archive.entry(&path).is_err() {
            return Box::new(FailureResource::not_found(link.clone()));
        }
        Box::new(ArchiveResource::new(
            link.clone(),
            Arc::clone(&self.archive),
            path,
        ))
    }

    fn close(&self) {
        self.archive.close();
    }
}
