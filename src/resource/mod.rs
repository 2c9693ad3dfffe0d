//! Uniform byte access to publication resources.
//!
//! A [`Resource`] is anything the reader can read bytes from: an archive
//! entry, a local file, a remote HTTP resource, or a decorator around
//! another resource such as [`BufferedResource`]. All of them share the same
//! contract:
//!
//! - `read(None)` returns the whole content;
//! - `read(Some(range))` clamps `range` to `0..length` first, so a range
//!   running past the end is truncated and a range entirely past the end
//!   yields empty bytes;
//! - reads are repeatable, and a missing resource reports
//!   [`ResourceError::NotFound`] on every call.
//!
//! Resources are closed explicitly by whoever obtained them.

mod archive;
mod buffered;
mod error;
mod failure;
mod file;
mod http;
mod memory;

use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::link::Link;

pub use archive::ArchiveResource;
pub use buffered::BufferedResource;
pub use error::ResourceError;
pub use failure::FailureResource;
pub use file::FileResource;
pub use http::HttpResource;
pub use memory::MemoryResource;

/// Shareable error cause.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Readable resource of a publication.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Returns the link this resource was obtained from.
    fn link(&self) -> &Link;

    /// Returns the location of the resource on the local filesystem, when it
    /// is stored as a plain file.
    fn file(&self) -> Option<&Path> {
        None
    }

    /// Returns the length of the content in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] if the resource does not exist and
    /// [`ResourceError::Unavailable`] if its length cannot be determined.
    async fn length(&self) -> Result<u64, ResourceError>;

    /// Reads the whole content, or only `range` of it.
    ///
    /// # Errors
    ///
    /// Returns the [`ResourceError`] preventing the read.
    async fn read(&self, range: Option<Range<u64>>) -> Result<Bytes, ResourceError>;

    /// Releases the resources held by this instance.
    fn close(&self) {}
}

#[async_trait]
impl<R: Resource + ?Sized> Resource for Box<R> {
    fn link(&self) -> &Link {
        (**self).link()
    }

    fn file(&self) -> Option<&Path> {
        (**self).file()
    }

    async fn length(&self) -> Result<u64, ResourceError> {
        (**self).length().await
    }

    async fn read(&self, range: Option<Range<u64>>) -> Result<Bytes, ResourceError> {
        (**self).read(range).await
    }

    fn close(&self) {
        (**self).close();
    }
}

#[async_trait]
impl<R: Resource + ?Sized> Resource for Arc<R> {
    fn link(&self) -> &Link {
        (**self).link()
    }

    fn file(&self) -> Option<&Path> {
        (**self).file()
    }

    async fn length(&self) -> Result<u64, ResourceError> {
        (**self).length().await
    }

    async fn read(&self, range: Option<Range<u64>>) -> Result<Bytes, ResourceError> {
        (**self).read(range).await
    }

    fn close(&self) {
        (**self).close();
    }
}

/// Convenience readers available on every [`Resource`].
#[async_trait]
pub trait ResourceExt: Resource {
    /// Reads the whole content as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Other`] if the content is not valid UTF-8.
    async fn read_as_string(&self) -> Result<String, ResourceError> {
        let bytes = self.read(None).await?;
        String::from_utf8(bytes.to_vec()).map_err(ResourceError::other)
    }

    /// Reads the whole content as a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Other`] if the content is not valid JSON for
    /// `T`.
    async fn read_as_json<T>(&self) -> Result<T, ResourceError>
    where
        T: DeserializeOwned,
    {
        let bytes = self.read(None).await?;
        serde_json::from_slice(&bytes).map_err(ResourceError::other)
    }

    /// Wraps the resource in a [`BufferedResource`].
    fn buffered(self, buffer_size: u64) -> BufferedResource<Self>
    where
        Self: Sized,
    {
        BufferedResource::new(self, buffer_size)
    }
}

impl<R: Resource + ?Sized> ResourceExt for R {}

/// Clamps `range` to `0..length`.
///
/// The result is empty when `range` is entirely past the end or inverted.
#[must_use]
pub fn clamp_range(range: Range<u64>, length: u64) -> Range<u64> {
    let end = range.end.min(length);
    let start = range.start.min(end);
    start..end
}
