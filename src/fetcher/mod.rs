//! Resolution of links to resources.
//!
//! A [`Fetcher`] is the entry point of the rest of the reader into this
//! crate: given a [`Link`] found in a publication, it returns the matching
//! [`Resource`]. Unknown links still yield a resource, one failing with
//! [`ResourceError::NotFound`](crate::resource::ResourceError::NotFound), so
//! that errors surface where the bytes are actually needed.

mod archive;
mod file;
mod http;

use crate::link::Link;
use crate::resource::Resource;

pub use archive::ArchiveFetcher;
pub use file::FileFetcher;
pub use http::HttpFetcher;

/// Provides access to the resources of a publication.
pub trait Fetcher: Send + Sync {
    /// Returns the links of the known resources, when they can be listed.
    fn links(&self) -> Vec<Link>;

    /// Returns the resource for `link`.
    fn get(&self, link: &Link) -> Box<dyn Resource>;

    /// Releases the resources held by the fetcher.
    fn close(&self) {}
}

/// Normalizes an href to the `/`-rooted form used by archive entries.
pub(crate) fn rooted(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
