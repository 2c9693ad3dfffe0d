//! Fetcher serving resources from an HTTP server.

use std::sync::Arc;

use url::Url;

use super::Fetcher;
use crate::http::HttpClient;
use crate::link::Link;
use crate::resource::{FailureResource, HttpResource, Resource, ResourceError};

/// Fetcher resolving hrefs against a base URL.
///
/// Absolute `http` and `https` hrefs are used as is. Remote resources cannot
/// be listed, so [`Fetcher::links`] is always empty.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Arc<dyn HttpClient>,
    base_url: Option<Url>,
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .finish_non_exhaustive()
    }
}

impl HttpFetcher {
    /// Creates a fetcher issuing requests with `client`.
    pub fn new(client: Arc<dyn HttpClient>, base_url: Option<Url>) -> Self {
        Self { client, base_url }
    }

    /// Resolves `href` to an absolute HTTP URL.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::BadRequest`] when the href is not a valid
    /// HTTP URL, even relative to the base URL.
    pub fn resolve(&self, href: &str) -> Result<Url, ResourceError> {
        let url = match (Url::parse(href), &self.base_url) {
            (Ok(url), _) => url,
            (Err(_), Some(base)) => base
                .join(href.trim_start_matches('/'))
                .map_err(|_| ResourceError::BadRequest)?,
            (Err(error), None) => {
                return Err(ResourceError::message(format!(
                    "relative href {href} without base URL: {error}"
                )));
            }
        };
        match url.scheme() {
            "http" | "https" => Ok(url),
            _ => Err(ResourceError::BadRequest),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn links(&self) -> Vec<Link> {
        Vec::new()
    }

    fn get(&self, link: &Link) -> Box<dyn Resource> {
        match self.resolve(&link.href) {
            Ok(url) => Box::new(HttpResource::new(
                Arc::clone(&self.client),
                link.clone(),
                url,
            )),
            Err(error) => Box::new(FailureResource::new(link.clone(), error)),
        }
    }
}
