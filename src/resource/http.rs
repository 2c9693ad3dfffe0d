//! Resources served by an HTTP server.

use std::ops::Range;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::sync::OnceCell;
use tracing::{debug, instrument};
use url::Url;

use super::{Resource, ResourceError, clamp_range};
use crate::cancellable::Cancellable;
use crate::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use crate::link::Link;

/// Remote resource read through an [`HttpClient`].
///
/// The length comes from a `HEAD` request sent on first use and cached.
/// Ranged reads require the server to support byte range requests.
pub struct HttpResource {
    client: Arc<dyn HttpClient>,
    link: Link,
    url: Url,
    scope: Cancellable,
    head: OnceCell<HttpResponse>,
}

impl std::fmt::Debug for HttpResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResource")
            .field("url", &self.url.as_str())
            .field("closed", &self.scope.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl HttpResource {
    /// Creates a resource reading `url` with `client`.
    pub fn new(client: Arc<dyn HttpClient>, link: Link, url: Url) -> Self {
        Self {
            client,
            link,
            url,
            scope: Cancellable::new(),
            head: OnceCell::new(),
        }
    }

    /// Returns the resource URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the response to the `HEAD` probe, sending it on first use.
    ///
    /// # Errors
    ///
    /// Returns the mapped HTTP error. Failures are not cached.
    pub async fn head_response(&self) -> Result<&HttpResponse, ResourceError> {
        self.head
            .get_or_try_init(|| async {
                let request = HttpRequest::new(self.url.clone()).with_method(HttpMethod::Head);
                let fetched = self
                    .client
                    .fetch_with_cancellable(request, &self.scope)
                    .await?;
                Ok::<_, ResourceError>(fetched.response)
            })
            .await
    }
}

#[async_trait]
impl Resource for HttpResource {
    fn link(&self) -> &Link {
        &self.link
    }

    async fn length(&self) -> Result<u64, ResourceError> {
        self.head_response()
            .await?
            .content_length()
            .ok_or(ResourceError::Unavailable(None))
    }

    #[instrument(level = "debug", skip(self), fields(url = %self.url))]
    async fn read(&self, range: Option<Range<u64>>) -> Result<Bytes, ResourceError> {
        if self.scope.is_cancelled() {
            return Err(ResourceError::Cancelled);
        }

        let range = match range {
            Some(range) => {
                let range = match self.length().await {
                    Ok(length) => clamp_range(range, length),
                    Err(ResourceError::Unavailable(_)) => range,
                    Err(error) => return Err(error),
                };
                if range.is_empty() {
                    return Ok(Bytes::new());
                }
                Some(range)
            }
            None => None,
        };

        let body = Arc::new(Mutex::new(BytesMut::new()));
        let sink = Arc::clone(&body);
        let task = self.client.progressive_download_with_cancellable(
            HttpRequest::new(self.url.clone()),
            range.clone(),
            None,
            Box::new(move |chunk, _| {
                sink.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(&chunk);
            }),
            self.scope.child(),
        );
        let _guard = task.cancellable().clone().drop_guard();
        let response = match task.completion().await {
            Ok(response) => response,
            // Only reachable when the length is unknown: the range starts
            // past the end of the content.
            Err(error) if range.is_some() && error.status() == Some(416) => {
                debug!("range not satisfiable, reading past the end");
                return Ok(Bytes::new());
            }
            Err(error) => return Err(error.into()),
        };

        let data = std::mem::take(&mut *body.lock().unwrap_or_else(PoisonError::into_inner)).freeze();
        match range {
            // Servers advertising range support may still answer with the
            // whole content.
            Some(range) if !response.is_partial_content() => {
                debug!(status = response.status, "range ignored by server, slicing locally");
                let start = usize::try_from(range.start).unwrap_or(usize::MAX).min(data.len());
                let end = usize::try_from(range.end).unwrap_or(usize::MAX).min(data.len());
                Ok(data.slice(start..end))
            }
            _ => Ok(data),
        }
    }

    fn close(&self) {
        self.scope.cancel();
    }
}
