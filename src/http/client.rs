//! HTTP client abstraction and its `reqwest` implementation.

use std::fmt;
use std::future::Future;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use futures_util::StreamExt;
use reqwest::{Client, ClientBuilder};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use super::delegate::HttpClientDelegate;
use super::error::{HttpError, HttpErrorKind};
use super::request::{HttpMethod, HttpRequest};
use super::response::{HttpFetchResponse, HttpResponse};
use super::task::{ChunkCallback, ResponseCallback, Step, Task, TaskId, TaskTable, TransportEvent};
use crate::cancellable::Cancellable;
use crate::config::FetchConfig;
use crate::user_agent;

/// Running progressive download.
///
/// The transfer runs on its own tokio task. Dropping the handle does not stop
/// it; use [`cancel`](Self::cancel) or the [`Cancellable`].
#[derive(Debug)]
pub struct DownloadTask {
    cancellable: Cancellable,
    handle: JoinHandle<Result<HttpResponse, HttpError>>,
}

impl DownloadTask {
    /// Spawns `transfer` on the current tokio runtime.
    pub fn spawn<F>(cancellable: Cancellable, transfer: F) -> Self
    where
        F: Future<Output = Result<HttpResponse, HttpError>> + Send + 'static,
    {
        Self {
            cancellable,
            handle: tokio::spawn(transfer),
        }
    }

    /// Returns the token controlling this transfer.
    #[must_use]
    pub fn cancellable(&self) -> &Cancellable {
        &self.cancellable
    }

    /// Requests cancellation of the transfer.
    pub fn cancel(&self) {
        self.cancellable.cancel();
    }

    /// Waits for the transfer to finish.
    ///
    /// # Errors
    ///
    /// Returns the [`HttpError`] that ended the transfer.
    pub async fn completion(self) -> Result<HttpResponse, HttpError> {
        match self.handle.await {
            Ok(result) => result,
            Err(error) if error.is_cancelled() => Err(HttpError::cancelled()),
            Err(error) => Err(HttpError::with_message(
                HttpErrorKind::Other,
                format!("download task failed: {error}"),
            )),
        }
    }
}

/// Client issuing HTTP requests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Starts a transfer controlled by `cancellable`.
    ///
    /// `on_response` is called once with the response headers of a successful
    /// request, then `on_chunk` with each body chunk, in order. When `range`
    /// is set, the server must support byte range requests or the task fails
    /// before any chunk is delivered.
    fn progressive_download_with_cancellable(
        &self,
        request: HttpRequest,
        range: Option<Range<u64>>,
        on_response: Option<ResponseCallback>,
        on_chunk: ChunkCallback,
        cancellable: Cancellable,
    ) -> DownloadTask;

    /// Starts a transfer with a fresh [`Cancellable`].
    fn progressive_download(
        &self,
        request: HttpRequest,
        range: Option<Range<u64>>,
        on_response: Option<ResponseCallback>,
        on_chunk: ChunkCallback,
    ) -> DownloadTask {
        self.progressive_download_with_cancellable(
            request,
            range,
            on_response,
            on_chunk,
            Cancellable::new(),
        )
    }

    /// Fetches `request` to completion and buffers its body.
    ///
    /// # Errors
    ///
    /// Returns the [`HttpError`] of the failed request.
    async fn fetch(&self, request: HttpRequest) -> Result<HttpFetchResponse, HttpError> {
        self.fetch_with_cancellable(request, &Cancellable::new())
            .await
    }

    /// Fetches `request` to completion, stopping when `cancellable` fires.
    ///
    /// A failed `HEAD` request is retried once as `GET`, since the body of
    /// the error response is the only way to get diagnostics from the
    /// server.
    ///
    /// # Errors
    ///
    /// Returns the [`HttpError`] of the failed request.
    async fn fetch_with_cancellable(
        &self,
        request: HttpRequest,
        cancellable: &Cancellable,
    ) -> Result<HttpFetchResponse, HttpError> {
        let mut request = request;
        let mut can_retry = true;
        loop {
            let body = Arc::new(Mutex::new(BytesMut::new()));
            let sink = Arc::clone(&body);
            let task = self.progressive_download_with_cancellable(
                request.clone(),
                None,
                None,
                Box::new(move |chunk, _| {
                    sink.lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .extend_from_slice(&chunk);
                }),
                cancellable.child(),
            );
            // Stops the transfer if this future is dropped.
            let _guard = task.cancellable().clone().drop_guard();

            match task.completion().await {
                Ok(response) => {
                    let body = std::mem::take(&mut *body.lock().unwrap_or_else(PoisonError::into_inner));
                    return Ok(HttpFetchResponse {
                        response,
                        body: body.freeze(),
                    });
                }
                Err(error)
                    if can_retry
                        && request.method() == HttpMethod::Head
                        && !error.is_cancelled()
                        && !cancellable.is_cancelled() =>
                {
                    debug!(url = %request.url(), %error, "HEAD request failed, retrying with GET");
                    can_retry = false;
                    request = request.with_method(HttpMethod::Get);
                }
                Err(error) => return Err(error),
            }
        }
    }
}

struct ClientInner {
    session: Client,
    delegate: Option<Arc<dyn HttpClientDelegate>>,
    tasks: TaskTable,
    next_id: AtomicU64,
    max_recovery_attempts: u32,
}

/// [`HttpClient`] backed by a single `reqwest` session.
///
/// Cloning the client is cheap and shares the session and the task table.
#[derive(Clone)]
pub struct DefaultHttpClient {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for DefaultHttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultHttpClient")
            .field("has_delegate", &self.inner.delegate.is_some())
            .field("in_flight", &self.inner.tasks.len())
            .field("max_recovery_attempts", &self.inner.max_recovery_attempts)
            .finish_non_exhaustive()
    }
}

impl DefaultHttpClient {
    /// Creates a client with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_config(&FetchConfig::default())
    }

    /// Creates a client using the timeouts, user agent and recovery bound of
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    #[instrument(level = "debug", skip(config))]
    pub fn with_config(config: &FetchConfig) -> Result<Self, HttpError> {
        let session = base_client_builder(config)
            .build()
            .map_err(HttpError::transport)?;
        Ok(Self {
            inner: Arc::new(ClientInner {
                session,
                delegate: None,
                tasks: TaskTable::default(),
                next_id: AtomicU64::new(1),
                max_recovery_attempts: config.max_recovery_attempts,
            }),
        })
    }

    /// Returns a client sharing this session, with `delegate` installed.
    #[must_use]
    pub fn with_delegate(self, delegate: Arc<dyn HttpClientDelegate>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                session: self.inner.session.clone(),
                delegate: Some(delegate),
                tasks: TaskTable::default(),
                next_id: AtomicU64::new(1),
                max_recovery_attempts: self.inner.max_recovery_attempts,
            }),
        }
    }

    /// Returns the number of transfers in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner.tasks.len()
    }

    /// Cancels every transfer in flight.
    pub fn cancel_all(&self) {
        self.inner.tasks.cancel_all();
    }
}

#[async_trait]
impl HttpClient for DefaultHttpClient {
    fn progressive_download_with_cancellable(
        &self,
        request: HttpRequest,
        range: Option<Range<u64>>,
        on_response: Option<ResponseCallback>,
        on_chunk: ChunkCallback,
        cancellable: Cancellable,
    ) -> DownloadTask {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.tasks.insert(
            id,
            Task::new(
                request.clone(),
                range.clone(),
                on_response,
                on_chunk,
                cancellable.clone(),
            ),
        );

        let inner = Arc::clone(&self.inner);
        let token = cancellable.clone();
        DownloadTask::spawn(cancellable, async move {
            let result = inner.run(id, request.clone(), range, &token).await;
            if let (Err(error), Some(delegate)) = (&result, &inner.delegate) {
                delegate.did_fail_with_error(&request, error);
            }
            inner.tasks.remove(id);
            result
        })
    }
}

impl ClientInner {
    /// Runs the attempts of task `id` until one succeeds, the delegate stops
    /// recovering, or the task is cancelled.
    #[instrument(skip_all, fields(task = id, url = %request.url(), method = %request.method()))]
    async fn run(
        &self,
        id: TaskId,
        request: HttpRequest,
        range: Option<Range<u64>>,
        cancellable: &Cancellable,
    ) -> Result<HttpResponse, HttpError> {
        let mut request = request;
        let mut recoveries = 0_u32;
        loop {
            if cancellable.is_cancelled() {
                return self.complete(id, Some(HttpError::cancelled()));
            }

            let result = tokio::select! {
                biased;
                () = cancellable.cancelled() => {
                    debug!("transfer cancelled");
                    self.complete(id, Some(HttpError::cancelled()))
                }
                result = self.attempt(id, request.clone(), range.as_ref(), cancellable) => result,
            };

            let error = match result {
                Ok(response) => return Ok(response),
                Err(error) if error.is_cancelled() => return Err(error),
                Err(error) => error,
            };

            let Some(delegate) = &self.delegate else {
                return Err(error);
            };
            if recoveries >= self.max_recovery_attempts {
                warn!(recoveries, %error, "giving up after too many recoveries");
                return Err(error);
            }
            if self.tasks.delivered_data(id) {
                return Err(error);
            }

            request = tokio::select! {
                biased;
                () = cancellable.cancelled() => {
                    debug!("transfer cancelled during recovery");
                    return self.complete(id, Some(HttpError::cancelled()));
                }
                recovered = delegate.recover_request(&request, error) => recovered?,
            };
            recoveries += 1;
            debug!(recoveries, url = %request.url(), "retrying with recovered request");
            self.tasks.restart(id, request.clone());
        }
    }

    /// Sends one request and streams its response into task `id`.
    async fn attempt(
        &self,
        id: TaskId,
        request: HttpRequest,
        range: Option<&Range<u64>>,
        cancellable: &Cancellable,
    ) -> Result<HttpResponse, HttpError> {
        let request = match &self.delegate {
            Some(delegate) => match delegate.will_start_request(request).await {
                Ok(request) => request,
                Err(error) => return self.complete(id, Some(error)),
            },
            None => request,
        };
        let request = match range {
            Some(range) => request.with_range(range),
            None => request,
        };

        let mut builder = self
            .session
            .request(request.method().into(), request.url().clone())
            .headers(request.headers().clone());
        if let Some(timeout) = request.timeout() {
            builder = builder.timeout(timeout);
        }

        debug!(url = %request.url(), method = %request.method(), "sending request");
        let response = match builder.send().await {
            Ok(response) => response,
            Err(error) => return self.complete(id, Some(HttpError::transport(error))),
        };

        let http_response = HttpResponse::new(
            request.clone(),
            response.url().clone(),
            response.status().as_u16(),
            response.headers().clone(),
        );
        debug!(status = http_response.status, "received response");
        if let Some(delegate) = &self.delegate
            && HttpErrorKind::from_status(http_response.status).is_none()
        {
            delegate.did_receive_response(&request, &http_response);
        }
        if let Some(result) = self.route(id, TransportEvent::ResponseReceived(http_response)) {
            return result;
        }

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            if cancellable.is_cancelled() {
                return self.complete(id, Some(HttpError::cancelled()));
            }
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(error) => return self.complete(id, Some(HttpError::transport(error))),
            };
            if let Some(result) = self.route(id, TransportEvent::DataReceived(chunk)) {
                return result;
            }
        }

        self.complete(id, None)
    }

    /// Routes an event, returning the final result when the task ended.
    fn route(
        &self,
        id: TaskId,
        event: TransportEvent,
    ) -> Option<Result<HttpResponse, HttpError>> {
        match self.tasks.route(id, event) {
            Some(Step::Continue) => None,
            Some(Step::Finished(result)) => Some(result),
            Some(Step::Ignored) | None => Some(Err(HttpError::cancelled())),
        }
    }

    fn complete(&self, id: TaskId, error: Option<HttpError>) -> Result<HttpResponse, HttpError> {
        let fallback = error.clone();
        match self.tasks.route(id, TransportEvent::Completed(error)) {
            Some(Step::Finished(result)) => result,
            _ => Err(fallback.unwrap_or_else(HttpError::cancelled)),
        }
    }
}

fn base_client_builder(config: &FetchConfig) -> ClientBuilder {
    let user_agent = config
        .user_agent
        .clone()
        .unwrap_or_else(user_agent::default_user_agent);
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.read_timeout_secs))
        .user_agent(user_agent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_debug_does_not_leak_session() {
        let client = DefaultHttpClient::new().unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("DefaultHttpClient"));
        assert!(debug.contains("in_flight: 0"));
    }

    #[tokio::test]
    async fn test_malformed_scheme_fails_without_network() {
        let client = DefaultHttpClient::new().unwrap();
        let request = HttpRequest::parse("ftp://example.com/book.epub").unwrap();
        let error = client.fetch(request).await.unwrap_err();
        assert_ne!(error.kind(), HttpErrorKind::Cancelled);
        assert_eq!(client.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_cancel_before_start_yields_cancelled() {
        let client = DefaultHttpClient::new().unwrap();
        let cancellable = Cancellable::new();
        cancellable.cancel();
        let task = client.progressive_download_with_cancellable(
            HttpRequest::parse("http://127.0.0.1:9/never").unwrap(),
            None,
            None,
            Box::new(|_, _| panic!("no chunk expected")),
            cancellable,
        );
        let error = task.completion().await.unwrap_err();
        assert!(error.is_cancelled());
    }
}
