//! Error types for the HTTP client.
//!
//! Every failure of the transport layer is classified exactly once into an
//! [`HttpErrorKind`], either from the response status code or from the
//! underlying `reqwest` error. The [`HttpError`] carries the kind together
//! with whatever diagnostic data the server sent back.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use super::problem_details::ProblemDetails;
use crate::media_type::{self, MediaType};
use crate::resource::SharedError;

/// Classification of HTTP failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpErrorKind {
    /// The provided request was not valid.
    MalformedRequest,
    /// The received response couldn't be decoded.
    MalformedResponse,
    /// The client, server or gateways timed out.
    Timeout,
    /// (400) The server cannot or will not process the request.
    BadRequest,
    /// (401) Authentication is required.
    Unauthorized,
    /// (403) The server refuses the action.
    Forbidden,
    /// (404) The requested resource could not be found.
    NotFound,
    /// (4xx) Other client errors.
    ClientError,
    /// (5xx) Server errors.
    ServerError,
    /// The device is offline or the host is unreachable.
    Offline,
    /// The request was cancelled.
    Cancelled,
    /// Any other failure.
    Other,
}

impl HttpErrorKind {
    /// Classifies a response status code.
    ///
    /// Returns `None` for successful statuses (200 to 399).
    #[must_use]
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=399 => None,
            400 => Some(Self::BadRequest),
            401 => Some(Self::Unauthorized),
            403 => Some(Self::Forbidden),
            404 => Some(Self::NotFound),
            402 | 405..=498 => Some(Self::ClientError),
            499 => Some(Self::Cancelled),
            500..=599 => Some(Self::ServerError),
            _ => Some(Self::Other),
        }
    }

    /// Classifies a transport-level failure reported by `reqwest`.
    #[must_use]
    pub fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_builder() {
            Self::MalformedRequest
        } else if error.is_redirect() {
            Self::ServerError
        } else if error.is_connect() {
            Self::Offline
        } else if let Some(kind) = io_error_kind(error) {
            match kind {
                std::io::ErrorKind::TimedOut => Self::Timeout,
                std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::NotConnected
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::UnexpectedEof => Self::Offline,
                _ => Self::Other,
            }
        } else if error.is_decode() || error.is_body() {
            Self::MalformedResponse
        } else {
            Self::Other
        }
    }

    /// Returns a stable label for the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MalformedRequest => "malformed request",
            Self::MalformedResponse => "malformed response",
            Self::Timeout => "timeout",
            Self::BadRequest => "bad request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not found",
            Self::ClientError => "client error",
            Self::ServerError => "server error",
            Self::Offline => "offline",
            Self::Cancelled => "cancelled",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for HttpErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Walks the source chain looking for an I/O error.
fn io_error_kind(error: &reqwest::Error) -> Option<std::io::ErrorKind> {
    let mut source = error.source();
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            return Some(io.kind());
        }
        source = err.source();
    }
    None
}

/// Plain message used as the cause of client-generated errors.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HttpMessage(pub String);

/// Failure of an HTTP request.
#[derive(Debug, Clone, Error)]
#[error("HTTP error ({kind}){}", describe(.cause.as_ref(), .problem_details.as_ref()))]
pub struct HttpError {
    kind: HttpErrorKind,
    #[source]
    cause: Option<SharedError>,
    status: Option<u16>,
    media_type: Option<MediaType>,
    body: Option<Bytes>,
    problem_details: Option<ProblemDetails>,
}

fn describe(cause: Option<&SharedError>, problem: Option<&ProblemDetails>) -> String {
    match (problem, cause) {
        (Some(problem), _) => format!(": {}", problem.title),
        (None, Some(cause)) => format!(": {cause}"),
        (None, None) => String::new(),
    }
}

impl HttpError {
    /// Creates an error of the given kind without any diagnostic data.
    #[must_use]
    pub fn new(kind: HttpErrorKind) -> Self {
        Self {
            kind,
            cause: None,
            status: None,
            media_type: None,
            body: None,
            problem_details: None,
        }
    }

    /// Creates an error of the given kind caused by `cause`.
    pub fn with_cause(kind: HttpErrorKind, cause: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            cause: Some(Arc::new(cause)),
            ..Self::new(kind)
        }
    }

    /// Creates an error of the given kind described by `message`.
    pub fn with_message(kind: HttpErrorKind, message: impl Into<String>) -> Self {
        Self::with_cause(kind, HttpMessage(message.into()))
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(HttpErrorKind::Cancelled)
    }

    /// Creates an unclassified error described by `message`.
    pub fn other(message: impl Into<String>) -> Self {
        Self::with_message(HttpErrorKind::Other, message)
    }

    /// Creates an error from a transport failure.
    #[must_use]
    pub fn transport(error: reqwest::Error) -> Self {
        Self::with_cause(HttpErrorKind::from_transport(&error), error)
    }

    /// Creates an error from a failed response status, keeping the body sent
    /// by the server.
    ///
    /// When the body is an RFC 7807 problem details document it is parsed and
    /// made available through [`problem_details`](Self::problem_details).
    #[must_use]
    pub fn from_response(
        kind: HttpErrorKind,
        media_type: Option<MediaType>,
        body: Option<Bytes>,
    ) -> Self {
        let problem_details = match (&media_type, &body) {
            (Some(media_type), Some(body)) if media_type::is_problem_details(media_type) => {
                ProblemDetails::from_json(body)
            }
            _ => None,
        };
        Self {
            kind,
            cause: None,
            status: None,
            media_type,
            body: body.filter(|body| !body.is_empty()),
            problem_details,
        }
    }

    /// Records the response status the error was classified from.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Error raised when a ranged download hits a server that does not
    /// support byte range requests.
    #[must_use]
    pub fn byte_ranges_not_supported() -> Self {
        Self::other(
            "byte ranges not supported: progressive download using ranges requires the remote \
             HTTP server to support byte range requests",
        )
    }

    /// Returns the response status, when the error comes from a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns the classification of the error.
    #[must_use]
    pub fn kind(&self) -> HttpErrorKind {
        self.kind
    }

    /// Returns the underlying cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&SharedError> {
        self.cause.as_ref()
    }

    /// Returns the media type of the error body, if any.
    #[must_use]
    pub fn media_type(&self) -> Option<&MediaType> {
        self.media_type.as_ref()
    }

    /// Returns the raw body sent with the error response, if any.
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Returns the parsed problem details, if the body contained one.
    #[must_use]
    pub fn problem_details(&self) -> Option<&ProblemDetails> {
        self.problem_details.as_ref()
    }

    /// Returns true for user or client initiated cancellations.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.kind == HttpErrorKind::Cancelled
    }
}
