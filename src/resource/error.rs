//! Errors reported by [`Resource`](super::Resource) implementations.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

use super::SharedError;
use crate::archive::ArchiveError;
use crate::http::{HttpError, HttpErrorKind, HttpMessage};

/// Failure to access a resource.
///
/// Errors are cheap to clone so that a failed resource can report the same
/// error on every call.
#[derive(Debug, Clone, Error)]
pub enum ResourceError {
    /// The resource does not exist.
    #[error("resource not found")]
    NotFound,

    /// Access to the resource is forbidden, for example after an expired
    /// loan.
    #[error("access to the resource is forbidden")]
    Forbidden,

    /// The resource is temporarily unreachable, or some of its properties
    /// cannot be determined.
    #[error("resource unavailable{}", describe(.0.as_ref()))]
    Unavailable(#[source] Option<SharedError>),

    /// The request for the resource was invalid.
    #[error("bad request for resource")]
    BadRequest,

    /// Any other failure.
    #[error("resource error: {0}")]
    Other(#[source] SharedError),

    /// The operation was cancelled.
    #[error("resource access cancelled")]
    Cancelled,
}

fn describe(cause: Option<&SharedError>) -> String {
    cause.map(|c| format!(": {c}")).unwrap_or_default()
}

impl ResourceError {
    /// Creates an [`ResourceError::Other`] error caused by `cause`.
    pub fn other(cause: impl StdError + Send + Sync + 'static) -> Self {
        Self::Other(Arc::new(cause))
    }

    /// Creates an [`ResourceError::Other`] error described by `message`.
    pub fn message(message: impl Into<String>) -> Self {
        Self::other(HttpMessage(message.into()))
    }

    /// Creates an [`ResourceError::Unavailable`] error caused by `cause`.
    pub fn unavailable(cause: impl StdError + Send + Sync + 'static) -> Self {
        Self::Unavailable(Some(Arc::new(cause)))
    }

    /// Maps a filesystem error.
    #[must_use]
    pub fn from_io(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound,
            std::io::ErrorKind::PermissionDenied => Self::Forbidden,
            _ => Self::other(error),
        }
    }

    /// Maps an archive error.
    #[must_use]
    pub fn from_archive(error: ArchiveError) -> Self {
        if error.is_not_found() {
            Self::NotFound
        } else {
            Self::other(error)
        }
    }

    /// Returns true when the operation was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns true when the resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl From<HttpError> for ResourceError {
    fn from(error: HttpError) -> Self {
        match error.kind() {
            HttpErrorKind::MalformedRequest | HttpErrorKind::BadRequest => Self::BadRequest,
            HttpErrorKind::Timeout | HttpErrorKind::Offline => Self::unavailable(error),
            HttpErrorKind::Unauthorized | HttpErrorKind::Forbidden => Self::Forbidden,
            HttpErrorKind::NotFound => Self::NotFound,
            HttpErrorKind::Cancelled => Self::Cancelled,
            HttpErrorKind::MalformedResponse
            | HttpErrorKind::ClientError
            | HttpErrorKind::ServerError
            | HttpErrorKind::Other => Self::other(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_mapping() {
        let cases = [
            (HttpErrorKind::MalformedRequest, "bad request"),
            (HttpErrorKind::BadRequest, "bad request"),
            (HttpErrorKind::Timeout, "unavailable"),
            (HttpErrorKind::Offline, "unavailable"),
            (HttpErrorKind::Unauthorized, "forbidden"),
            (HttpErrorKind::Forbidden, "forbidden"),
            (HttpErrorKind::NotFound, "not found"),
            (HttpErrorKind::Cancelled, "cancelled"),
            (HttpErrorKind::ServerError, "resource error"),
            (HttpErrorKind::ClientError, "resource error"),
            (HttpErrorKind::MalformedResponse, "resource error"),
            (HttpErrorKind::Other, "resource error"),
        ];
        for (kind, expected) in cases {
            let error = ResourceError::from(HttpError::new(kind));
            assert!(
                error.to_string().contains(expected),
                "{kind}: {error}"
            );
        }
    }

    #[test]
    fn test_unavailable_keeps_cause() {
        let error = ResourceError::from(HttpError::new(HttpErrorKind::Offline));
        let ResourceError::Unavailable(Some(cause)) = &error else {
            panic!("expected unavailable with cause");
        };
        assert!(cause.to_string().contains("offline"));
    }

    #[test]
    fn test_io_mapping() {
        let not_found = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(ResourceError::from_io(not_found).is_not_found());

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no");
        assert!(matches!(
            ResourceError::from_io(denied),
            ResourceError::Forbidden
        ));
    }

    #[test]
    fn test_archive_mapping() {
        assert!(ResourceError::from_archive(ArchiveError::entry_not_found("/a")).is_not_found());
        assert!(matches!(
            ResourceError::from_archive(ArchiveError::Closed),
            ResourceError::Other(_)
        ));
    }

    #[test]
    fn test_cancelled_is_distinguishable() {
        assert!(ResourceError::Cancelled.is_cancelled());
        assert!(!ResourceError::NotFound.is_cancelled());
    }
}
