//! HTTP request description.

use std::fmt;
use std::ops::Range;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RANGE};
use url::Url;

use super::error::{HttpError, HttpErrorKind};

/// HTTP methods issued by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// Retrieve the resource body.
    Get,
    /// Retrieve only the response headers.
    Head,
}

impl HttpMethod {
    /// Returns the method as sent on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Head => Self::HEAD,
        }
    }
}

/// Request to be sent by an [`HttpClient`](super::HttpClient).
///
/// Requests are plain values: a delegate may inspect and replace them before
/// they are sent, or build a new one to recover from a failure.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    url: Url,
    method: HttpMethod,
    headers: HeaderMap,
    timeout: Option<Duration>,
}

impl HttpRequest {
    /// Creates a GET request for `url`.
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url,
            method: HttpMethod::Get,
            headers: HeaderMap::new(),
            timeout: None,
        }
    }

    /// Parses `url` and creates a GET request for it.
    ///
    /// # Errors
    ///
    /// Returns a [`HttpErrorKind::MalformedRequest`] error if the URL is invalid.
    pub fn parse(url: &str) -> Result<Self, HttpError> {
        let url = Url::parse(url)
            .map_err(|error| HttpError::with_cause(HttpErrorKind::MalformedRequest, error))?;
        Ok(Self::new(url))
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets a header, replacing any previous value.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets a per-request timeout overriding the client default.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Restricts the request to the given byte range with a `Range` header.
    ///
    /// An empty range removes any previous `Range` header, since HTTP has no
    /// way to express it.
    #[must_use]
    pub fn with_range(mut self, range: &Range<u64>) -> Self {
        if range.is_empty() {
            self.headers.remove(RANGE);
            return self;
        }
        let value = format!("bytes={}-{}", range.start, range.end - 1);
        if let Ok(value) = HeaderValue::from_str(&value) {
            self.headers.insert(RANGE, value);
        }
        self
    }

    /// Returns the request URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a mutable reference to the request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the per-request timeout, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_to_get() {
        let request = HttpRequest::parse("https://example.com/book.epub").unwrap();
        assert_eq!(request.method(), HttpMethod::Get);
        assert_eq!(request.url().path(), "/book.epub");
        assert!(request.headers().is_empty());
        assert!(request.timeout().is_none());
    }

    #[test]
    fn test_parse_invalid_url_is_malformed_request() {
        let error = HttpRequest::parse("not a url").unwrap_err();
        assert_eq!(error.kind(), HttpErrorKind::MalformedRequest);
    }

    #[test]
    fn test_range_header_uses_inclusive_end() {
        let request = HttpRequest::parse("https://example.com/a")
            .unwrap()
            .with_range(&(10..20));
        assert_eq!(request.headers().get(RANGE).unwrap(), "bytes=10-19");
    }

    #[test]
    fn test_empty_range_removes_header() {
        let request = HttpRequest::parse("https://example.com/a")
            .unwrap()
            .with_range(&(0..5))
            .with_range(&(5..5));
        assert!(request.headers().get(RANGE).is_none());
    }

    #[test]
    fn test_method_conversion() {
        assert_eq!(reqwest::Method::from(HttpMethod::Head), reqwest::Method::HEAD);
        assert_eq!(HttpMethod::Get.to_string(), "GET");
    }
}
