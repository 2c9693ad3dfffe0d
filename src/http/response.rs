//! HTTP response description.

use bytes::Bytes;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, HeaderMap};
use url::Url;

use super::request::HttpRequest;
use crate::media_type::{self, MediaType};

/// Status line and headers of a response, without the body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Request which triggered this response.
    pub request: HttpRequest,
    /// Final URL of the response, after redirections.
    pub url: Url,
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Media type sniffed from the `Content-Type` header or the URL extension.
    pub media_type: Option<MediaType>,
}

impl HttpResponse {
    /// Builds a response from its parts, sniffing the media type.
    #[must_use]
    pub fn new(request: HttpRequest, url: Url, status: u16, headers: HeaderMap) -> Self {
        let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
        let media_type = media_type::sniff(content_type, url.path());
        Self {
            request,
            url,
            status,
            headers,
            media_type,
        }
    }

    /// Returns the value of the `Content-Length` header.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
    }

    /// Returns the raw `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Indicates whether the server accepts byte range requests.
    ///
    /// Either `Accept-Ranges: bytes` or a `Content-Range: bytes ...` header is
    /// enough.
    #[must_use]
    pub fn accepts_byte_ranges(&self) -> bool {
        let accept_ranges = self
            .headers
            .get(ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("bytes"));
        let content_range = self
            .headers
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim_start().to_ascii_lowercase().starts_with("bytes"));
        accept_ranges || content_range
    }

    /// Returns true for `206 Partial Content` responses.
    #[must_use]
    pub fn is_partial_content(&self) -> bool {
        self.status == 206
    }
}

/// Response of a completed fetch, with its whole body.
#[derive(Debug, Clone)]
pub struct HttpFetchResponse {
    /// Status line and headers.
    pub response: HttpResponse,
    /// Response body.
    pub body: Bytes,
}
