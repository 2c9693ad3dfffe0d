//! Hooks letting the application customize requests issued by the client.

use async_trait::async_trait;

use super::error::HttpError;
use super::request::HttpRequest;
use super::response::HttpResponse;

/// Delegate of a [`DefaultHttpClient`](super::DefaultHttpClient).
///
/// Every method has a pass-through default, so implementations only
/// override the hooks they need. Typical uses are adding credentials to
/// outgoing requests and re-authenticating after a `401`.
#[async_trait]
pub trait HttpClientDelegate: Send + Sync {
    /// Called before a request is sent. The returned request is the one
    /// actually sent; returning an error aborts the request with it.
    async fn will_start_request(&self, request: HttpRequest) -> Result<HttpRequest, HttpError> {
        Ok(request)
    }

    /// Called when a request failed, to provide a replacement request.
    ///
    /// Returning `Ok` retries with the new request through the whole pipeline,
    /// including [`will_start_request`](Self::will_start_request). Returning
    /// `Err` gives up with that error.
    async fn recover_request(
        &self,
        request: &HttpRequest,
        error: HttpError,
    ) -> Result<HttpRequest, HttpError> {
        let _ = request;
        Err(error)
    }

    /// Called when a successful response is received.
    fn did_receive_response(&self, request: &HttpRequest, response: &HttpResponse) {
        let _ = (request, response);
    }

    /// Called when a request definitively failed.
    fn did_fail_with_error(&self, request: &HttpRequest, error: &HttpError) {
        let _ = (request, error);
    }
}
