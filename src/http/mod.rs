//! HTTP transport.
//!
//! [`HttpClient`] is the seam the rest of the crate talks to. The bundled
//! [`DefaultHttpClient`] drives one `reqwest` session, keeps a private table
//! of in-flight transfers, and lets an [`HttpClientDelegate`] rewrite
//! requests or recover from failures (typically re-authenticating after a
//! `401`).
//!
//! # Example
//!
//! ```no_run
//! use pubfetch::http::{DefaultHttpClient, HttpClient, HttpRequest};
//!
//! # async fn example() -> Result<(), pubfetch::http::HttpError> {
//! let client = DefaultHttpClient::new()?;
//! let response = client
//!     .fetch(HttpRequest::parse("https://example.com/book/manifest.json")?)
//!     .await?;
//! println!("{} bytes", response.body.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod delegate;
mod error;
mod problem_details;
mod request;
mod response;
mod task;

pub use client::{DefaultHttpClient, DownloadTask, HttpClient};
pub use delegate::HttpClientDelegate;
pub use error::{HttpError, HttpErrorKind, HttpMessage};
pub use problem_details::ProblemDetails;
pub use request::{HttpMethod, HttpRequest};
pub use response::{HttpFetchResponse, HttpResponse};
pub use task::{ChunkCallback, ResponseCallback};
