//! Pubfetch Core Library
//!
//! Uniform, ranged, cancellable access to the resources of digital
//! publications, whether they live in a zip container, an exploded
//! directory, on the local filesystem or behind an HTTP server.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`resource`] - The [`Resource`] contract and its file, archive, HTTP,
//!   in-memory, failure and buffered implementations
//! - [`fetcher`] - Resolution of [`Link`]s to resources
//! - [`archive`] - Exploded directory and zip container backends
//! - [`http`] - HTTP client with progressive downloads, delegate hooks and
//!   error classification
//! - [`content`] - Plain-text extraction for search
//! - [`cancellable`] - Cancellation handles for in-flight operations
//! - [`config`] - TOML configuration of the HTTP client and buffering

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod cancellable;
pub mod config;
pub mod constants;
pub mod content;
pub mod fetcher;
pub mod http;
pub mod link;
pub mod media_type;
pub mod resource;

mod user_agent;

// Re-export commonly used types
pub use archive::{
    Archive, ArchiveEntry, ArchiveError, ArchiveFactory, DefaultArchiveFactory, ExplodedArchive,
    MutableArchive, ZipArchive,
};
pub use cancellable::Cancellable;
pub use config::{ConfigError, FetchConfig};
pub use content::{
    DefaultResourceContentExtractorFactory, HtmlContentExtractor, PlainTextContentExtractor,
    ResourceContentExtractor, ResourceContentExtractorFactory,
};
pub use fetcher::{ArchiveFetcher, FileFetcher, Fetcher, HttpFetcher};
pub use http::{
    DefaultHttpClient, DownloadTask, HttpClient, HttpClientDelegate, HttpError, HttpErrorKind,
    HttpFetchResponse, HttpMethod, HttpRequest, HttpResponse, ProblemDetails,
};
pub use link::Link;
pub use media_type::MediaType;
pub use resource::{
    ArchiveResource, BufferedResource, FailureResource, FileResource, HttpResource,
    MemoryResource, Resource, ResourceError, ResourceExt,
};
