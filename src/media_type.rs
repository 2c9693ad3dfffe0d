//! Media type parsing and sniffing.
//!
//! Media types are represented with `mime::Mime` (re-exported by
//! `mime_guess`). Sniffing prefers a declared `Content-Type` and falls back
//! to the file extension of the resource path.

pub use mime_guess::Mime as MediaType;

use crate::constants::PROBLEM_DETAILS_MEDIA_TYPE;

/// Parses a media type string such as `text/html; charset=utf-8`.
#[must_use]
pub fn parse(value: &str) -> Option<MediaType> {
    value.trim().parse::<MediaType>().ok()
}

/// Guesses a media type from the extension of `path`.
#[must_use]
pub fn guess_from_path(path: &str) -> Option<MediaType> {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    mime_guess::from_path(path).first()
}

/// Determines the media type of a resource from its declared content type,
/// falling back to the extension of its path.
#[must_use]
pub fn sniff(content_type: Option<&str>, path: &str) -> Option<MediaType> {
    content_type
        .and_then(parse)
        .filter(|media_type| media_type.essence_str() != "application/octet-stream")
        .or_else(|| guess_from_path(path))
        .or_else(|| content_type.and_then(parse))
}

/// Returns true for RFC 7807 problem details payloads.
#[must_use]
pub fn is_problem_details(media_type: &MediaType) -> bool {
    media_type.essence_str() == PROBLEM_DETAILS_MEDIA_TYPE
}

/// Returns true for HTML and XHTML documents.
#[must_use]
pub fn is_html(media_type: &MediaType) -> bool {
    matches!(
        media_type.essence_str(),
        "text/html" | "application/xhtml+xml"
    )
}

/// Returns true for plain text.
#[must_use]
pub fn is_plain_text(media_type: &MediaType) -> bool {
    media_type.essence_str() == "text/plain"
}
