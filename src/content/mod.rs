//! Plain-text extraction from resources, used to index publications for
//! search.

mod html;

use async_trait::async_trait;

use crate::media_type;
use crate::resource::{Resource, ResourceError, ResourceExt};

pub use html::HtmlContentExtractor;

/// Extracts the human-readable text of a resource.
#[async_trait]
pub trait ResourceContentExtractor: Send + Sync {
    /// Returns the text content of `resource`.
    ///
    /// # Errors
    ///
    /// Returns the [`ResourceError`] of the underlying read, or
    /// [`ResourceError::Other`] if the content cannot be decoded.
    async fn extract_text(&self, resource: &dyn Resource) -> Result<String, ResourceError>;
}

/// Returns plain text resources as is, with whitespace collapsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextContentExtractor;

#[async_trait]
impl ResourceContentExtractor for PlainTextContentExtractor {
    async fn extract_text(&self, resource: &dyn Resource) -> Result<String, ResourceError> {
        let text = resource.read_as_string().await?;
        Ok(collapse_whitespace(&text))
    }
}

/// Chooses an extractor for a resource.
pub trait ResourceContentExtractorFactory: Send + Sync {
    /// Returns an extractor for `resource`, or `None` when its media type
    /// carries no extractable text.
    fn create(&self, resource: &dyn Resource) -> Option<Box<dyn ResourceContentExtractor>>;
}

/// Picks the extractor from the media type of the resource link.
///
/// HTML and XHTML go through [`HtmlContentExtractor`], plain text through
/// [`PlainTextContentExtractor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResourceContentExtractorFactory;

impl ResourceContentExtractorFactory for DefaultResourceContentExtractorFactory {
    fn create(&self, resource: &dyn Resource) -> Option<Box<dyn ResourceContentExtractor>> {
        let media_type = resource.link().media_type()?;
        if media_type::is_html(&media_type) {
            Some(Box::new(HtmlContentExtractor))
        } else if media_type::is_plain_text(&media_type) {
            Some(Box::new(PlainTextContentExtractor))
        } else {
            None
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
