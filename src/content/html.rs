//! Text extraction from HTML and XHTML documents.

use async_trait::async_trait;
use scraper::{Html, Selector};

use super::{ResourceContentExtractor, collapse_whitespace};
use crate::resource::{Resource, ResourceError, ResourceExt};

/// Extracts the text of the `<body>` of an HTML or XHTML document.
///
/// Scripts and styles are skipped, and whitespace is collapsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlContentExtractor;

#[async_trait]
impl ResourceContentExtractor for HtmlContentExtractor {
    async fn extract_text(&self, resource: &dyn Resource) -> Result<String, ResourceError> {
        let source = resource.read_as_string().await?;
        Ok(html_text(&source))
    }
}

/// Returns the visible text of `source`.
pub(crate) fn html_text(source: &str) -> String {
    let document = Html::parse_document(source);
    let root = match Selector::parse("body") {
        Ok(selector) => document
            .select(&selector)
            .next()
            .unwrap_or_else(|| document.root_element()),
        Err(_) => document.root_element(),
    };

    let mut text = String::new();
    for node in root.descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|e| e.name().to_string()))
            .is_some_and(|name| matches!(name.as_str(), "script" | "style" | "head" | "title"));
        if hidden {
            continue;
        }
        text.push_str(fragment);
        text.push(' ');
    }
    collapse_whitespace(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::Link;
    use crate::resource::MemoryResource;

    #[test]
    fn test_body_text_only() {
        let text = html_text(
            "<html><head><title>Moby Dick</title><style>p { color: red }</style></head>\
             <body><h1>Loomings</h1><p>Call me <em>Ishmael</em>.</p>\
             <script>var x = 1;</script></body></html>",
        );
        assert_eq!(text, "Loomings Call me Ishmael .");
    }

    #[tokio::test]
    async fn test_extract_from_xhtml_resource() {
        let resource = MemoryResource::new(
            Link::new("/ch1.xhtml"),
            r#"<?xml version="1.0"?><html xmlns="http://www.w3.org/1999/xhtml"><body><p>Some years ago</p></body></html>"#,
        );
        let text = HtmlContentExtractor.extract_text(&resource).await.unwrap();
        assert_eq!(text, "Some years ago");
    }
}
