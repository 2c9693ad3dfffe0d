//! Links identifying fetchable resources.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::media_type::{self, MediaType};

/// Reference to a resource of a publication.
///
/// Only the fields needed to fetch a resource are modeled here: the `href`,
/// the declared media type and an arbitrary property bag carried through
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Location of the resource, relative to the publication or absolute.
    pub href: String,
    /// Declared media type, if any.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Extra properties.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl Link {
    /// Creates a link with the given `href` and no media type.
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Self::default()
        }
    }

    /// Sets the declared media type.
    #[must_use]
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Returns the declared media type, or one guessed from the `href`
    /// extension.
    #[must_use]
    pub fn media_type(&self) -> Option<MediaType> {
        self.media_type
            .as_deref()
            .and_then(media_type::parse)
            .or_else(|| media_type::guess_from_path(&self.href))
    }

    /// Returns the `href` without query or fragment, percent-decoded.
    ///
    /// Falls back to the raw path when the percent-encoding is invalid UTF-8.
    #[must_use]
    pub fn href_path(&self) -> String {
        let path = self
            .href
            .split(['?', '#'])
            .next()
            .unwrap_or(self.href.as_str());
        urlencoding::decode(path).map_or_else(|_| path.to_string(), |decoded| decoded.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_json_uses_type_key() {
        let link = Link::new("/chapter1.xhtml").with_media_type("application/xhtml+xml");
        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json["href"], "/chapter1.xhtml");
        assert_eq!(json["type"], "application/xhtml+xml");
        assert!(json.get("properties").is_none());
    }

    #[test]
    fn test_link_deserializes_properties() {
        let link: Link = serde_json::from_str(
            r#"{"href": "/audio/track1.mp3", "properties": {"duration": 42}}"#,
        )
        .unwrap();
        assert_eq!(link.href, "/audio/track1.mp3");
        assert!(link.media_type.is_none());
        assert_eq!(link.properties["duration"], 42);
    }

    #[test]
    fn test_media_type_guessed_from_href() {
        let link = Link::new("/images/cover.jpg");
        assert_eq!(link.media_type().unwrap().essence_str(), "image/jpeg");
    }

    #[test]
    fn test_href_path_decodes_and_strips_fragment() {
        let link = Link::new("/text/chapter%201.xhtml#section2");
        assert_eq!(link.href_path(), "/text/chapter 1.xhtml");
    }
}
