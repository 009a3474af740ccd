//! Link record flowing through a preview run

use crate::error::FetchError;
use serde::Serialize;
use url::Url;

/// Metadata discovered about a link by a parser
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkMetadata {
    /// Page title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Short description of the page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Preview image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Content type of the page as declared by the page (e.g. "article")
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Name of the site the page belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,

    /// Canonical URL declared by the page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,

    /// Embedded video URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,

    /// Every picture found on the page, in document order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pictures: Vec<String>,
}

impl LinkMetadata {
    /// Returns true if no field has been discovered
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A URL under extraction, plus everything discovered about it
///
/// The `url` is fixed at construction. `real_url`, `content` and
/// `content_type` are filled in by a [`Fetcher`](crate::Fetcher);
/// metadata is filled in by [`Parser`](crate::Parser)s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    real_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,

    #[serde(skip_serializing)]
    content: Option<String>,

    #[serde(flatten)]
    metadata: LinkMetadata,
}

impl Link {
    /// Create a link for `url`
    ///
    /// The URL must be non-empty and well-formed. Scheme restrictions are
    /// left to the fetcher.
    pub fn new(url: impl Into<String>) -> Result<Self, FetchError> {
        let url = url.into();
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(FetchError::MissingUrl);
        }
        Url::parse(trimmed).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        Ok(Self {
            url: trimmed.to_string(),
            real_url: None,
            content_type: None,
            content: None,
            metadata: LinkMetadata::default(),
        })
    }

    /// The URL this link was created for
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Effective URL after redirects, once fetched
    pub fn real_url(&self) -> Option<&str> {
        self.real_url.as_deref()
    }

    /// Set the effective URL after redirects
    pub fn set_real_url(&mut self, real_url: impl Into<String>) -> &mut Self {
        self.real_url = Some(real_url.into());
        self
    }

    /// Raw body, once fetched
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Set the fetched body
    pub fn set_content(&mut self, content: impl Into<String>) -> &mut Self {
        self.content = Some(content.into());
        self
    }

    /// MIME type reported by the server, once fetched
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Set the MIME type of the fetched body
    pub fn set_content_type(&mut self, content_type: impl Into<String>) -> &mut Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Extracted preview metadata
    pub fn metadata(&self) -> &LinkMetadata {
        &self.metadata
    }

    /// Mutable access to the preview metadata, for parsers filling it in place
    pub fn metadata_mut(&mut self) -> &mut LinkMetadata {
        &mut self.metadata
    }

    /// Replace the preview metadata
    pub fn set_metadata(&mut self, metadata: LinkMetadata) -> &mut Self {
        self.metadata = metadata;
        self
    }

    /// Shorthand for `metadata().title`
    pub fn title(&self) -> Option<&str> {
        self.metadata.title.as_deref()
    }

    /// Returns true once a fetcher has populated the content fields
    pub fn is_fetched(&self) -> bool {
        self.content.is_some()
    }

    /// Base URL for resolving relative references found in the content
    pub fn base_url(&self) -> Option<Url> {
        self.real_url
            .as_deref()
            .and_then(|u| Url::parse(u).ok())
            .or_else(|| Url::parse(&self.url).ok())
    }

    /// Clear everything except the URL
    pub fn reset(&mut self) {
        self.real_url = None;
        self.content = None;
        self.content_type = None;
        self.metadata = LinkMetadata::default();
    }
}
