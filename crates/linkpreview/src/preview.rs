//! Preview orchestration
//!
//! [`LinkPreview`] owns one link, a fetcher, an ordered parser registry and
//! the propagation flag. A run fetches the link once and then walks the
//! registry front to back.

use crate::error::FetchError;
use crate::fetchers::{DefaultFetcher, Fetcher};
use crate::link::Link;
use crate::parsers::{GeneralParser, Parser, ParserRegistry};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Result of a run: one parsed link per matching parser, keyed by parser name
pub type ParsedLinks = HashMap<String, Link>;

/// Where a [`LinkPreview`] is in its run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PreviewState {
    /// Configured, not running
    #[default]
    Idle,
    /// Waiting on the fetcher
    Fetching,
    /// Walking the parser chain
    Parsing,
    /// Last run finished
    Done,
    /// Last run stopped at the fetch step
    Failed,
}

/// Link preview extractor
///
/// ```no_run
/// # async fn run() -> Result<(), linkpreview::FetchError> {
/// use linkpreview::LinkPreview;
///
/// let mut preview = LinkPreview::new("https://example.com")?;
/// for (parser, link) in preview.get_parsed().await? {
///     println!("{parser}: {:?}", link.title());
/// }
/// # Ok(())
/// # }
/// ```
pub struct LinkPreview {
    link: Link,
    fetcher: Option<Box<dyn Fetcher>>,
    parsers: ParserRegistry,
    propagation: bool,
    state: PreviewState,
}

impl std::fmt::Debug for LinkPreview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkPreview")
            .field("link", &self.link)
            .field("fetcher", &self.fetcher.as_ref().map(|f| f.name()))
            .field("parsers", &self.parsers)
            .field("propagation", &self.propagation)
            .field("state", &self.state)
            .finish()
    }
}

impl LinkPreview {
    /// Create a preview for `url`
    pub fn new(url: impl Into<String>) -> Result<Self, FetchError> {
        Ok(Self::from_link(Link::new(url)?))
    }

    /// Create a preview for an existing link record
    pub fn from_link(link: Link) -> Self {
        Self {
            link,
            fetcher: None,
            parsers: ParserRegistry::new(),
            propagation: false,
            state: PreviewState::Idle,
        }
    }

    /// Create a new builder
    pub fn builder() -> LinkPreviewBuilder {
        LinkPreviewBuilder::new()
    }

    /// Replace the link with a new one for `url`
    pub fn set_url(&mut self, url: impl Into<String>) -> Result<&mut Self, FetchError> {
        let link = Link::new(url)?;
        Ok(self.set_link(link))
    }

    /// Replace the link record
    pub fn set_link(&mut self, link: Link) -> &mut Self {
        self.link = link;
        self.state = PreviewState::Idle;
        self
    }

    /// The current link; after a successful run it carries the fetched content
    pub fn link(&self) -> &Link {
        &self.link
    }

    /// Use `fetcher` instead of [`DefaultFetcher`]
    pub fn set_fetcher(&mut self, fetcher: Box<dyn Fetcher>) -> &mut Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// The configured fetcher, if one has been set or installed by a run
    pub fn fetcher(&self) -> Option<&dyn Fetcher> {
        self.fetcher.as_deref()
    }

    /// Evaluate every parser (true) or stop after the first match (false)
    pub fn set_propagation(&mut self, propagation: bool) -> &mut Self {
        self.propagation = propagation;
        self
    }

    /// Whether every applicable parser runs, rather than stopping at the first match
    pub fn propagation(&self) -> bool {
        self.propagation
    }

    /// Registered parsers, in the order they are tried
    pub fn parsers(&self) -> &ParserRegistry {
        &self.parsers
    }

    /// Replace the whole parser registry
    pub fn set_parsers(&mut self, parsers: ParserRegistry) -> &mut Self {
        self.parsers = parsers;
        self
    }

    /// Add a parser in front of all others
    ///
    /// A parser with the same name is replaced.
    pub fn add_parser(&mut self, parser: Box<dyn Parser>) -> &mut Self {
        self.parsers.add(parser);
        self
    }

    /// Remove the parser named `name`; does nothing if there is none
    pub fn remove_parser(&mut self, name: &str) -> &mut Self {
        self.parsers.remove(name);
        self
    }

    /// Current run state
    pub fn state(&self) -> PreviewState {
        self.state
    }

    /// Fetch the link and run the parser chain
    ///
    /// Returns the parsed link of every parser that matched, keyed by parser
    /// name. With propagation off (the default) at most one parser matches.
    /// An empty map means no preview is available. A fetch failure is
    /// returned as is and no parser runs.
    ///
    /// If no parser is registered the [`GeneralParser`] is added first; if no
    /// fetcher is set the [`DefaultFetcher`] is installed.
    pub async fn get_parsed(&mut self) -> Result<ParsedLinks, FetchError> {
        if self.parsers.is_empty() {
            self.add_default_parsers();
        }
        let fetcher = self
            .fetcher
            .get_or_insert_with(|| Box::new(DefaultFetcher::new()));

        self.link.reset();
        self.state = PreviewState::Fetching;
        debug!(fetcher = fetcher.name(), url = %self.link.url(), "Fetching link");

        let fetched = match fetcher.fetch(self.link.clone()).await {
            Ok(fetched) if fetched.url() == self.link.url() => fetched,
            Ok(fetched) => {
                self.state = PreviewState::Failed;
                warn!(
                    url = %self.link.url(),
                    returned = %fetched.url(),
                    "Fetcher changed the link url"
                );
                return Err(FetchError::UrlChanged);
            }
            Err(e) => {
                self.state = PreviewState::Failed;
                warn!(url = %self.link.url(), error = %e, "Fetch failed");
                return Err(e);
            }
        };
        self.link = fetched;

        self.state = PreviewState::Parsing;
        let mut parsed = ParsedLinks::new();

        for parser in self.parsers.iter() {
            if !parser.is_applicable(&self.link) {
                debug!(parser = parser.name(), "Parser not applicable");
                continue;
            }

            match parser.parse(&self.link) {
                Ok(link) => {
                    debug!(parser = parser.name(), url = %self.link.url(), "Parser matched");
                    parsed.insert(parser.name().to_string(), link);
                    if !self.propagation {
                        break;
                    }
                }
                Err(e) => {
                    warn!(parser = parser.name(), error = %e, "Parser failed, skipping");
                }
            }
        }

        self.state = PreviewState::Done;
        Ok(parsed)
    }

    fn add_default_parsers(&mut self) {
        self.parsers.add(Box::new(GeneralParser::new()));
    }
}

/// Builder for [`LinkPreview`]
#[derive(Default)]
pub struct LinkPreviewBuilder {
    url: Option<String>,
    link: Option<Link>,
    fetcher: Option<Box<dyn Fetcher>>,
    parsers: Vec<Box<dyn Parser>>,
    propagation: bool,
}

impl LinkPreviewBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the URL to preview
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the link record to preview; takes precedence over `url`
    pub fn link(mut self, link: Link) -> Self {
        self.link = Some(link);
        self
    }

    /// Set a custom fetcher
    pub fn fetcher(mut self, fetcher: Box<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Add a parser; later calls are tried first
    pub fn parser(mut self, parser: Box<dyn Parser>) -> Self {
        self.parsers.push(parser);
        self
    }

    /// Set propagation
    pub fn propagation(mut self, propagation: bool) -> Self {
        self.propagation = propagation;
        self
    }

    /// Build the preview
    pub fn build(self) -> Result<LinkPreview, FetchError> {
        let link = match (self.link, self.url) {
            (Some(link), _) => link,
            (None, Some(url)) => Link::new(url)?,
            (None, None) => return Err(FetchError::MissingUrl),
        };

        let mut preview = LinkPreview::from_link(link);
        if let Some(fetcher) = self.fetcher {
            preview.set_fetcher(fetcher);
        }
        for parser in self.parsers {
            preview.add_parser(parser);
        }
        preview.set_propagation(self.propagation);
        Ok(preview)
    }
}

/// Preview `url` with the default fetcher and parser
///
/// For custom fetchers, parsers or propagation, use [`LinkPreview`] directly.
pub async fn preview(url: &str) -> Result<ParsedLinks, FetchError> {
    LinkPreview::new(url)?.get_parsed().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Serves fixed content, or fails with a fixed status
    struct StubFetcher {
        content_type: &'static str,
        body: &'static str,
        fail_status: Option<u16>,
        calls: Arc<AtomicUsize>,
    }

    impl StubFetcher {
        fn html(body: &'static str) -> Self {
            Self {
                content_type: "text/html",
                body,
                fail_status: None,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                fail_status: Some(status),
                ..Self::html("")
            }
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn fetch(&self, mut link: Link) -> Result<Link, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(status) = self.fail_status {
                return Err(FetchError::HttpStatus(status));
            }
            let url = link.url().to_string();
            link.set_content(self.body)
                .set_content_type(self.content_type)
                .set_real_url(url);
            Ok(link)
        }
    }

    /// Matches when the body contains `marker`, records calls to `parse`
    struct MarkerParser {
        name: &'static str,
        marker: &'static str,
        parses: Arc<AtomicUsize>,
    }

    impl MarkerParser {
        fn new(name: &'static str, marker: &'static str) -> Self {
            Self {
                name,
                marker,
                parses: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Parser for MarkerParser {
        fn name(&self) -> &str {
            self.name
        }

        fn is_applicable(&self, link: &Link) -> bool {
            link.content().is_some_and(|c| c.contains(self.marker))
        }

        fn parse(&self, link: &Link) -> Result<Link, ParseError> {
            self.parses.fetch_add(1, Ordering::SeqCst);
            let mut parsed = link.clone();
            parsed.metadata_mut().title = Some(self.name.to_string());
            Ok(parsed)
        }
    }

    struct BrokenParser;

    impl Parser for BrokenParser {
        fn name(&self) -> &str {
            "broken"
        }

        fn is_applicable(&self, _link: &Link) -> bool {
            true
        }

        fn parse(&self, _link: &Link) -> Result<Link, ParseError> {
            Err(ParseError::Failed("boom".to_string()))
        }
    }

    fn preview_with(fetcher: StubFetcher) -> LinkPreview {
        let mut preview = LinkPreview::new("https://example.com/a").unwrap();
        preview.set_fetcher(Box::new(fetcher));
        preview
    }

    #[test]
    fn test_defaults() {
        let preview = LinkPreview::new("https://example.com").unwrap();
        assert!(!preview.propagation());
        assert!(preview.parsers().is_empty());
        assert!(preview.fetcher().is_none());
        assert_eq!(preview.state(), PreviewState::Idle);
        assert!(!preview.link().is_fetched());
    }

    #[test]
    fn test_new_rejects_empty_url() {
        assert!(matches!(LinkPreview::new(""), Err(FetchError::MissingUrl)));
    }

    #[tokio::test]
    async fn test_general_parser_scenario() {
        let mut preview = preview_with(StubFetcher::html(
            r#"<html><head><meta property="og:title" content="Example"></head></html>"#,
        ));

        let parsed = preview.get_parsed().await.unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed["general"].title(), Some("Example"));
        assert_eq!(preview.state(), PreviewState::Done);
        assert!(preview.link().is_fetched());
    }

    #[tokio::test]
    async fn test_empty_registry_gets_general_parser() {
        let mut preview = preview_with(StubFetcher::html("<html></html>"));
        preview.get_parsed().await.unwrap();
        assert_eq!(preview.parsers().names(), vec!["general"]);
    }

    #[tokio::test]
    async fn test_missing_fetcher_installs_default() {
        let mut preview = LinkPreview::new("ftp://example.com/file").unwrap();

        let result = preview.get_parsed().await;

        assert!(matches!(result, Err(FetchError::InvalidUrlScheme)));
        assert_eq!(preview.fetcher().map(|f| f.name()), Some("default"));
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_parsers() {
        let parser = MarkerParser::new("custom", "");
        let parses = parser.parses.clone();
        let mut preview = preview_with(StubFetcher::failing(500));
        preview.add_parser(Box::new(parser));

        let result = preview.get_parsed().await;

        assert!(matches!(result, Err(FetchError::HttpStatus(500))));
        assert_eq!(parses.load(Ordering::SeqCst), 0);
        assert_eq!(preview.state(), PreviewState::Failed);
        assert!(!preview.link().is_fetched());
    }

    #[tokio::test]
    async fn test_fetcher_called_once() {
        let fetcher = StubFetcher::html("<html></html>");
        let calls = fetcher.calls.clone();
        let mut preview = preview_with(fetcher);
        preview.set_propagation(true);
        preview.add_parser(Box::new(MarkerParser::new("a", "html")));
        preview.add_parser(Box::new(MarkerParser::new("b", "html")));

        preview.get_parsed().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_only_applicable_parser_matches() {
        let mut preview = preview_with(StubFetcher::html("custom-marker"));
        preview.add_parser(Box::new(GeneralParser::new()));
        preview.add_parser(Box::new(MarkerParser::new("custom", "custom-marker")));

        let parsed = preview.get_parsed().await.unwrap();

        assert_eq!(parsed.len(), 1);
        assert!(parsed.contains_key("custom"));
    }

    #[tokio::test]
    async fn test_first_match_stops_chain() {
        let first = MarkerParser::new("first", "html");
        let second = MarkerParser::new("second", "html");
        let first_parses = first.parses.clone();
        let mut preview = preview_with(StubFetcher::html("<html></html>"));
        preview.add_parser(Box::new(first));
        preview.add_parser(Box::new(second));

        let parsed = preview.get_parsed().await.unwrap();

        // Last added is tried first
        assert_eq!(parsed.keys().collect::<Vec<_>>(), vec!["second"]);
        assert_eq!(first_parses.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_not_applicable_does_not_stop_chain() {
        let mut preview = preview_with(StubFetcher::html("<html></html>"));
        preview.add_parser(Box::new(MarkerParser::new("html", "<html>")));
        preview.add_parser(Box::new(MarkerParser::new("never", "no such marker")));

        let parsed = preview.get_parsed().await.unwrap();

        assert_eq!(parsed.keys().collect::<Vec<_>>(), vec!["html"]);
    }

    #[tokio::test]
    async fn test_propagation_runs_every_applicable_parser() {
        let mut preview = preview_with(StubFetcher::html("<html></html>"));
        preview.set_propagation(true);
        preview.add_parser(Box::new(GeneralParser::new()));
        preview.add_parser(Box::new(MarkerParser::new("a", "html")));
        preview.add_parser(Box::new(MarkerParser::new("skipped", "zzz")));
        preview.add_parser(Box::new(MarkerParser::new("b", "html")));

        let parsed = preview.get_parsed().await.unwrap();

        assert_eq!(parsed.len(), 3);
        assert!(parsed.contains_key("general"));
        assert_eq!(parsed["a"].title(), Some("a"));
        assert_eq!(parsed["b"].title(), Some("b"));
        assert!(!parsed.contains_key("skipped"));
    }

    #[tokio::test]
    async fn test_parse_error_is_skipped() {
        let mut preview = preview_with(StubFetcher::html("<html></html>"));
        preview.add_parser(Box::new(MarkerParser::new("fallback", "html")));
        preview.add_parser(Box::new(BrokenParser));

        let parsed = preview.get_parsed().await.unwrap();

        assert_eq!(parsed.keys().collect::<Vec<_>>(), vec!["fallback"]);
    }

    #[tokio::test]
    async fn test_no_match_returns_empty_map() {
        let mut preview = preview_with(StubFetcher {
            content_type: "application/json",
            ..StubFetcher::html(r#"{"key":"value"}"#)
        });

        let parsed = preview.get_parsed().await.unwrap();

        assert!(parsed.is_empty());
        assert_eq!(preview.state(), PreviewState::Done);
    }

    #[tokio::test]
    async fn test_remove_parser_restores_priority() {
        let mut preview = preview_with(StubFetcher::html("<html></html>"));
        preview.add_parser(Box::new(MarkerParser::new("a", "html")));
        preview.add_parser(Box::new(MarkerParser::new("b", "html")));
        preview.remove_parser("b").remove_parser("not-registered");

        let parsed = preview.get_parsed().await.unwrap();

        assert_eq!(parsed.keys().collect::<Vec<_>>(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_rerun_starts_from_unfetched_link() {
        let mut preview = preview_with(StubFetcher::html(
            r#"<html><head><title>Again</title></head></html>"#,
        ));

        let first = preview.get_parsed().await.unwrap();
        let second = preview.get_parsed().await.unwrap();

        assert_eq!(first, second);
        assert!(preview.link().metadata().is_empty());
    }

    struct UrlSwappingFetcher;

    #[async_trait]
    impl Fetcher for UrlSwappingFetcher {
        fn name(&self) -> &'static str {
            "swapping"
        }

        async fn fetch(&self, _link: Link) -> Result<Link, FetchError> {
            Link::new("https://other.example.com")
        }
    }

    #[tokio::test]
    async fn test_fetcher_must_keep_url() {
        let mut preview = LinkPreview::new("https://example.com").unwrap();
        preview.set_fetcher(Box::new(UrlSwappingFetcher));

        let result = preview.get_parsed().await;

        assert!(matches!(result, Err(FetchError::UrlChanged)));
        assert_eq!(preview.link().url(), "https://example.com");
    }

    #[test]
    fn test_set_url_substitutes_link() {
        let mut preview = LinkPreview::new("https://example.com/a").unwrap();
        preview.set_url("https://example.com/b").unwrap();
        assert_eq!(preview.link().url(), "https://example.com/b");
        assert!(preview.set_url("").is_err());
        assert_eq!(preview.link().url(), "https://example.com/b");
    }

    #[test]
    fn test_builder() {
        let preview = LinkPreview::builder()
            .url("https://example.com")
            .fetcher(Box::new(StubFetcher::html("")))
            .parser(Box::new(MarkerParser::new("a", "")))
            .parser(Box::new(MarkerParser::new("b", "")))
            .propagation(true)
            .build()
            .unwrap();

        assert_eq!(preview.link().url(), "https://example.com");
        assert_eq!(preview.fetcher().map(|f| f.name()), Some("stub"));
        assert_eq!(preview.parsers().names(), vec!["b", "a"]);
        assert!(preview.propagation());
    }

    #[test]
    fn test_builder_requires_url() {
        let result = LinkPreview::builder().build();
        assert!(matches!(result, Err(FetchError::MissingUrl)));
    }
}
