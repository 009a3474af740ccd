//! LinkPreview - metadata extraction for link cards
//!
//! This crate fetches a URL and runs an ordered chain of parsers over the
//! result to find a title, description, image and canonical URL.
//!
//! ## Pipeline
//!
//! [`LinkPreview`] calls its [`Fetcher`] once, then walks its
//! [`ParserRegistry`] front to back. Each [`Parser`] that is applicable to
//! the fetched [`Link`] contributes one entry to the result, keyed by the
//! parser's name. With propagation off (the default) the chain stops at
//! the first match.
//!
//! Built-in implementations:
//! - [`DefaultFetcher`] - HTTP/HTTPS GET with redirects and timeouts
//! - [`GeneralParser`] - Open Graph, Twitter card and plain HTML metadata

mod error;
pub mod fetchers;
mod link;
pub mod parsers;
mod preview;

pub use error::{FetchError, ParseError};
pub use fetchers::{DefaultFetcher, FetchOptions, Fetcher};
pub use link::{Link, LinkMetadata};
pub use parsers::{GeneralParser, Parser, ParserRegistry};
pub use preview::{preview, LinkPreview, LinkPreviewBuilder, ParsedLinks, PreviewState};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "Everruns LinkPreview/1.0";
