//! Fetchers retrieve raw content for a link
//!
//! Design: a preview run calls its fetcher exactly once. The fetcher fills
//! in `content`, `content_type` and `real_url` and hands the link back.

mod default;

pub use default::{DefaultFetcher, FetchOptions};

use crate::error::FetchError;
use crate::link::Link;
use async_trait::async_trait;

/// Trait for content fetchers
///
/// Implement this trait to retrieve links from somewhere other than the
/// network, or to customize how HTTP is done.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Identifier for this fetcher (for logging/debugging)
    fn name(&self) -> &'static str;

    /// Retrieve the content for `link`
    ///
    /// Returns the link with `content`, `content_type` and `real_url`
    /// populated, or a [`FetchError`] which aborts the run. The returned
    /// link must keep the url it was given.
    async fn fetch(&self, link: Link) -> Result<Link, FetchError>;
}
