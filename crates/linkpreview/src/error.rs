//! Error types for LinkPreview

use thiserror::Error;

/// Errors that can occur while building a link or fetching its content
///
/// A fetch error is fatal to a preview run: no parser is attempted.
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL is missing
    #[error("Missing required parameter: url")]
    MissingUrl,

    /// URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// URL has a scheme the fetcher cannot retrieve
    #[error("Invalid URL: must start with http:// or https://")]
    InvalidUrlScheme,

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuildError(#[source] reqwest::Error),

    /// Request timed out before the server responded
    #[error("Request timed out")]
    Timeout,

    /// Failed to connect to server
    #[error("Failed to connect to server")]
    ConnectError(#[source] reqwest::Error),

    /// Redirect limit exceeded
    #[error("Too many redirects")]
    TooManyRedirects,

    /// Server answered with a non-success status
    #[error("Request failed with HTTP status {0}")]
    HttpStatus(u16),

    /// Other request error
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Fetcher returned a link for a different url
    #[error("Fetcher changed the link url")]
    UrlChanged,

    /// Fetcher-specific error
    #[error("Fetcher error: {0}")]
    FetcherError(String),
}

impl FetchError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::ConnectError(err)
        } else if err.is_redirect() {
            FetchError::TooManyRedirects
        } else if let Some(status) = err.status() {
            FetchError::HttpStatus(status.as_u16())
        } else {
            FetchError::RequestError(err.to_string())
        }
    }
}

/// Errors a parser may report from its extraction step
///
/// These never abort a run. The orchestrator logs them and moves on to
/// the next parser.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Link has no fetched content to parse
    #[error("Link has no content")]
    MissingContent,

    /// A CSS selector failed to compile
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Parser-specific failure
    #[error("Parse failed: {0}")]
    Failed(String),
}
