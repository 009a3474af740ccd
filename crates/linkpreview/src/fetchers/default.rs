//! Default HTTP fetcher
//!
//! Issues a single GET for the link's url, follows redirects and captures
//! the body, the `Content-Type` header and the effective URL.

use crate::error::FetchError;
use crate::fetchers::Fetcher;
use crate::link::Link;
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::redirect::Policy;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Binary content type prefixes
const BINARY_PREFIXES: &[&str] = &[
    "image/",
    "audio/",
    "video/",
    "application/octet-stream",
    "application/pdf",
    "application/zip",
    "application/gzip",
    "application/x-tar",
    "application/x-rar",
    "application/x-7z",
    "application/vnd.ms-",
    "application/vnd.openxmlformats",
    "font/",
];

/// Connect + first response byte timeout
const DEFAULT_FIRST_BYTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Whole body timeout
const DEFAULT_BODY_TIMEOUT: Duration = Duration::from_secs(30);

/// Body size cap; metadata lives in the head of the document
const DEFAULT_MAX_BODY_SIZE: usize = 5 * 1024 * 1024;

const DEFAULT_MAX_REDIRECTS: usize = 10;

const ACCEPT_HTML: &str = "text/html, application/xhtml+xml, */*;q=0.8";

/// Options for [`DefaultFetcher`]
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Custom User-Agent
    pub user_agent: Option<String>,
    /// Time allowed to connect and receive response headers
    pub first_byte_timeout: Duration,
    /// Time allowed to read the body; partial content is kept on expiry
    pub body_timeout: Duration,
    /// Maximum number of body bytes read
    pub max_body_size: usize,
    /// Maximum number of redirects followed
    pub max_redirects: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            user_agent: None,
            first_byte_timeout: DEFAULT_FIRST_BYTE_TIMEOUT,
            body_timeout: DEFAULT_BODY_TIMEOUT,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// Default HTTP fetcher
///
/// Handles HTTP/HTTPS links with:
/// - redirect following (effective URL stored as `real_url`)
/// - non-success status reported as [`FetchError::HttpStatus`]
/// - binary content detection (body is not downloaded)
/// - body size cap and timeout with partial content
#[derive(Debug, Clone, Default)]
pub struct DefaultFetcher {
    options: FetchOptions,
}

impl DefaultFetcher {
    /// Create a new default fetcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fetcher with custom options
    pub fn with_options(options: FetchOptions) -> Self {
        Self { options }
    }

    /// Options this fetcher was built with
    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    fn build_client(&self) -> Result<reqwest::Client, FetchError> {
        let mut headers = HeaderMap::new();
        let user_agent = self
            .options
            .user_agent
            .as_deref()
            .unwrap_or(DEFAULT_USER_AGENT);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
        );
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));

        reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(self.options.first_byte_timeout)
            .redirect(Policy::limited(self.options.max_redirects))
            .build()
            .map_err(FetchError::ClientBuildError)
    }
}

#[async_trait]
impl Fetcher for DefaultFetcher {
    fn name(&self) -> &'static str {
        "default"
    }

    async fn fetch(&self, mut link: Link) -> Result<Link, FetchError> {
        let url = Url::parse(link.url()).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrlScheme);
        }

        let client = self.build_client()?;

        // Headers must arrive within the first-byte timeout; the body has its own
        let response = tokio::time::timeout(
            self.options.first_byte_timeout,
            client.get(url).send(),
        )
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            debug!(url = %link.url(), status = status.as_u16(), "Non-success status");
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let real_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let content = match content_type.as_deref() {
            Some(ct) if is_binary_content_type(ct) => {
                debug!(url = %real_url, content_type = ct, "Skipping binary body");
                String::new()
            }
            _ => {
                let (body, truncated) = read_body(
                    response,
                    self.options.body_timeout,
                    self.options.max_body_size,
                )
                .await?;
                if truncated {
                    debug!(url = %real_url, size = body.len(), "Body truncated");
                }
                String::from_utf8_lossy(&body).into_owned()
            }
        };

        link.set_real_url(real_url).set_content(content);
        if let Some(ct) = content_type {
            link.set_content_type(ct);
        }
        Ok(link)
    }
}

/// Check if content type indicates binary content
fn is_binary_content_type(content_type: &str) -> bool {
    let ct_lower = content_type.to_lowercase();
    BINARY_PREFIXES
        .iter()
        .any(|prefix| ct_lower.starts_with(prefix))
}

/// Read response body up to `max_size` bytes within `timeout`
///
/// Returns the bytes read and whether the body was cut short by the size
/// cap or the timeout. A transport error while reading fails the fetch.
async fn read_body(
    response: reqwest::Response,
    timeout: Duration,
    max_size: usize,
) -> Result<(Bytes, bool), FetchError> {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let chunk_future = stream.next();
        let timeout_future = tokio::time::sleep_until(deadline);

        tokio::select! {
            chunk = chunk_future => {
                match chunk {
                    Some(Ok(bytes)) => {
                        let remaining = max_size - body.len();
                        if bytes.len() >= remaining {
                            body.extend_from_slice(&bytes[..remaining]);
                            return Ok((Bytes::from(body), true));
                        }
                        body.extend_from_slice(&bytes);
                    }
                    Some(Err(e)) => {
                        warn!(read = body.len(), "Error reading body chunk: {}", e);
                        return Err(FetchError::from_reqwest(e));
                    }
                    None => {
                        return Ok((Bytes::from(body), false));
                    }
                }
            }
            _ = timeout_future => {
                warn!("Body timeout reached, keeping partial content");
                return Ok((Bytes::from(body), true));
            }
        }
    }
}
