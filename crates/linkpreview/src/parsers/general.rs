//! General HTML parser
//!
//! Fallback strategy for any HTML page. Reads Open Graph and Twitter card
//! tags, then falls back to plain HTML (`<title>`, meta description,
//! canonical link, images).

use crate::error::ParseError;
use crate::link::{Link, LinkMetadata};
use crate::parsers::Parser;
use scraper::{Html, Selector};
use std::collections::HashMap;
use url::Url;

const TITLE_KEYS: &[&str] = &["og:title", "twitter:title"];
const DESCRIPTION_KEYS: &[&str] = &["og:description", "twitter:description", "description"];
const CANONICAL_SELECTOR: &str = r#"link[rel~="canonical"][href]"#;
const IMAGE_SRC_SELECTOR: &str = r#"link[rel~="image_src"][href]"#;
const IMAGE_KEYS: &[&str] = &[
    "og:image",
    "og:image:secure_url",
    "twitter:image",
    "twitter:image:src",
];
const SITE_NAME_KEYS: &[&str] = &["og:site_name", "application-name"];
const KIND_KEYS: &[&str] = &["og:type"];
const VIDEO_KEYS: &[&str] = &[
    "og:video:secure_url",
    "og:video:url",
    "og:video",
    "twitter:player",
];

/// General HTML parser
///
/// Applicable to any link whose content is HTML.
#[derive(Debug, Clone, Default)]
pub struct GeneralParser;

impl GeneralParser {
    pub const NAME: &'static str = "general";

    /// Create a new general parser
    pub fn new() -> Self {
        Self
    }
}

impl Parser for GeneralParser {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_applicable(&self, link: &Link) -> bool {
        is_html(link.content_type(), link.content().unwrap_or_default())
    }

    fn parse(&self, link: &Link) -> Result<Link, ParseError> {
        let content = link.content().ok_or(ParseError::MissingContent)?;
        let document = Html::parse_document(content);
        let base = link.base_url();
        let meta = collect_meta(&document)?;

        let title = match lookup(&meta, TITLE_KEYS) {
            Some(title) => Some(title),
            None => first_text(&document, "title")?,
        };
        let image = match lookup(&meta, IMAGE_KEYS) {
            Some(image) => Some(image),
            None => first_attr(&document, IMAGE_SRC_SELECTOR, "href")?,
        };
        let canonical_url = match first_attr(&document, CANONICAL_SELECTOR, "href")? {
            Some(href) => Some(href),
            None => lookup(&meta, &["og:url"]),
        };

        let metadata = LinkMetadata {
            title,
            description: lookup(&meta, DESCRIPTION_KEYS),
            image: image.map(|v| resolve(base.as_ref(), &v)),
            kind: lookup(&meta, KIND_KEYS),
            site_name: lookup(&meta, SITE_NAME_KEYS),
            canonical_url: canonical_url.map(|v| resolve(base.as_ref(), &v)),
            video: lookup(&meta, VIDEO_KEYS).map(|v| resolve(base.as_ref(), &v)),
            pictures: collect_pictures(&document, base.as_ref())?,
        };

        let mut parsed = link.clone();
        parsed.set_metadata(metadata);
        Ok(parsed)
    }
}

/// Check if content is HTML based on content type and body
pub fn is_html(content_type: Option<&str>, body: &str) -> bool {
    if let Some(ct) = content_type {
        let ct_lower = ct.to_lowercase();
        if ct_lower.contains("text/html") || ct_lower.contains("application/xhtml") {
            return true;
        }
    }

    let trimmed = body.trim_start();
    let head: String = trimmed.chars().take(9).collect::<String>().to_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}

fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|_| ParseError::InvalidSelector(css.to_string()))
}

/// Collect `<meta>` values keyed by lowercased `property` or `name`
///
/// The first occurrence of a key wins.
fn collect_meta(document: &Html) -> Result<HashMap<String, String>, ParseError> {
    let sel = selector("meta[content]")?;
    let mut meta = HashMap::new();

    for element in document.select(&sel) {
        let el = element.value();
        let key = el.attr("property").or_else(|| el.attr("name"));
        if let (Some(key), Some(content)) = (key, el.attr("content")) {
            if let Some(value) = clean(content) {
                meta.entry(key.trim().to_lowercase()).or_insert(value);
            }
        }
    }

    Ok(meta)
}

fn lookup(meta: &HashMap<String, String>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| meta.get(*k).cloned())
}

fn first_text(document: &Html, css: &str) -> Result<Option<String>, ParseError> {
    let sel = selector(css)?;
    Ok(document
        .select(&sel)
        .next()
        .and_then(|el| clean(&el.text().collect::<String>())))
}

fn first_attr(document: &Html, css: &str, attr: &str) -> Result<Option<String>, ParseError> {
    let sel = selector(css)?;
    Ok(document
        .select(&sel)
        .find_map(|el| el.value().attr(attr).and_then(clean)))
}

fn collect_pictures(document: &Html, base: Option<&Url>) -> Result<Vec<String>, ParseError> {
    let sel = selector("img[src]")?;
    let mut pictures: Vec<String> = Vec::new();

    for element in document.select(&sel) {
        let Some(src) = element.value().attr("src").and_then(clean) else {
            continue;
        };
        if src.starts_with("data:") {
            continue;
        }
        let resolved = resolve(base, &src);
        if !pictures.contains(&resolved) {
            pictures.push(resolved);
        }
    }

    Ok(pictures)
}

/// Collapse whitespace; empty values count as absent
fn clean(value: &str) -> Option<String> {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Resolve a possibly relative reference against the page URL
fn resolve(base: Option<&Url>, href: &str) -> String {
    base.and_then(|b| b.join(href).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| href.to_string())
}
