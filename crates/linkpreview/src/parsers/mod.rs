//! Parser system for metadata extraction
//!
//! Design: each parser declares which fetched links it understands via
//! `is_applicable()` and extracts metadata via `parse()`. ParserRegistry
//! keeps parsers in attempt order, newest first.

mod general;

pub use general::{is_html, GeneralParser};

use crate::error::ParseError;
use crate::link::Link;

/// Trait for metadata parsers
///
/// Implement this trait to add a page-specific strategy (oEmbed, a
/// particular site's markup, ...). Register it with
/// [`LinkPreview::add_parser`](crate::LinkPreview::add_parser).
pub trait Parser: Send + Sync {
    /// Unique name, used as the registry key and the result key
    fn name(&self) -> &str;

    /// Returns true if this parser can extract metadata from `link`
    ///
    /// Called with a fetched link. Must be cheap and must not do I/O.
    fn is_applicable(&self, link: &Link) -> bool;

    /// Extract metadata from `link`
    ///
    /// Called only if `is_applicable()` returned true. Returns a copy of the
    /// link with whatever metadata could be found; missing fields are not
    /// an error.
    fn parse(&self, link: &Link) -> Result<Link, ParseError>;
}

/// Ordered, name-keyed collection of parsers
///
/// Iteration order is attempt order. [`add`](Self::add) inserts at the
/// front, so the most recently added parser is tried first.
#[derive(Default)]
pub struct ParserRegistry {
    parsers: Vec<Box<dyn Parser>>,
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl ParserRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding only the [`GeneralParser`]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.add(Box::new(GeneralParser::new()));
        registry
    }

    /// Add a parser at the front
    ///
    /// A parser already registered under the same name is replaced.
    pub fn add(&mut self, parser: Box<dyn Parser>) {
        self.remove(parser.name());
        self.parsers.insert(0, parser);
    }

    /// Remove the parser registered under `name`, if any
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Parser>> {
        let pos = self.parsers.iter().position(|p| p.name() == name)?;
        Some(self.parsers.remove(pos))
    }

    /// Look up a parser by name
    pub fn get(&self, name: &str) -> Option<&dyn Parser> {
        self.parsers
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    /// Whether a parser with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Parser names in attempt order
    pub fn names(&self) -> Vec<&str> {
        self.parsers.iter().map(|p| p.name()).collect()
    }

    /// Parsers in attempt order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Parser> {
        self.parsers.iter().map(|p| p.as_ref())
    }

    /// Number of registered parsers
    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    /// Whether no parser is registered
    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}
