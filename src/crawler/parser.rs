//! Content extraction: plain text, links, images and term frequencies
//!
//! This module handles parsing fetched bodies to extract:
//! - Visible plain text (HTML with script/style content removed, or raw text)
//! - Outbound links from `<a href>` and image sources from `<img src>`
//! - Lowercased term frequencies with stop-words removed

use scraper::{Html, Selector};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use url::Url;

/// Elements whose text is never shown to a reader
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Returns the lowercased media type without parameters
fn media_type(content_type: Option<&str>) -> Option<String> {
    content_type.map(|ct| {
        ct.split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase()
    })
}

/// Returns true if the body is HTML or XHTML
pub fn is_html(content_type: Option<&str>) -> bool {
    matches!(
        media_type(content_type).as_deref(),
        Some("text/html") | Some("application/xhtml+xml")
    )
}

/// Returns true if the body is text that can be tokenized
pub fn is_textual(content_type: Option<&str>) -> bool {
    match media_type(content_type) {
        Some(mt) => mt.starts_with("text/") || mt == "application/xhtml+xml",
        None => false,
    }
}

/// A set of words excluded from term frequencies
#[derive(Debug, Clone, Default)]
pub struct StopWords {
    words: HashSet<String>,
}

impl StopWords {
    /// An empty list
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a stop-word list: one word per line, `#` starts a comment
    pub fn from_text(text: &str) -> Self {
        let words = text
            .lines()
            .map(|line| line.split('#').next().unwrap_or("").trim())
            .filter(|word| !word.is_empty())
            .map(str::to_lowercase)
            .collect();
        Self { words }
    }

    /// Loads a stop-word file, falling back to an empty list if it cannot be read
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let stopwords = Self::from_text(&text);
                tracing::info!(
                    "Loaded {} stop-words from {}",
                    stopwords.len(),
                    path.display()
                );
                stopwords
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read stop-words from {}, using none: {}",
                    path.display(),
                    e
                );
                Self::empty()
            }
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// The text-extraction collaborator
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    stopwords: StopWords,
}

impl Extractor {
    pub fn new(stopwords: StopWords) -> Self {
        Self { stopwords }
    }

    /// Extracts readable text from a body
    ///
    /// Returns `None` for non-textual content types. HTML is reduced to its
    /// visible text nodes joined by single spaces; other text is returned as is.
    pub fn extract_plain_text(&self, body: &[u8], content_type: Option<&str>) -> Option<String> {
        if !is_textual(content_type) {
            return None;
        }

        let raw = String::from_utf8_lossy(body);
        if !is_html(content_type) {
            return Some(raw.into_owned());
        }

        let document = Html::parse_document(&raw);
        let mut pieces: Vec<&str> = Vec::new();

        for node in document.root_element().descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };

            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .map_or(false, |el| INVISIBLE_ELEMENTS.contains(&el.name()))
            });
            if hidden {
                continue;
            }

            let trimmed = text.trim();
            if !trimmed.is_empty() {
                pieces.push(trimmed);
            }
        }

        Some(pieces.join(" "))
    }

    /// Extracts absolute `<a href>` targets
    pub fn extract_links(&self, html: &str, base_url: &Url) -> Vec<String> {
        extract_attribute(html, "a[href]", "href", base_url)
    }

    /// Extracts absolute `<img src>` targets
    pub fn extract_image_sources(&self, html: &str, base_url: &Url) -> Vec<String> {
        extract_attribute(html, "img[src]", "src", base_url)
    }

    /// Counts terms: lowercased alphanumeric runs, minus stop-words and pure numbers
    pub fn tokenize(&self, text: &str) -> BTreeMap<String, u32> {
        let mut frequencies = BTreeMap::new();

        for token in text.split(|c: char| !c.is_alphanumeric()) {
            if token.is_empty() || token.chars().all(|c| c.is_numeric()) {
                continue;
            }

            let term = token.to_lowercase();
            if self.stopwords.contains(&term) {
                continue;
            }

            *frequencies.entry(term).or_insert(0) += 1;
        }

        frequencies
    }
}

/// Collects one attribute from every element matching `selector`
fn extract_attribute(html: &str, selector: &str, attribute: &str, base_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attribute))
        .filter_map(|value| resolve_link(value, base_url))
        .collect()
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
