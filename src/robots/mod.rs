//! Robots.txt handling module
//!
//! The site's exclusion rules are fetched once, at crawl start, through the
//! same [`Fetcher`] used for pages. Plain `Disallow` paths become the
//! forbidden-prefix set; the full file is also kept for agent-aware matching.

mod parser;

pub use parser::{disallowed_paths, RobotsRules};

use crate::crawler::{FetchFailure, Fetcher};
use crate::index::UrlIndexer;
use crate::url::{canonicalize, CanonicalUrl};

/// Builds the robots.txt location for the seed's origin
pub fn robots_url(seed: &CanonicalUrl) -> Option<CanonicalUrl> {
    let origin = seed.to_url()?;
    let robots = origin.join("/robots.txt").ok()?;
    canonicalize(robots.as_str()).ok()
}

/// Fetches and parses the exclusion rules for the seed's site
///
/// Never fails: a missing, unreachable or non-textual robots.txt yields
/// empty rules, which forbid nothing.
///
/// # Arguments
///
/// * `fetcher` - The page fetcher
/// * `seed` - The canonical seed URL
/// * `indexer` - Resolves forbidden paths into canonical prefixes
pub async fn fetch_robots_rules<F: Fetcher>(
    fetcher: &F,
    seed: &CanonicalUrl,
    indexer: &mut UrlIndexer,
) -> RobotsRules {
    let (Some(location), Some(origin)) = (robots_url(seed), seed.to_url()) else {
        tracing::warn!("Cannot derive robots.txt location for {}", seed);
        return RobotsRules::empty();
    };

    match fetcher.fetch(&location).await {
        Ok(page) => {
            if !is_plain_rules(page.content_type.as_deref()) {
                tracing::warn!(
                    "Ignoring robots.txt at {} with content type {:?}",
                    location,
                    page.content_type
                );
                return RobotsRules::empty();
            }

            let content = String::from_utf8_lossy(&page.body);
            let rules = RobotsRules::from_content(&content, &origin, indexer);
            tracing::info!(
                "Loaded robots.txt from {}: {} forbidden prefixes",
                location,
                rules.forbidden().len()
            );
            rules
        }
        Err(FetchFailure::Status { status, .. }) => {
            tracing::info!("No robots.txt at {} (HTTP {})", location, status);
            RobotsRules::empty()
        }
        Err(e) => {
            tracing::warn!("Failed to fetch robots.txt from {}: {}", location, e);
            RobotsRules::empty()
        }
    }
}

/// robots.txt is plain text; servers that omit the header are given the benefit of the doubt
fn is_plain_rules(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(ct) => ct.trim().to_ascii_lowercase().starts_with("text/plain"),
    }
}
