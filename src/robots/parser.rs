//! Robots.txt parser implementation
//!
//! Disallow paths are extracted by hand for the forbidden-prefix set;
//! agent-specific evaluation is delegated to the robotstxt crate.

use crate::index::UrlIndexer;
use crate::url::{is_forbidden, CanonicalUrl};
use robotstxt::DefaultMatcher;
use url::Url;

/// Exclusion rules for one site
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    /// Raw robots.txt content (empty means allow all)
    content: String,
    /// Canonical prefixes no crawled URL may start with
    forbidden: Vec<CanonicalUrl>,
}

impl RobotsRules {
    /// Rules that forbid nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses robots.txt content for the site at `origin`
    ///
    /// Each plain `Disallow` path is joined to the origin and resolved; paths
    /// that cannot be resolved are dropped. The prefixes come from every
    /// user-agent group, not only the groups naming this crawler, so a site
    /// that blocks any bot from a path keeps this crawler out of it too.
    pub fn from_content(content: &str, origin: &Url, indexer: &mut UrlIndexer) -> Self {
        let absolute: Vec<String> = disallowed_paths(content)
            .into_iter()
            .filter_map(|path| origin.join(&path).ok())
            .map(|url| url.to_string())
            .collect();

        Self {
            content: content.to_string(),
            forbidden: indexer.resolve_all(absolute, true),
        }
    }

    /// The forbidden-prefix set
    pub fn forbidden(&self) -> &[CanonicalUrl] {
        &self.forbidden
    }

    /// Returns true if the URL starts with a forbidden prefix
    pub fn forbids(&self, url: &CanonicalUrl) -> bool {
        is_forbidden(url, &self.forbidden)
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - The absolute URL to check
    /// * `user_agent` - The crawler's product token
    ///
    /// # Returns
    ///
    /// * `true` - If the URL is allowed
    /// * `false` - If the URL is disallowed
    pub fn permits(&self, url: &CanonicalUrl, user_agent: &str) -> bool {
        if self.content.is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url.as_str())
    }

    /// Returns true if the URL may be crawled: not under a forbidden prefix
    /// and allowed by the matcher
    pub fn admits(&self, url: &CanonicalUrl, user_agent: &str) -> bool {
        !self.forbids(url) && self.permits(url, user_agent)
    }
}

/// Extracts the plain paths of every `Disallow` directive, in file order
///
/// Directives from all user-agent groups are collected. Empty values (which
/// allow everything) and wildcard patterns are skipped.
pub fn disallowed_paths(content: &str) -> Vec<String> {
    let mut paths = Vec::new();

    for line in content.lines() {
        let line = match line.split_once('#') {
            Some((before, _)) => before,
            None => line,
        };

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if !key.trim().eq_ignore_ascii_case("disallow") {
            continue;
        }

        let value = value.trim();
        if value.is_empty() || value.contains('*') || value.contains('$') {
            continue;
        }

        let path = if value.starts_with('/') {
            value.to_string()
        } else {
            format!("/{}", value)
        };
        paths.push(path);
    }

    paths
}
