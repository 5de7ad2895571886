//! URL handling module for Site-Indexer
//!
//! This module provides URL canonicalization, the memoized identity resolver
//! built on top of it, and the scope primitives used for frontier admission.

mod normalize;
mod resolver;
mod scope;

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

// Re-export main functions
pub use normalize::canonicalize;
pub use resolver::IdentityResolver;
pub use scope::{is_forbidden, is_within};

/// The identity-resolved form of a URL
///
/// Two raw URL strings that canonicalize to the same `CanonicalUrl` denote the
/// same page. Values are only produced by [`canonicalize`] (or restored from a
/// checkpoint written by it), so the wrapped string is always a valid absolute
/// http(s) URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    pub(crate) fn from_normalized(url: Url) -> Self {
        Self(url.into())
    }

    /// Returns the canonical string form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the canonical form back into a `Url`
    pub fn to_url(&self) -> Option<Url> {
        Url::parse(&self.0).ok()
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_as_str() {
        let url = canonicalize("http://Example.com/a/").unwrap();
        assert_eq!(url.to_string(), url.as_str());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let url = canonicalize("http://example.com/a").unwrap();
        let json = serde_json::to_string(&url).unwrap();
        assert_eq!(json, "\"http://example.com/a\"");

        let back: CanonicalUrl = serde_json::from_str(&json).unwrap();
        assert_eq!(back, url);
    }

    #[test]
    fn test_to_url_round_trips() {
        let url = canonicalize("https://example.com/a?b=1").unwrap();
        assert_eq!(url.to_url().unwrap().as_str(), url.as_str());
    }
}
