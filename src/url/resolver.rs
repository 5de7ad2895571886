//! Memoized identity resolution
//!
//! The resolver remembers every raw spelling it has canonicalized, so repeated
//! resolution of the same string is a map lookup. The raw → canonical map is
//! exported into the crawl checkpoint and restored on the next run.

use crate::url::{canonicalize, CanonicalUrl};
use crate::UrlResult;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Memoizing wrapper around [`canonicalize`]
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    resolved: HashMap<String, CanonicalUrl>,
}

impl IdentityResolver {
    /// Creates an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a raw URL to its canonical identity
    ///
    /// The first resolution of an unseen raw string records it in the
    /// persisted map. Unresolvable input is returned as an error and is
    /// not recorded.
    pub fn resolve(&mut self, raw: &str) -> UrlResult<CanonicalUrl> {
        if let Some(canonical) = self.resolved.get(raw) {
            return Ok(canonical.clone());
        }

        let canonical = canonicalize(raw)?;
        self.resolved.insert(raw.to_string(), canonical.clone());
        self.resolved
            .entry(canonical.as_str().to_string())
            .or_insert_with(|| canonical.clone());
        Ok(canonical)
    }

    /// Resolves a list of raw URLs, preserving order
    ///
    /// Unresolvable entries are dropped. With `collapse` set, later duplicates
    /// of an already emitted canonical URL are removed as well.
    pub fn resolve_all<I, S>(&mut self, raws: I, collapse: bool) -> Vec<CanonicalUrl>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for raw in raws {
            let raw = raw.as_ref();
            match self.resolve(raw) {
                Ok(canonical) => {
                    if collapse && !seen.insert(canonical.clone()) {
                        continue;
                    }
                    out.push(canonical);
                }
                Err(e) => {
                    tracing::debug!("Dropping unresolvable URL {:?}: {}", raw, e);
                }
            }
        }

        out
    }

    /// Returns the cached resolution of a raw URL without computing it
    pub fn cached(&self, raw: &str) -> Option<&CanonicalUrl> {
        self.resolved.get(raw)
    }

    /// Number of raw spellings known to the resolver
    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    /// Exports the raw → canonical map (sorted for stable checkpoints)
    pub fn export(&self) -> BTreeMap<String, CanonicalUrl> {
        self.resolved
            .iter()
            .map(|(raw, canonical)| (raw.clone(), canonical.clone()))
            .collect()
    }

    /// Rebuilds a resolver from an exported map
    ///
    /// Entries whose canonical side is not itself canonical (a hand-edited or
    /// stale checkpoint) are skipped and will be recomputed on demand.
    pub fn restore(mapping: BTreeMap<String, CanonicalUrl>) -> Self {
        let mut resolved = HashMap::with_capacity(mapping.len());

        for (raw, canonical) in mapping {
            match canonicalize(canonical.as_str()) {
                Ok(recomputed) if recomputed == canonical => {
                    resolved.insert(raw, canonical);
                }
                _ => {
                    tracing::warn!(
                        "Skipping stale resolver entry {:?} -> {}",
                        raw,
                        canonical
                    );
                }
            }
        }

        Self { resolved }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_records_mapping() {
        let mut resolver = IdentityResolver::new();
        let canonical = resolver.resolve("HTTP://Example.com/a/").unwrap();

        assert_eq!(canonical.as_str(), "http://example.com/a/");
        assert_eq!(resolver.cached("HTTP://Example.com/a/"), Some(&canonical));
        assert_eq!(resolver.cached("http://example.com/a/"), Some(&canonical));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut resolver = IdentityResolver::new();
        let once = resolver.resolve("http://ex.com/x/../y/?b=2&a=1").unwrap();
        let twice = resolver.resolve(once.as_str()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unresolvable_is_not_recorded() {
        let mut resolver = IdentityResolver::new();
        assert!(resolver.resolve("javascript:void(0)").is_err());
        assert!(resolver.is_empty());
    }

    #[test]
    fn test_resolve_all_preserves_order_and_duplicates() {
        let mut resolver = IdentityResolver::new();
        let out = resolver.resolve_all(
            ["http://ex.com/b", "http://ex.com/a", "http://EX.com:80/b"],
            false,
        );
        let strs: Vec<_> = out.iter().map(|u| u.as_str()).collect();
        assert_eq!(strs, vec!["http://ex.com/b", "http://ex.com/a", "http://ex.com/b"]);
    }

    #[test]
    fn test_resolve_all_collapse_keeps_first_seen() {
        let mut resolver = IdentityResolver::new();
        let out = resolver.resolve_all(
            [
                "http://ex.com/b",
                "not a url",
                "http://ex.com/a",
                "HTTP://EX.com/b#top",
            ],
            true,
        );
        let strs: Vec<_> = out.iter().map(|u| u.as_str()).collect();
        assert_eq!(strs, vec!["http://ex.com/b", "http://ex.com/a"]);
    }

    #[test]
    fn test_export_restore_round_trip() {
        let mut resolver = IdentityResolver::new();
        let raws = ["http://ex.com/a/", "HTTP://EX.COM/b#x", "http://ex.com:80/c"];
        let before: Vec<_> = raws.iter().map(|r| resolver.resolve(r).unwrap()).collect();

        let restored = IdentityResolver::restore(resolver.export());
        assert_eq!(restored.len(), resolver.len());

        for (raw, expected) in raws.iter().zip(before) {
            assert_eq!(restored.cached(raw), Some(&expected));
        }
    }

    #[test]
    fn test_restore_skips_non_canonical_entries() {
        let mut mapping = BTreeMap::new();
        mapping.insert(
            "http://ex.com/a/".to_string(),
            canonicalize("http://ex.com/a").unwrap(),
        );
        let bogus: CanonicalUrl = serde_json::from_str("\"http://EX.com/b/\"").unwrap();
        mapping.insert("http://ex.com/b".to_string(), bogus);

        let mut restored = IdentityResolver::restore(mapping);
        assert_eq!(restored.len(), 1);
        assert_eq!(
            restored.resolve("http://ex.com/b").unwrap().as_str(),
            "http://ex.com/b"
        );
    }
}
