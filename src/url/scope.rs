//! Scope checks used by frontier admission
//!
//! Two primitives with opposite polarity at the call site:
//! a candidate is admissible only if it *is* within the site bound and is
//! *not* under any robots-forbidden prefix.

use crate::url::CanonicalUrl;

/// Checks whether `candidate` is a path extension of `bound`
///
/// Both URLs must share scheme, host and port. The bound's path is matched on
/// segment boundaries, so `http://ex.com/a` contains `http://ex.com/a` and
/// `http://ex.com/a/b` but not `http://ex.com/ab`. A trailing slash on the
/// bound does not change its extent: `http://ex.com/a/` and `http://ex.com/a`
/// cover the same URLs. Query strings are ignored.
///
/// # Examples
///
/// ```
/// use site_indexer::url::{canonicalize, is_within};
///
/// let seed = canonicalize("http://ex.com/a/").unwrap();
/// assert!(is_within(&canonicalize("http://ex.com/a/b").unwrap(), &seed));
/// assert!(!is_within(&canonicalize("http://ex.com/ab").unwrap(), &seed));
/// assert!(!is_within(&canonicalize("http://other.com/a/b").unwrap(), &seed));
/// ```
pub fn is_within(candidate: &CanonicalUrl, bound: &CanonicalUrl) -> bool {
    let (Some(candidate), Some(bound)) = (candidate.to_url(), bound.to_url()) else {
        return false;
    };

    if candidate.scheme() != bound.scheme()
        || candidate.host_str() != bound.host_str()
        || candidate.port_or_known_default() != bound.port_or_known_default()
    {
        return false;
    }

    let base_path = bound.path().trim_end_matches('/');
    if base_path.is_empty() {
        return true;
    }

    let path = candidate.path();
    match path.strip_prefix(base_path) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Checks whether `candidate` starts with any of the forbidden prefixes
pub fn is_forbidden(candidate: &CanonicalUrl, forbidden: &[CanonicalUrl]) -> bool {
    forbidden
        .iter()
        .any(|prefix| candidate.as_str().starts_with(prefix.as_str()))
}
