use crate::url::CanonicalUrl;
use crate::UrlError;
use url::Url;

/// List of tracking query parameters to remove during canonicalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
];

/// Canonicalizes a raw URL string into its identity form
///
/// # Canonicalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only `http` and `https` schemes (the scheme is lowercased)
/// 3. Lowercase the host and drop a trailing root dot
/// 4. Drop the port when it is the scheme default
/// 5. Normalize path:
///    - Remove dot segments (. and ..) and empty segments
///    - Keep a trailing slash: `/a/` names a directory and is distinct from `/a`
///    - Empty path becomes /
/// 6. Remove fragment (everything after #)
/// 7. Remove tracking query parameters
/// 8. Sort remaining query parameters by key, then value
/// 9. Remove empty query string (trailing ?)
///
/// Query parameters are kept in their encoded form, so `?flag` stays `?flag`
/// and `%20` is not rewritten as `+`.
///
/// The result is idempotent: canonicalizing a canonical URL returns it unchanged.
///
/// # Examples
///
/// ```
/// use site_indexer::url::canonicalize;
///
/// let url = canonicalize("HTTP://Example.COM:80/a/./b/#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/a/b/");
/// ```
pub fn canonicalize(raw: &str) -> Result<CanonicalUrl, UrlError> {
    // Step 1: Parse the URL
    let mut url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    // Step 2: Validate scheme
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    // Step 3: Lowercase the host
    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host.to_lowercase(),
        _ => return Err(UrlError::MissingHost),
    };
    let host = host.strip_suffix('.').unwrap_or(&host).to_string();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    // Step 4: Default ports are dropped by the parser already; make it explicit
    if url.port().is_some() && url.port() == default_port(url.scheme()) {
        let _ = url.set_port(None);
    }

    // Step 5: Normalize path
    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    // Step 6: Remove fragment
    url.set_fragment(None);

    // Step 7 & 8: Filter and sort query parameters
    let query = url.query().map(filter_and_sort_query);
    if let Some(query) = query {
        // Step 9: Set query or remove if empty
        if query.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&query));
        }
    }

    Ok(CanonicalUrl::from_normalized(url))
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// Normalizes a URL path by removing dot and empty segments
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            // Skip empty segments (from multiple slashes) and current directory markers
            "" | "." => continue,
            // Parent directory - pop the last segment if possible
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    let directory = path.ends_with('/') || path.ends_with("/.") || path.ends_with("/..");
    if directory {
        format!("/{}/", segments.join("/"))
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Filters out tracking parameters and sorts the rest by key, then value
///
/// Works on the raw `&`-separated pieces so the encoding of each piece is
/// preserved.
fn filter_and_sort_query(query: &str) -> String {
    let mut params: Vec<(&str, Option<&str>)> = query
        .split('&')
        .filter(|piece| !piece.is_empty())
        .map(|piece| match piece.split_once('=') {
            Some((key, value)) => (key, Some(value)),
            None => (piece, None),
        })
        .filter(|(key, _)| !is_tracking_param(key))
        .collect();

    params.sort();
    params
        .iter()
        .map(|(key, value)| match value {
            Some(value) => format!("{}={}", key, value),
            None => key.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
