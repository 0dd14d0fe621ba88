use crate::UrlError;
use url::Url;

/// Query parameters that only carry campaign tracking and never change content
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Computes the canonical form of a URL, the key used for URL deduplication
///
/// # Canonicalization Steps
///
/// 1. Reject anything that is not http or https
/// 2. Lowercase scheme and host (done by the parser)
/// 3. Strip the scheme's default port (done by the parser)
/// 4. Normalize the path:
///    - Collapse repeated slashes
///    - Remove the trailing slash (except for the root `/`)
///    - Empty path becomes `/`
/// 5. Remove the fragment
/// 6. Remove tracking query parameters (`utm_*`, `fbclid`, `gclid`, `mc_eid`)
/// 7. Sort remaining query parameters; drop an empty query string
///
/// The rules are deterministic, so identical inputs always produce identical
/// keys across runs.
///
/// # Examples
///
/// ```
/// use site_corpus::url::canonicalize_str;
///
/// let url = canonicalize_str("HTTPS://Example.EDU:443//news/?b=2&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.edu/news?a=1&b=2");
/// ```
pub fn canonicalize(url: &Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    let mut canonical = url.clone();

    let normalized_path = normalize_path(canonical.path());
    canonical.set_path(&normalized_path);

    canonical.set_fragment(None);

    if canonical.query().is_some() {
        let params = filter_and_sort_query_params(&canonical);
        if params.is_empty() {
            canonical.set_query(None);
        } else {
            canonical.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(canonical)
}

/// Parses and canonicalizes a URL string
pub fn canonicalize_str(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    canonicalize(&url)
}

/// Collapses repeated slashes and removes a trailing slash
fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Filters out tracking parameters and sorts the rest by key, then value
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
