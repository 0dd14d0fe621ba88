use url::Url;

/// Extracts the lowercase host from a URL
///
/// The port is not part of the result.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_corpus::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM:8443/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}
