/// Checks if a host belongs to the configured domain
///
/// Two forms of pattern are supported:
/// 1. Bare host: "example.com" matches only "example.com". Subdomains are
///    foreign unless listed explicitly.
/// 2. Wildcard: "*.example.com" matches "example.com" and every subdomain.
///
/// Both sides are expected to be lowercase already.
///
/// # Examples
///
/// ```
/// use site_corpus::url::matches_domain;
///
/// assert!(matches_domain("example.com", "example.com"));
/// assert!(!matches_domain("example.com", "www.example.com"));
///
/// assert!(matches_domain("*.example.com", "example.com"));
/// assert!(matches_domain("*.example.com", "api.v2.example.com"));
/// assert!(!matches_domain("*.example.com", "example.org"));
/// ```
pub fn matches_domain(pattern: &str, host: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        host == base || host.ends_with(&format!(".{}", base))
    } else {
        host == pattern
    }
}
