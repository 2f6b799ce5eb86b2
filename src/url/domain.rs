use url::Url;

/// Extracts the domain (network location) from a URL
///
/// The host is lowercased and an explicit non-default port is kept, so that
/// `http://localhost:8080/` and `http://localhost:9090/` count as different
/// domains for allowlisting and robots.txt caching.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use webcrawler::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(extract_domain(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Parses a URL string and extracts its domain
pub fn domain_of(url: &str) -> Option<String> {
    Url::parse(url).ok().as_ref().and_then(extract_domain)
}
