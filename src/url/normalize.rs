use crate::url::domain::extract_domain;
use crate::UrlError;
use url::{ParseError, Url};

/// Resolves a possibly-relative URL against a base and canonicalizes it
///
/// # Normalization Steps
///
/// 1. Resolve `url` against `base` (absolute URLs are taken as-is)
/// 2. Require both a scheme and a host
/// 3. Rebuild as `scheme://host[:port]/path[?query]`, dropping the fragment
///    and any userinfo
/// 4. Remove the trailing slash from the path unless the path is exactly `/`
///
/// # Arguments
///
/// * `url` - The URL or reference to normalize
/// * `base` - The URL of the page the reference was found on
///
/// # Returns
///
/// * `Ok(String)` - Normalized absolute URL
/// * `Err(UrlError)` - Resolution did not produce a URL with scheme and host
///
/// # Examples
///
/// ```
/// use webcrawler::url::normalize_url;
///
/// let url = normalize_url("../about/#team", "https://example.com/blog/post").unwrap();
/// assert_eq!(url, "https://example.com/about");
/// ```
pub fn normalize_url(url: &str, base: &str) -> Result<String, UrlError> {
    let url = url.trim();

    let resolved = match Url::parse(url) {
        Ok(absolute) => absolute,
        Err(ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(base)
                .map_err(|e| UrlError::Parse(format!("invalid base '{}': {}", base, e)))?;
            base.join(url)
                .map_err(|e| UrlError::Parse(format!("cannot resolve '{}': {}", url, e)))?
        }
        Err(e) => return Err(UrlError::Parse(format!("'{}': {}", url, e))),
    };

    if resolved.cannot_be_a_base() {
        return Err(UrlError::MissingHost(resolved.to_string()));
    }

    let authority =
        extract_domain(&resolved).ok_or_else(|| UrlError::MissingHost(resolved.to_string()))?;

    let path = resolved.path();
    let path = if path.len() > 1 && path.ends_with('/') {
        &path[..path.len() - 1]
    } else {
        path
    };

    let mut normalized = format!("{}://{}{}", resolved.scheme(), authority, path);

    // Remove empty query string (trailing ?)
    if let Some(query) = resolved.query().filter(|q| !q.is_empty()) {
        normalized.push('?');
        normalized.push_str(query);
    }

    Ok(normalized)
}
