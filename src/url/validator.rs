use crate::url::domain::extract_domain;
use crate::url::normalize::normalize_url;
use crate::UrlResult;
use std::collections::HashSet;
use url::Url;

/// File extensions that never lead to crawlable HTML
pub const BLOCKED_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".svg", ".ico", ".zip", ".rar", ".7z", ".tar",
    ".gz", ".exe", ".msi", ".dmg", ".deb", ".rpm", ".doc", ".docx", ".xls", ".xlsx", ".ppt",
    ".pptx", ".mp3", ".mp4", ".avi", ".mov", ".wmv", ".flv", ".css", ".js", ".json", ".xml",
    ".rss",
];

/// Path fragments marking account, admin or API endpoints
const BLOCKED_PATH_SEGMENTS: &[&str] = &["/admin/", "/login", "/logout", "/register", "/api/"];

/// Server-side script suffixes
const BLOCKED_PATH_SUFFIXES: &[&str] = &[".php", ".asp", ".jsp"];

/// Decides which URLs the crawler may visit
///
/// An empty allowlist admits every domain.
#[derive(Debug, Clone, Default)]
pub struct UrlValidator {
    allowed_domains: HashSet<String>,
}

impl UrlValidator {
    /// Creates a validator without a domain allowlist
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a validator restricted to the given domains
    ///
    /// Domains are compared in the `host[:port]` form produced by
    /// [`extract_domain`], so entries are lowercased here.
    pub fn with_allowed_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_domains: domains
                .into_iter()
                .map(|d| d.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Returns true if the URL passes scheme, domain, extension and path checks
    ///
    /// # Examples
    ///
    /// ```
    /// use webcrawler::url::UrlValidator;
    ///
    /// let validator = UrlValidator::with_allowed_domains(["example.com"]);
    /// assert!(validator.is_valid("https://example.com/docs"));
    /// assert!(!validator.is_valid("https://example.com/report.pdf"));
    /// assert!(!validator.is_valid("https://other.com/docs"));
    /// ```
    pub fn is_valid(&self, url: &str) -> bool {
        let parsed = match Url::parse(url) {
            Ok(u) => u,
            Err(_) => return false,
        };

        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }

        let domain = match extract_domain(&parsed) {
            Some(d) => d,
            None => return false,
        };

        if !self.allowed_domains.is_empty() && !self.allowed_domains.contains(&domain) {
            return false;
        }

        let lowered = parsed.path().to_lowercase();
        if BLOCKED_EXTENSIONS.iter().any(|ext| lowered.ends_with(ext)) {
            return false;
        }

        // Path patterns are case-sensitive
        !is_blocked_path(parsed.path())
    }

    /// Resolves and canonicalizes a URL found on `base`
    pub fn normalize(&self, url: &str, base: &str) -> UrlResult<String> {
        normalize_url(url, base)
    }
}

fn is_blocked_path(path: &str) -> bool {
    BLOCKED_PATH_SEGMENTS.iter().any(|seg| path.contains(seg))
        || BLOCKED_PATH_SUFFIXES.iter().any(|suf| path.ends_with(suf))
}
