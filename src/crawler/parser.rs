//! HTML parser for extracting links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Links to follow (from `<a href>` tags)
//! - Page title
//! - Meta description

use crate::url::UrlValidator;
use scraper::{Html, Selector};
use std::collections::HashSet;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    /// Trimmed text of the first `<title>`, or empty
    pub title: String,

    /// Trimmed `content` of `<meta name="description">`, or empty
    pub meta_description: String,

    /// Normalized, validated links in first-seen order without duplicates
    pub links: Vec<String>,
}

/// Parses HTML content and extracts links and metadata
///
/// # Link Extraction Rules
///
/// - Only `<a href="...">` is considered
/// - Empty hrefs and fragment-only hrefs (`#...`) are skipped
/// - Each href is normalized against `base_url`; hrefs that fail to
///   normalize or that the validator rejects are dropped
/// - Duplicates are removed, keeping the first occurrence
///
/// Parsing never fails: malformed markup yields whatever could be recovered.
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The URL of the page, for resolving relative links
/// * `validator` - Decides which links are kept
///
/// # Example
///
/// ```
/// use webcrawler::crawler::parse_html;
/// use webcrawler::url::UrlValidator;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let parsed = parse_html(html, "https://example.com/", &UrlValidator::new());
/// assert_eq!(parsed.title, "Test");
/// assert_eq!(parsed.links, vec!["https://example.com/page"]);
/// ```
pub fn parse_html(html: &str, base_url: &str, validator: &UrlValidator) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        meta_description: extract_meta_description(&document),
        links: extract_links(&document, base_url, validator),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> String {
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn extract_meta_description(document: &Html) -> String {
    let Ok(selector) = Selector::parse("meta[name]") else {
        return String::new();
    };

    document
        .select(&selector)
        .find(|element| {
            element
                .value()
                .attr("name")
                .is_some_and(|name| name.eq_ignore_ascii_case("description"))
        })
        .and_then(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .unwrap_or_default()
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &str, validator: &UrlValidator) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();

        if href.is_empty() || href.starts_with('#') {
            continue;
        }

        let normalized = match validator.normalize(href, base_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::trace!("Skipping link '{}': {}", href, e);
                continue;
            }
        };

        if validator.is_valid(&normalized) && seen.insert(normalized.clone()) {
            links.push(normalized);
        }
    }

    links
}
