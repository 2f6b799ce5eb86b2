//! WebCrawler: a polite, resilient recursive site crawler
//!
//! Starting from a seed URL this crate performs a breadth-first traversal of
//! hyperlinks within a depth and page budget, pacing requests and rotating
//! user agents, proxies and sessions so that target servers are neither
//! overwhelmed nor able to trivially block the crawler.

pub mod config;
pub mod crawler;
pub mod output;
pub mod resilience;
pub mod robots;
pub mod state;
pub mod transport;
pub mod url;

use thiserror::Error;

/// Main error type for crawl operations
///
/// Per-page failures never surface here; they are recorded on the page's
/// [`PageResult`]. Only configuration problems and failures outside the
/// per-page boundary reach the caller.
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlState,
        to: state::CrawlState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown delay strategy '{0}' (expected fixed, random, exponential or adaptive)")]
    UnknownStrategy(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::CrawlConfig;
pub use crawler::{Crawler, Interrupt};
pub use state::{CrawlState, PageResult};
pub use url::{extract_domain, UrlValidator};
