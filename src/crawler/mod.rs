//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The breadth-first frontier and visited set
//! - Per-page fetching with robots.txt, session, user agent and proxy handling
//! - HTML parsing and link extraction
//! - Overall crawl coordination and interruption

mod coordinator;
mod fetcher;
mod frontier;
mod interrupt;
mod parser;

pub use coordinator::{Crawler, MAX_CONSECUTIVE_FAILURES};
pub use fetcher::{FetchCounters, PageFetcher, PROXY_ATTEMPTS};
pub use frontier::{Frontier, FrontierEntry};
pub use interrupt::Interrupt;
pub use parser::{parse_html, ParsedPage};

use crate::config::CrawlConfig;
use crate::state::PageResult;
use crate::Result;

/// Runs a complete crawl with the default transport
///
/// Convenience wrapper around [`Crawler::new`] and [`Crawler::crawl`] for
/// callers that need neither interruption nor statistics.
///
/// # Arguments
///
/// * `config` - The crawl configuration
///
/// # Returns
///
/// * `Ok(Vec<PageResult>)` - Results in crawl order
/// * `Err(CrawlerError)` - The configuration was invalid
pub async fn crawl(config: CrawlConfig) -> Result<Vec<PageResult>> {
    Crawler::new(config)?.crawl().await
}
