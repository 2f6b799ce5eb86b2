//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: Lifecycle of a crawl run (idle, running, draining, interrupted, done)
//! - `PageResult`: The record produced for every fetched URL

mod crawl_state;
mod page_result;

// Re-export main types
pub use crawl_state::CrawlState;
pub use page_result::PageResult;
