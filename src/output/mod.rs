//! Output module for crawl results and reports
//!
//! This module handles:
//! - Persisting the result log as JSON
//! - Deriving summaries and anti-detection statistics
//! - Printing reports to stdout

mod json;
pub mod stats;

pub use json::{load_results, save_results};
pub use stats::{
    print_anti_detection_stats, print_proxy_health, print_summary, AntiDetectionSnapshot,
    AntiDetectionStats, CrawlSummary, ResponseTimeStats, UserAgentStats,
};
