//! Crawl statistics derived from the result log
//!
//! Everything here is computed from the in-memory [`PageResult`] list and the
//! crawler's counters, so it can be produced for partial runs too.

use crate::resilience::ProxyHealth;
use crate::state::PageResult;
use crate::url::domain_of;
use serde::Serialize;
use std::collections::BTreeSet;

/// Summary of a finished (or interrupted) crawl
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrawlSummary {
    /// Number of results in the log
    pub total_pages: usize,

    pub successful_pages: usize,

    pub failed_pages: usize,

    /// Links extracted across all successful pages (with repeats)
    pub total_links_found: usize,

    pub unique_urls_visited: usize,

    /// Distinct domains among successful pages, sorted
    pub domains_found: Vec<String>,

    /// Deepest depth at which a page was fetched successfully
    pub max_depth_reached: u32,
}

impl CrawlSummary {
    /// Builds a summary from the result log
    ///
    /// # Arguments
    ///
    /// * `results` - Results in crawl order
    /// * `unique_urls_visited` - Size of the crawler's visited set
    pub fn from_results(results: &[PageResult], unique_urls_visited: usize) -> Self {
        let successful: Vec<&PageResult> = results.iter().filter(|r| r.is_success()).collect();

        let domains_found: BTreeSet<String> =
            successful.iter().filter_map(|r| domain_of(&r.url)).collect();

        Self {
            total_pages: results.len(),
            successful_pages: successful.len(),
            failed_pages: results.len() - successful.len(),
            total_links_found: successful.iter().map(|r| r.links.len()).sum(),
            unique_urls_visited,
            domains_found: domains_found.into_iter().collect(),
            max_depth_reached: successful.iter().map(|r| r.depth).max().unwrap_or(0),
        }
    }

    /// Percentage of pages that succeeded (0 when nothing was crawled)
    pub fn success_rate(&self) -> f64 {
        if self.total_pages == 0 {
            0.0
        } else {
            self.successful_pages as f64 / self.total_pages as f64 * 100.0
        }
    }
}

/// Snapshot of the anti-detection switches in effect
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AntiDetectionSnapshot {
    pub user_agent_rotation: bool,
    pub proxy_rotation: bool,
    pub header_randomization: bool,
    pub delay_strategy: String,
    /// Configured delay bounds in seconds; reported, not applied to pacing
    pub min_delay: f64,
    pub max_delay: f64,
    pub session_rotation_interval: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserAgentStats {
    pub total_available: usize,
    pub rotation_mode: String,
}

/// Response time figures in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResponseTimeStats {
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub total_samples: usize,
}

impl ResponseTimeStats {
    /// Computes figures over every result that recorded a response time
    ///
    /// Returns `None` when no result has one.
    pub fn from_results(results: &[PageResult]) -> Option<Self> {
        let samples: Vec<f64> = results
            .iter()
            .filter_map(|r| r.response_time)
            .map(|d| d.as_secs_f64())
            .collect();

        if samples.is_empty() {
            return None;
        }

        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let average = samples.iter().sum::<f64>() / samples.len() as f64;

        Some(Self {
            average,
            min,
            max,
            total_samples: samples.len(),
        })
    }
}

/// Anti-detection report for a crawl
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AntiDetectionStats {
    /// Pages processed, including robots-blocked ones
    pub total_requests: u64,
    pub session_rotations: u64,
    pub config: AntiDetectionSnapshot,
    pub user_agents: Option<UserAgentStats>,
    pub proxies: Option<ProxyHealth>,
    pub response_times: Option<ResponseTimeStats>,
}

/// Prints the crawl summary to stdout
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");
    println!("  Total pages: {}", summary.total_pages);
    println!("  Successful: {}", summary.successful_pages);
    println!("  Failed: {}", summary.failed_pages);
    println!("  Success rate: {:.1}%", summary.success_rate());
    println!("  Links found: {}", summary.total_links_found);
    println!("  Unique URLs visited: {}", summary.unique_urls_visited);
    println!("  Max depth reached: {}", summary.max_depth_reached);

    if !summary.domains_found.is_empty() {
        println!("\nDomains ({}):", summary.domains_found.len());
        for domain in &summary.domains_found {
            println!("  - {}", domain);
        }
    }
    println!();
}

/// Prints the anti-detection report to stdout
pub fn print_anti_detection_stats(stats: &AntiDetectionStats) {
    println!("=== Anti-Detection Statistics ===\n");
    println!("  Total requests: {}", stats.total_requests);
    println!("  Session rotations: {}", stats.session_rotations);
    println!();

    let config = &stats.config;
    println!("Configuration:");
    println!("  User agent rotation: {}", config.user_agent_rotation);
    println!("  Proxy rotation: {}", config.proxy_rotation);
    println!("  Header randomization: {}", config.header_randomization);
    println!("  Delay strategy: {}", config.delay_strategy);
    println!(
        "  Delay bounds: {:.2}s - {:.2}s",
        config.min_delay, config.max_delay
    );
    println!(
        "  Session rotation interval: {}",
        config.session_rotation_interval
    );
    println!();

    if let Some(ua) = &stats.user_agents {
        println!(
            "User agents: {} available ({} rotation)",
            ua.total_available, ua.rotation_mode
        );
    }

    if let Some(proxies) = &stats.proxies {
        print_proxy_health(proxies);
    }

    if let Some(times) = &stats.response_times {
        println!("Response times ({} samples):", times.total_samples);
        println!("  Average: {:.3}s", times.average);
        println!("  Min: {:.3}s", times.min);
        println!("  Max: {:.3}s", times.max);
    }
    println!();
}

pub fn print_proxy_health(health: &ProxyHealth) {
    println!(
        "Proxies: {} total, {} healthy, {} failed ({:.1}% healthy)",
        health.total, health.healthy, health.failed, health.health_percentage
    );
}
