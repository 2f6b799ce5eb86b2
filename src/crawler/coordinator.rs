//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties the components together:
//! - Dequeuing frontier entries breadth-first and enforcing the budgets
//! - Running the per-page fetch and recording its result
//! - Following discovered links one level deeper
//! - Aborting after repeated failures and reacting to rate limiting
//! - Producing summaries and anti-detection statistics

use crate::config::{validate, CrawlConfig};
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::frontier::Frontier;
use crate::crawler::interrupt::Interrupt;
use crate::output::{
    AntiDetectionSnapshot, AntiDetectionStats, CrawlSummary, ResponseTimeStats, UserAgentStats,
};
use crate::resilience::{seconds_to_duration, DelayStrategy, Proxy, ProxyHealth};
use crate::state::{CrawlState, PageResult};
use crate::transport::{ReqwestTransport, Transport};
use crate::url::{domain_of, normalize_url, UrlValidator};
use crate::{CrawlerError, Result, UrlError};
use std::sync::Arc;
use std::time::Instant;

/// Consecutive page failures after which the crawl is abandoned
pub const MAX_CONSECUTIVE_FAILURES: u32 = 10;

/// Status code that triggers the delay escalation
const TOO_MANY_REQUESTS: u16 = 429;

/// Breadth-first crawler for a single run
///
/// All crawl state (frontier, visited set, sessions, robots cache, delay
/// state, proxy pool) is owned here and scoped to this instance.
pub struct Crawler {
    config: CrawlConfig,
    fetcher: PageFetcher,
    frontier: Frontier,
    results: Vec<PageResult>,
    state: CrawlState,
    interrupt: Interrupt,
    consecutive_failures: u32,
}

impl Crawler {
    /// Creates a crawler using the default reqwest transport
    ///
    /// # Arguments
    ///
    /// * `config` - The crawl configuration; validated here
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to crawl, in the `Idle` state
    /// * `Err(CrawlerError)` - The configuration or seed URL is invalid
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let transport = ReqwestTransport::new()
            .with_connect_timeout(seconds_to_duration(config.request.timeout));
        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates a crawler that fetches through the given transport
    pub fn with_transport(config: CrawlConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        validate(&config)?;
        let config = config.effective();

        let seed = normalize_url(&config.crawler.seed_url, &config.crawler.seed_url)?;
        let validator = if config.crawler.same_domain_only {
            let domain =
                domain_of(&seed).ok_or_else(|| UrlError::MissingHost(seed.clone()))?;
            UrlValidator::with_allowed_domains([domain])
        } else {
            UrlValidator::new()
        };

        let interrupt = Interrupt::new();
        let fetcher = PageFetcher::new(&config, transport, validator, interrupt.clone());

        Ok(Self {
            frontier: Frontier::with_seed(seed),
            config,
            fetcher,
            results: Vec::new(),
            state: CrawlState::Idle,
            interrupt,
            consecutive_failures: 0,
        })
    }

    /// Runs the crawl to completion
    ///
    /// Stops when the frontier is empty, `max_pages` results exist, the
    /// interrupt fires, or [`MAX_CONSECUTIVE_FAILURES`] pages fail in a
    /// row. Early stops are not errors: the accumulated results are
    /// returned either way.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<PageResult>)` - One result per processed URL, in crawl order
    /// * `Err(CrawlerError)` - The crawler was already used
    ///
    /// # Example
    ///
    /// ```no_run
    /// use webcrawler::{CrawlConfig, Crawler};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut crawler = Crawler::new(CrawlConfig::new("https://example.com/"))?;
    /// let results = crawler.crawl().await?;
    /// println!("Crawled {} pages", results.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn crawl(&mut self) -> Result<Vec<PageResult>> {
        self.transition(CrawlState::Running)?;

        let started = Instant::now();
        self.log_start();

        if self.config.proxy.enabled && self.config.proxy.validate {
            let usable = self.fetcher.validate_proxies().await;
            if usable == 0 {
                tracing::warn!("No proxy passed validation, continuing without proxies");
            }
        }

        let outcome = self.run_loop(started).await;

        self.fetcher.close_all_sessions();
        if let Some(state) = outcome {
            self.transition(state)?;
        }
        self.transition(CrawlState::Done)?;

        let summary = self.summary();
        tracing::info!(
            "Crawl completed: {} pages ({} successful, {} failed) in {:.1}s",
            summary.total_pages,
            summary.successful_pages,
            summary.failed_pages,
            started.elapsed().as_secs_f64()
        );

        Ok(self.results.clone())
    }

    /// Processes frontier entries until a stop condition holds
    ///
    /// Returns the early-stop state, if the loop stopped early.
    async fn run_loop(&mut self, started: Instant) -> Option<CrawlState> {
        let max_pages = self.config.crawler.max_pages as usize;
        let max_depth = self.config.crawler.max_depth;

        loop {
            if self.interrupt.is_triggered() {
                tracing::warn!("Crawl interrupted, returning {} results", self.results.len());
                return Some(CrawlState::Interrupted);
            }
            if self.results.len() >= max_pages {
                tracing::info!("Reached page limit of {}", max_pages);
                return None;
            }
            let Some(entry) = self.frontier.pop() else {
                tracing::info!("Frontier is empty, crawl complete");
                return None;
            };

            if self.frontier.is_visited(&entry.url) || entry.depth > max_depth {
                continue;
            }
            self.frontier.mark_visited(&entry.url);

            let result = self.fetcher.fetch_page(&entry.url, entry.depth).await;

            if result.status_code == Some(TOO_MANY_REQUESTS) {
                self.fetcher.escalate_rate_limit();
            }

            let abort = if result.is_success() {
                self.consecutive_failures = 0;
                if entry.depth < max_depth {
                    for link in &result.links {
                        if !self.frontier.is_visited(link) {
                            self.frontier.push(link.as_str(), entry.depth + 1);
                        }
                    }
                }
                false
            } else {
                self.consecutive_failures += 1;
                self.consecutive_failures >= MAX_CONSECUTIVE_FAILURES
            };

            self.results.push(result);

            if abort {
                tracing::error!(
                    "Aborting crawl after {} consecutive failures",
                    self.consecutive_failures
                );
                return Some(CrawlState::Draining);
            }

            if self.results.len() % 10 == 0 {
                let rate = self.results.len() as f64 / started.elapsed().as_secs_f64().max(1e-3);
                tracing::info!(
                    "Progress: {} pages crawled, {} in frontier, {:.2} pages/sec",
                    self.results.len(),
                    self.frontier.len(),
                    rate
                );
            }
        }
    }

    fn transition(&mut self, next: CrawlState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(CrawlerError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("Crawl state: {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    fn log_start(&self) {
        let crawler = &self.config.crawler;
        let anti = &self.config.anti_detection;
        tracing::info!(
            "Starting crawl of {} (max depth {}, max pages {})",
            crawler.seed_url,
            crawler.max_depth,
            crawler.max_pages
        );
        tracing::info!(
            "Anti-detection: user agent rotation {}, proxy rotation {}, header randomization {}, delay strategy {}",
            anti.user_agent_rotation,
            self.config.proxy.enabled,
            anti.header_randomization,
            anti.delay_strategy
        );
        if !crawler.respect_robots_txt {
            tracing::warn!("robots.txt rules will be ignored");
        }
    }

    /// Returns a handle that stops the crawl when triggered
    pub fn interrupt(&self) -> Interrupt {
        self.interrupt.clone()
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    /// Resolved configuration in effect for this crawl
    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Results accumulated so far, in crawl order
    pub fn results(&self) -> &[PageResult] {
        &self.results
    }

    pub fn successful_pages(&self) -> Vec<&PageResult> {
        self.results.iter().filter(|r| r.is_success()).collect()
    }

    pub fn failed_pages(&self) -> Vec<&PageResult> {
        self.results.iter().filter(|r| r.is_failure()).collect()
    }

    pub fn summary(&self) -> CrawlSummary {
        CrawlSummary::from_results(&self.results, self.frontier.visited_count())
    }

    /// Reports what the anti-detection machinery did during the crawl
    pub fn anti_detection_stats(&self) -> AntiDetectionStats {
        let anti = &self.config.anti_detection;
        let counters = self.fetcher.counters();

        AntiDetectionStats {
            total_requests: counters.requests,
            session_rotations: counters.session_rotations,
            config: AntiDetectionSnapshot {
                user_agent_rotation: anti.user_agent_rotation,
                proxy_rotation: self.config.proxy.enabled,
                header_randomization: anti.header_randomization,
                delay_strategy: self.fetcher.delay().strategy().to_string(),
                min_delay: anti.min_delay,
                max_delay: anti.max_delay,
                session_rotation_interval: anti.session_rotation_interval,
            },
            user_agents: self.fetcher.user_agent_rotator().map(|r| UserAgentStats {
                total_available: r.len(),
                rotation_mode: r.mode().as_str().to_string(),
            }),
            proxies: self.proxy_health(),
            response_times: ResponseTimeStats::from_results(&self.results),
        }
    }

    /// Health of the proxy pool, or `None` when proxy rotation is off
    pub fn proxy_health(&self) -> Option<ProxyHealth> {
        self.fetcher.proxy_health()
    }

    /// Adds a proxy to the pool, optionally probing it first
    ///
    /// Returns false when proxy rotation is disabled, the proxy is already
    /// pooled, or the probe failed.
    pub async fn add_proxy(&mut self, proxy: Proxy, validate: bool) -> bool {
        self.fetcher.add_proxy(proxy, validate).await
    }

    /// Switches the delay strategy, optionally replacing the base delay
    pub fn update_delay_strategy(&mut self, strategy: DelayStrategy, base_delay: Option<f64>) {
        self.fetcher.update_delay_strategy(strategy, base_delay);
        self.config.anti_detection.delay_strategy = strategy;
        if let Some(delay) = base_delay {
            self.config.crawler.delay = delay;
        }
    }

    /// Current base delay in seconds, including any rate-limit escalation
    pub fn base_delay(&self) -> f64 {
        self.fetcher.delay().base_delay()
    }
}
