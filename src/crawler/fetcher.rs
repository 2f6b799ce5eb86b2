//! Per-page fetch operation
//!
//! [`PageFetcher`] turns one URL into one [`PageResult`]. It handles:
//! - robots.txt gating
//! - session rotation and request identity (user agent, headers)
//! - proxy selection and failover
//! - error classification into page-level error strings
//! - pacing via the delay engine
//!
//! Fetching never returns an error: every failure is recorded on the result.

use crate::config::CrawlConfig;
use crate::crawler::interrupt::Interrupt;
use crate::crawler::parser::parse_html;
use crate::resilience::{
    generate_random_headers, probe, seconds_to_duration, session_id, DelayManager, DelayStrategy,
    Proxy, ProxyHealth, ProxyRotator, RotationMode, SessionManager, UserAgentRotator,
};
use crate::robots::RobotsCache;
use crate::state::PageResult;
use crate::transport::{
    FetchRequest, RetryPolicy, Transport, TransportError, TransportErrorKind, TransportResponse,
};
use crate::url::UrlValidator;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;

/// Attempts per page when proxying (first try plus two failovers)
pub const PROXY_ATTEMPTS: u32 = 3;

/// Maximum length of transport error detail kept in a page error
const ERROR_DETAIL_LIMIT: usize = 100;

/// Settings copied out of the configuration at construction
#[derive(Debug, Clone)]
struct FetchSettings {
    user_agent: String,
    timeout: Duration,
    verify_ssl: bool,
    respect_robots: bool,
    header_randomization: bool,
    session_rotation_interval: u64,
    probe_url: String,
}

/// Counters for the anti-detection report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchCounters {
    /// Pages processed, including robots-blocked ones
    pub requests: u64,
    pub session_rotations: u64,
}

/// Fetches pages on behalf of the crawl loop
pub struct PageFetcher {
    settings: FetchSettings,
    transport: Arc<dyn Transport>,
    validator: UrlValidator,
    delay: DelayManager,
    user_agents: Option<UserAgentRotator>,
    proxies: Option<ProxyRotator>,
    sessions: SessionManager,
    robots: RobotsCache,
    header_rng: StdRng,
    session_index: u64,
    counters: FetchCounters,
    interrupt: Interrupt,
}

/// Outcome of the transport phase of a fetch
enum Attempt {
    Response(TransportResponse),
    Failed(String),
}

impl PageFetcher {
    /// Builds a fetcher from an already resolved configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Effective configuration (see [`CrawlConfig::effective`])
    /// * `transport` - Transport used for pages, robots.txt and proxy probes
    /// * `validator` - Filters links discovered during extraction
    /// * `interrupt` - Cuts pending delays short when triggered
    pub fn new(
        config: &CrawlConfig,
        transport: Arc<dyn Transport>,
        validator: UrlValidator,
        interrupt: Interrupt,
    ) -> Self {
        let seed = config.crawler.seed;
        let anti = &config.anti_detection;

        let user_agents = anti.user_agent_rotation.then(|| {
            let mode = if anti.random_user_agent_rotation {
                RotationMode::Random
            } else {
                RotationMode::Cyclic
            };
            UserAgentRotator::new(anti.custom_user_agents.clone(), mode, seed)
        });

        let proxies = config.proxy.enabled.then(|| {
            ProxyRotator::new(
                config
                    .proxy
                    .proxies
                    .iter()
                    .map(|p| Proxy::from_address(p.as_str()))
                    .collect(),
            )
        });

        let header_rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };

        let settings = FetchSettings {
            user_agent: config.crawler.user_agent.clone(),
            timeout: seconds_to_duration(config.request.timeout),
            verify_ssl: config.request.verify_ssl,
            respect_robots: config.crawler.respect_robots_txt,
            header_randomization: anti.header_randomization,
            session_rotation_interval: u64::from(anti.session_rotation_interval.max(1)),
            probe_url: config.proxy.probe_url.clone(),
        };

        Self {
            delay: DelayManager::new(anti.delay_strategy, config.crawler.delay, seed),
            sessions: SessionManager::new(
                RetryPolicy::new(config.request.max_retries),
                transport.clone(),
            ),
            robots: RobotsCache::new(
                config.crawler.user_agent.clone(),
                config.request.verify_ssl,
                transport.clone(),
            ),
            settings,
            transport,
            validator,
            user_agents,
            proxies,
            header_rng,
            session_index: 0,
            counters: FetchCounters::default(),
            interrupt,
        }
    }

    /// Fetches one page and paces before returning
    pub async fn fetch_page(&mut self, url: &str, depth: u32) -> PageResult {
        tracing::info!("Crawling: {} (depth {})", url, depth);

        let mut result = PageResult::new(url, depth);
        self.fetch_into(&mut result).await;

        self.counters.requests += 1;
        self.pace(result.response_time).await;
        result
    }

    async fn fetch_into(&mut self, result: &mut PageResult) {
        if self.settings.respect_robots && !self.robots.can_fetch(&result.url).await {
            tracing::info!("Blocked by robots.txt: {}", result.url);
            result.error = Some("blocked by robots.txt".to_string());
            return;
        }

        self.rotate_session_if_due();
        let sid = session_id(self.session_index);
        self.prepare_session(&sid);

        let mut proxy = self.proxies.as_mut().and_then(ProxyRotator::get_next);

        let session = self.sessions.get_session(&sid);
        session.record_request();
        let headers = session.headers().clone();
        let retry = session.retry_policy().clone();
        result.user_agent_used = session.user_agent().unwrap_or_default().to_string();

        let attempts = if proxy.is_some() { PROXY_ATTEMPTS } else { 1 };
        let mut outcome = Attempt::Failed("failed to get response after retries".to_string());

        for _ in 0..attempts {
            result.proxy_used = proxy.as_ref().map(Proxy::to_string);
            let request = FetchRequest {
                url: &result.url,
                proxy: proxy.as_ref(),
                timeout: self.settings.timeout,
                verify_ssl: self.settings.verify_ssl,
                headers: &headers,
                session_id: &sid,
                retry: &retry,
            };

            match self.transport.get(&request).await {
                Ok(response) => {
                    outcome = Attempt::Response(response);
                    break;
                }
                Err(e) if e.is_proxy_related() && proxy.is_some() => {
                    let Some(failed) = proxy.take() else { break };
                    tracing::warn!("Proxy {} failed for {}: {}", failed, result.url, e.message);
                    result.retry_count += 1;

                    let Some(rotator) = self.proxies.as_mut() else { break };
                    rotator.mark_failed(&failed);
                    proxy = rotator.get_next();
                    if proxy.is_none() {
                        outcome = Attempt::Failed("all proxies failed".to_string());
                        break;
                    }
                }
                Err(e) => {
                    outcome = Attempt::Failed(describe_error(&e));
                    tracing::warn!("Request for {} failed: {}", result.url, e);
                    break;
                }
            }
        }

        match outcome {
            Attempt::Response(response) => self.record_response(result, response),
            Attempt::Failed(error) => result.error = Some(error),
        }
    }

    /// Records the response and runs extraction for HTML pages
    fn record_response(&self, result: &mut PageResult, response: TransportResponse) {
        let content_type = response.content_type().to_string();

        result.status_code = Some(response.status);
        result.content_length = Some(response.body.len() as u64);
        result.response_time = Some(response.elapsed);
        result.retry_count += response.retries;

        if response.status == 200 {
            let lowered = content_type.to_lowercase();
            if lowered.contains("text/html") {
                let parsed = parse_html(&response.text(), &result.url, &self.validator);
                tracing::debug!("Extracted {} links from {}", parsed.links.len(), result.url);
                result.title = parsed.title;
                result.meta_description = parsed.meta_description;
                result.links = parsed.links;
            } else {
                result.error = Some(format!("non-HTML content: {}", lowered));
            }
        } else {
            result.error = Some(format!("HTTP {}", response.status));
        }

        result.content_type = Some(content_type);
    }

    /// Moves to a fresh session every `session_rotation_interval` requests
    fn rotate_session_if_due(&mut self) {
        let count = self.counters.requests;
        if count > 0 && count % self.settings.session_rotation_interval == 0 {
            self.sessions.close_session(&session_id(self.session_index));
            self.session_index += 1;
            self.counters.session_rotations += 1;
            tracing::debug!("Rotated to new session: {}", session_id(self.session_index));
        }
    }

    /// Applies the request identity to the session
    fn prepare_session(&mut self, sid: &str) {
        let user_agent = match self.user_agents.as_mut().and_then(UserAgentRotator::get_next) {
            Some(ua) => ua,
            None => self.settings.user_agent.clone(),
        };
        let random_headers = self
            .settings
            .header_randomization
            .then(|| generate_random_headers(&mut self.header_rng));

        let session = self.sessions.get_session(sid);
        session.set_user_agent(&user_agent);
        if let Some(headers) = random_headers {
            session.merge_headers(headers);
        }
    }

    /// Waits per the delay strategy unless interrupted
    async fn pace(&mut self, response_time: Option<Duration>) {
        let interrupt = self.interrupt.clone();
        tokio::select! {
            _ = self.delay.wait(response_time) => {}
            _ = interrupt.triggered() => {
                tracing::debug!("Delay cut short by interrupt");
            }
        }
    }

    /// Probes all configured proxies and drops unusable ones
    ///
    /// # Returns
    ///
    /// Number of proxies that remain usable
    pub async fn validate_proxies(&mut self) -> usize {
        let Some(rotator) = self.proxies.as_mut() else {
            return 0;
        };
        rotator
            .validate(
                self.transport.as_ref(),
                &self.settings.probe_url,
                self.settings.timeout,
            )
            .await;
        rotator.len()
    }

    /// Adds a proxy to the pool at runtime
    ///
    /// Returns false if proxy rotation is disabled, the proxy is already
    /// pooled, or validation was requested and the probe failed.
    pub async fn add_proxy(&mut self, proxy: Proxy, validate: bool) -> bool {
        if self.proxies.is_none() {
            tracing::warn!("Proxy rotation not enabled, cannot add proxy");
            return false;
        }

        if validate
            && !probe(
                self.transport.as_ref(),
                &proxy,
                &self.settings.probe_url,
                self.settings.timeout,
            )
            .await
        {
            tracing::warn!("Proxy {} failed validation, not added", proxy);
            return false;
        }

        let added = self
            .proxies
            .as_mut()
            .is_some_and(|rotator| rotator.add_proxy(proxy));
        if added {
            tracing::info!("Added new proxy to rotation pool");
        }
        added
    }

    /// Applies the one-way rate-limit escalation to the delay engine
    pub fn escalate_rate_limit(&mut self) {
        self.delay.escalate_rate_limit();
    }

    pub fn update_delay_strategy(&mut self, strategy: DelayStrategy, base_delay: Option<f64>) {
        self.delay.set_strategy(strategy, base_delay);
        tracing::info!("Updated delay strategy to: {}", strategy);
    }

    /// Closes every open session
    pub fn close_all_sessions(&mut self) {
        self.sessions.close_all();
    }

    pub fn proxy_health(&self) -> Option<ProxyHealth> {
        self.proxies.as_ref().map(ProxyRotator::health)
    }

    pub fn user_agent_rotator(&self) -> Option<&UserAgentRotator> {
        self.user_agents.as_ref()
    }

    pub fn delay(&self) -> &DelayManager {
        &self.delay
    }

    pub fn counters(&self) -> FetchCounters {
        self.counters
    }
}

/// Converts a transport failure into a page error string
fn describe_error(error: &TransportError) -> String {
    let detail = truncate(&error.message, ERROR_DETAIL_LIMIT);
    match error.kind {
        TransportErrorKind::Timeout => "request timeout".to_string(),
        TransportErrorKind::Connect | TransportErrorKind::Proxy => {
            format!("connection error: {}", detail)
        }
        TransportErrorKind::Request => format!("request error: {}", detail),
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
