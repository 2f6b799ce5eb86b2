use crate::resilience::DelayStrategy;
use serde::{Deserialize, Serialize};

/// Default user agent sent when rotation is disabled
pub const DEFAULT_USER_AGENT: &str = "WebCrawler/0.1 (Anti-Detection)";

/// Endpoint used to probe proxy liveness
pub const DEFAULT_PROBE_URL: &str = "http://httpbin.org/ip";

/// Main configuration structure for a crawl run
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlConfig {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub anti_detection: AntiDetectionConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub request: RequestConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Traversal budget and politeness settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// URL the crawl starts from (depth 0)
    pub seed_url: String,

    /// Maximum link depth from the seed (0 = seed only)
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of pages to fetch
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Base delay between requests in seconds
    #[serde(default = "default_delay")]
    pub delay: f64,

    /// Only follow links on the seed's domain
    #[serde(default = "default_true")]
    pub same_domain_only: bool,

    /// Honor robots.txt disallow rules
    #[serde(default = "default_true")]
    pub respect_robots_txt: bool,

    /// User agent used when rotation is disabled
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Seed for the random number generators (random when unset)
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            seed_url: String::new(),
            max_depth: default_max_depth(),
            max_pages: default_max_pages(),
            delay: default_delay(),
            same_domain_only: true,
            respect_robots_txt: true,
            user_agent: default_user_agent(),
            seed: None,
        }
    }
}

/// Anti-detection feature switches
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AntiDetectionConfig {
    /// Preset: enables UA rotation, header randomization and adaptive delays
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub user_agent_rotation: bool,

    /// Pick user agents randomly instead of cycling through them
    #[serde(default = "default_true")]
    pub random_user_agent_rotation: bool,

    /// Replaces the built-in user agent pool when non-empty
    #[serde(default)]
    pub custom_user_agents: Vec<String>,

    #[serde(default)]
    pub header_randomization: bool,

    #[serde(default)]
    pub delay_strategy: DelayStrategy,

    /// Lower bound on configured delays (seconds)
    #[serde(default = "default_min_delay")]
    pub min_delay: f64,

    /// Upper bound on configured delays (seconds)
    #[serde(default = "default_max_delay")]
    pub max_delay: f64,

    /// Number of requests before the session is replaced
    #[serde(default = "default_session_rotation_interval")]
    pub session_rotation_interval: u32,
}

impl Default for AntiDetectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            user_agent_rotation: false,
            random_user_agent_rotation: true,
            custom_user_agents: Vec::new(),
            header_randomization: false,
            delay_strategy: DelayStrategy::default(),
            min_delay: default_min_delay(),
            max_delay: default_max_delay(),
            session_rotation_interval: default_session_rotation_interval(),
        }
    }
}

/// Egress proxy pool configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProxyConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Proxy addresses, each used for both http and https
    #[serde(default)]
    pub proxies: Vec<String>,

    /// Probe every proxy before the crawl starts
    #[serde(default = "default_true")]
    pub validate: bool,

    #[serde(default = "default_probe_url")]
    pub probe_url: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            proxies: Vec::new(),
            validate: true,
            probe_url: default_probe_url(),
        }
    }
}

/// Per-request transport settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RequestConfig {
    /// Status-level retries performed by the transport
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: f64,

    #[serde(default = "default_true")]
    pub verify_ssl: bool,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            timeout: default_timeout(),
            verify_ssl: true,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path of the JSON results file
    #[serde(default = "default_results_path")]
    pub results_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_path: default_results_path(),
        }
    }
}

impl CrawlConfig {
    /// Creates a configuration with defaults for everything but the seed
    pub fn new(seed_url: impl Into<String>) -> Self {
        Self {
            crawler: CrawlerConfig {
                seed_url: seed_url.into(),
                ..CrawlerConfig::default()
            },
            ..Self::default()
        }
    }

    /// Resolves the anti-detection preset into concrete feature switches
    ///
    /// With the preset on, user agent rotation and header randomization are
    /// forced on and a `fixed` delay strategy is upgraded to `adaptive`.
    /// Proxy rotation only stays enabled when proxies were supplied.
    pub fn effective(&self) -> Self {
        let mut config = self.clone();
        if config.anti_detection.enabled {
            config.anti_detection.user_agent_rotation = true;
            config.anti_detection.header_randomization = true;
            if config.anti_detection.delay_strategy == DelayStrategy::Fixed {
                config.anti_detection.delay_strategy = DelayStrategy::Adaptive;
            }
        }
        config.proxy.enabled = config.proxy.enabled && !config.proxy.proxies.is_empty();
        config
    }
}

fn default_max_depth() -> u32 {
    3
}

fn default_max_pages() -> u32 {
    100
}

fn default_delay() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_min_delay() -> f64 {
    1.0
}

fn default_max_delay() -> f64 {
    5.0
}

fn default_session_rotation_interval() -> u32 {
    50
}

fn default_probe_url() -> String {
    DEFAULT_PROBE_URL.to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout() -> f64 {
    30.0
}

fn default_results_path() -> String {
    "crawl_results.json".to_string()
}
