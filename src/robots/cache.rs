//! Per-run robots.txt cache
//!
//! Each domain's robots.txt is fetched at most once per run. Fetch failures
//! and non-200 responses are cached as empty rules so they are not retried.

use crate::robots::RobotsRules;
use crate::transport::{FetchRequest, RetryPolicy, Transport};
use crate::url::extract_domain;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Timeout for robots.txt requests
pub const ROBOTS_TIMEOUT: Duration = Duration::from_secs(5);

const ROBOTS_SESSION: &str = "robots";

/// Caches parsed robots.txt rules by domain
pub struct RobotsCache {
    user_agent: String,
    verify_ssl: bool,
    transport: Arc<dyn Transport>,
    rules: HashMap<String, RobotsRules>,
}

impl RobotsCache {
    /// Creates an empty cache
    ///
    /// # Arguments
    ///
    /// * `user_agent` - Agent name matched against `User-agent` records and
    ///   sent with the robots.txt request
    /// * `verify_ssl` - Whether to verify TLS certificates
    /// * `transport` - Transport used for fetching
    pub fn new(user_agent: impl Into<String>, verify_ssl: bool, transport: Arc<dyn Transport>) -> Self {
        Self {
            user_agent: user_agent.into(),
            verify_ssl,
            transport,
            rules: HashMap::new(),
        }
    }

    /// Returns the rules for a domain, fetching robots.txt on first use
    pub async fn rules_for(&mut self, domain: &str) -> &RobotsRules {
        if !self.rules.contains_key(domain) {
            let rules = self.fetch(domain).await;
            self.rules.insert(domain.to_string(), rules);
        }
        // Inserted above when missing
        &self.rules[domain]
    }

    /// Checks whether robots.txt permits fetching the URL
    ///
    /// URLs that cannot be parsed are allowed; the validator rejects them
    /// elsewhere.
    pub async fn can_fetch(&mut self, url: &str) -> bool {
        let parsed = match Url::parse(url) {
            Ok(u) => u,
            Err(_) => return true,
        };
        let domain = match extract_domain(&parsed) {
            Some(d) => d,
            None => return true,
        };

        self.rules_for(&domain).await.can_crawl(parsed.path())
    }

    /// Cached rules for a domain without fetching
    pub fn cached(&self, domain: &str) -> Option<&RobotsRules> {
        self.rules.get(domain)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    async fn fetch(&self, domain: &str) -> RobotsRules {
        let url = format!("https://{}/robots.txt", domain);
        let mut headers = BTreeMap::new();
        headers.insert("User-Agent".to_string(), self.user_agent.clone());
        let retry = RetryPolicy::none();

        let request = FetchRequest {
            url: &url,
            proxy: None,
            timeout: ROBOTS_TIMEOUT,
            verify_ssl: self.verify_ssl,
            headers: &headers,
            session_id: ROBOTS_SESSION,
            retry: &retry,
        };

        match self.transport.get(&request).await {
            Ok(response) if response.status == 200 => {
                let rules = RobotsRules::parse(&response.text(), &self.user_agent);
                tracing::debug!(
                    "Loaded robots.txt for {} ({} disallow rules)",
                    domain,
                    rules.disallowed().count()
                );
                rules
            }
            Ok(response) => {
                tracing::debug!("No robots.txt for {} (HTTP {})", domain, response.status);
                RobotsRules::allow_all()
            }
            Err(e) => {
                tracing::debug!("Could not fetch robots.txt for {}: {}", domain, e);
                RobotsRules::allow_all()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{response, MockTransport};
    use crate::transport::TransportErrorKind;

    const ROBOTS_URL: &str = "https://example.com/robots.txt";

    fn create_test_cache(transport: &Arc<MockTransport>) -> RobotsCache {
        RobotsCache::new("TestBot", true, transport.clone())
    }

    #[tokio::test]
    async fn test_disallow_blocks_prefix() {
        let transport = Arc::new(MockTransport::new());
        transport.reply(
            ROBOTS_URL,
            Ok(response(200, "text/plain", "User-agent: *\nDisallow: /private\n")),
        );
        let mut cache = create_test_cache(&transport);

        assert!(!cache.can_fetch("https://example.com/private/page").await);
        assert!(cache.can_fetch("https://example.com/public/page").await);
    }

    #[tokio::test]
    async fn test_fetched_once_per_domain() {
        let transport = Arc::new(MockTransport::new());
        transport.reply(ROBOTS_URL, Ok(response(200, "text/plain", "")));
        let mut cache = create_test_cache(&transport);

        for _ in 0..3 {
            cache.can_fetch("https://example.com/page").await;
        }
        assert_eq!(transport.calls_to(ROBOTS_URL), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_robots_allows_all() {
        let transport = Arc::new(MockTransport::new());
        transport.status(ROBOTS_URL, 404);
        let mut cache = create_test_cache(&transport);

        assert!(cache.can_fetch("https://example.com/anything").await);
        assert!(cache.cached("example.com").is_some_and(RobotsRules::is_empty));
    }

    #[tokio::test]
    async fn test_fetch_failure_cached_as_empty() {
        let transport = Arc::new(MockTransport::new());
        transport.fail(ROBOTS_URL, TransportErrorKind::Timeout);
        let mut cache = create_test_cache(&transport);

        assert!(cache.can_fetch("https://example.com/a").await);
        assert!(cache.can_fetch("https://example.com/b").await);
        assert_eq!(transport.calls_to(ROBOTS_URL), 1);
    }

    #[tokio::test]
    async fn test_sends_user_agent() {
        let transport = Arc::new(MockTransport::new());
        let mut cache = create_test_cache(&transport);
        cache.can_fetch("https://example.com/").await;

        let calls = transport.calls();
        assert_eq!(calls[0].headers["User-Agent"], "TestBot");
    }

    #[tokio::test]
    async fn test_port_is_part_of_domain() {
        let transport = Arc::new(MockTransport::new());
        let mut cache = create_test_cache(&transport);
        cache.can_fetch("http://localhost:8080/page").await;
        assert_eq!(transport.calls()[0].url, "https://localhost:8080/robots.txt");
    }
}
