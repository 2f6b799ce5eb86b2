//! Proxy pool with rotation and failover
//!
//! Proxies that fail are excluded from rotation until every proxy in the
//! pool has failed, at which point the failed set is forgotten and rotation
//! starts over. Proxies that fail validation are dropped for good.

use crate::transport::{FetchRequest, RetryPolicy, Transport};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Session id used for proxy probes
const PROBE_SESSION: &str = "proxy-probe";

/// An egress proxy: target scheme to proxy address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Proxy {
    endpoints: BTreeMap<String, String>,
}

impl Proxy {
    pub fn new(endpoints: BTreeMap<String, String>) -> Self {
        Self { endpoints }
    }

    /// Uses the same proxy address for both http and https traffic
    pub fn from_address(address: impl Into<String>) -> Self {
        let address = address.into();
        let mut endpoints = BTreeMap::new();
        endpoints.insert("http".to_string(), address.clone());
        endpoints.insert("https".to_string(), address);
        Self { endpoints }
    }

    pub fn endpoints(&self) -> &BTreeMap<String, String> {
        &self.endpoints
    }

    /// Stable identity used by the failed set and connection pools
    pub fn key(&self) -> String {
        self.endpoints
            .iter()
            .map(|(scheme, address)| format!("{}={}", scheme, address))
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut addresses = self.endpoints.values();
        match addresses.next() {
            Some(first) if addresses.all(|a| a == first) => f.write_str(first),
            _ => f.write_str(&self.key()),
        }
    }
}

/// Snapshot of pool health
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyHealth {
    pub total: usize,
    pub healthy: usize,
    pub failed: usize,
    /// Healthy share of the pool, 0-100
    pub health_percentage: f64,
}

/// Rotates through a pool of proxies, skipping failed ones
#[derive(Debug, Default)]
pub struct ProxyRotator {
    proxies: Vec<Proxy>,
    cursor: usize,
    failed: HashSet<String>,
}

impl ProxyRotator {
    pub fn new(proxies: Vec<Proxy>) -> Self {
        let mut rotator = Self::default();
        for proxy in proxies {
            rotator.add_proxy(proxy);
        }
        rotator
    }

    /// Returns the next proxy not marked failed
    ///
    /// Walks at most one full cycle. If every proxy has failed the failed
    /// set is cleared and the next proxy in the cycle is returned.
    pub fn get_next(&mut self) -> Option<Proxy> {
        if self.proxies.is_empty() {
            return None;
        }

        for _ in 0..self.proxies.len() {
            let candidate = self.advance();
            if !self.failed.contains(&candidate.key()) {
                return Some(candidate);
            }
        }

        tracing::warn!(
            "All {} proxies marked failed, resetting failed set",
            self.proxies.len()
        );
        self.failed.clear();
        Some(self.advance())
    }

    fn advance(&mut self) -> Proxy {
        let proxy = self.proxies[self.cursor % self.proxies.len()].clone();
        self.cursor = (self.cursor + 1) % self.proxies.len();
        proxy
    }

    /// Excludes a proxy from rotation until the pool is exhausted
    pub fn mark_failed(&mut self, proxy: &Proxy) {
        tracing::debug!("Marking proxy {} as failed", proxy);
        self.failed.insert(proxy.key());
    }

    /// Adds a proxy, returning false if it is already in the pool
    pub fn add_proxy(&mut self, proxy: Proxy) -> bool {
        if self.proxies.contains(&proxy) {
            return false;
        }
        self.proxies.push(proxy);
        true
    }

    /// Probes every proxy and permanently drops those not answering 200
    ///
    /// # Returns
    ///
    /// The number of proxies removed
    pub async fn validate(
        &mut self,
        transport: &dyn Transport,
        probe_url: &str,
        timeout: Duration,
    ) -> usize {
        let candidates = std::mem::take(&mut self.proxies);
        let before = candidates.len();
        let mut healthy = Vec::with_capacity(before);

        for proxy in candidates {
            if probe(transport, &proxy, probe_url, timeout).await {
                healthy.push(proxy);
            } else {
                tracing::warn!("Proxy {} failed validation, removing", proxy);
            }
        }

        self.proxies = healthy;
        self.cursor = 0;
        let remaining: HashSet<String> = self.proxies.iter().map(Proxy::key).collect();
        self.failed.retain(|key| remaining.contains(key));

        let removed = before - self.proxies.len();
        tracing::info!(
            "Proxy validation: {} of {} proxies usable",
            self.proxies.len(),
            before
        );
        removed
    }

    pub fn health(&self) -> ProxyHealth {
        let total = self.proxies.len();
        let failed = self
            .proxies
            .iter()
            .filter(|p| self.failed.contains(&p.key()))
            .count();
        let healthy = total - failed;
        let health_percentage = if total == 0 {
            0.0
        } else {
            healthy as f64 / total as f64 * 100.0
        };

        ProxyHealth {
            total,
            healthy,
            failed,
            health_percentage,
        }
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    #[cfg(test)]
    pub fn proxies(&self) -> &[Proxy] {
        &self.proxies
    }

    #[cfg(test)]
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

/// Returns true if `probe_url` answers 200 through the proxy
pub async fn probe(
    transport: &dyn Transport,
    proxy: &Proxy,
    probe_url: &str,
    timeout: Duration,
) -> bool {
    let headers = BTreeMap::new();
    let retry = RetryPolicy::none();
    let request = FetchRequest {
        url: probe_url,
        proxy: Some(proxy),
        timeout,
        verify_ssl: true,
        headers: &headers,
        session_id: PROBE_SESSION,
        retry: &retry,
    };

    let ok = match transport.get(&request).await {
        Ok(response) => response.status == 200,
        Err(e) => {
            tracing::debug!("Proxy probe through {} failed: {}", proxy, e);
            false
        }
    };
    transport.close_session(PROBE_SESSION);
    ok
}

/// Parses one proxy address per line
///
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_proxy_lines(text: &str) -> Vec<Proxy> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(Proxy::from_address)
        .collect()
}

/// Reads a proxy list file in the [`parse_proxy_lines`] format
pub fn load_proxy_file(path: &Path) -> crate::Result<Vec<Proxy>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_proxy_lines(&content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{response, MockTransport};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PROBE: &str = "http://probe.test/ip";

    fn create_test_rotator() -> ProxyRotator {
        ProxyRotator::new(vec![
            Proxy::from_address("http://p1:8080"),
            Proxy::from_address("http://p2:8080"),
            Proxy::from_address("http://p3:8080"),
        ])
    }

    #[test]
    fn test_proxy_from_address() {
        let proxy = Proxy::from_address("http://p1:8080");
        assert_eq!(proxy.endpoints().len(), 2);
        assert_eq!(proxy.endpoints()["http"], "http://p1:8080");
        assert_eq!(proxy.endpoints()["https"], "http://p1:8080");
        assert_eq!(proxy.to_string(), "http://p1:8080");
        assert_eq!(proxy.key(), "http=http://p1:8080;https=http://p1:8080");
    }

    #[test]
    fn test_round_robin() {
        let mut rotator = create_test_rotator();
        let picks: Vec<String> = (0..4)
            .filter_map(|_| rotator.get_next())
            .map(|p| p.to_string())
            .collect();
        assert_eq!(
            picks,
            vec!["http://p1:8080", "http://p2:8080", "http://p3:8080", "http://p1:8080"]
        );
    }

    #[test]
    fn test_skips_failed() {
        let mut rotator = create_test_rotator();
        rotator.mark_failed(&Proxy::from_address("http://p2:8080"));

        let picks: Vec<String> = (0..3)
            .filter_map(|_| rotator.get_next())
            .map(|p| p.to_string())
            .collect();
        assert_eq!(picks, vec!["http://p1:8080", "http://p3:8080", "http://p1:8080"]);
    }

    #[test]
    fn test_exhaustion_resets_failed_set() {
        let mut rotator = create_test_rotator();
        for proxy in rotator.proxies().to_vec() {
            rotator.mark_failed(&proxy);
        }
        assert_eq!(rotator.health().healthy, 0);

        let next = rotator.get_next();
        assert!(next.is_some());
        assert_eq!(rotator.failed_count(), 0);
        assert_eq!(rotator.health().healthy, 3);
    }

    #[test]
    fn test_empty_pool() {
        let mut rotator = ProxyRotator::new(Vec::new());
        assert_eq!(rotator.get_next(), None);
        assert_eq!(rotator.health().health_percentage, 0.0);
    }

    #[test]
    fn test_add_proxy_dedup() {
        let mut rotator = create_test_rotator();
        assert!(!rotator.add_proxy(Proxy::from_address("http://p1:8080")));
        assert!(rotator.add_proxy(Proxy::from_address("http://p4:8080")));
        assert_eq!(rotator.len(), 4);
    }

    #[test]
    fn test_health() {
        let mut rotator = create_test_rotator();
        rotator.mark_failed(&Proxy::from_address("http://p1:8080"));
        let health = rotator.health();
        assert_eq!(health.total, 3);
        assert_eq!(health.healthy, 2);
        assert_eq!(health.failed, 1);
        assert!((health.health_percentage - 66.666).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_validate_drops_dead_proxies() {
        let transport = MockTransport::new();
        transport.reply(PROBE, Ok(response(200, "application/json", "{}")));
        transport.kill_proxy(&Proxy::from_address("http://p2:8080").key());

        let mut rotator = create_test_rotator();
        let removed = rotator
            .validate(&transport, PROBE, Duration::from_secs(1))
            .await;

        assert_eq!(removed, 1);
        assert_eq!(rotator.len(), 2);
        assert!(!rotator
            .proxies()
            .contains(&Proxy::from_address("http://p2:8080")));
    }

    #[tokio::test]
    async fn test_validate_requires_200() {
        let transport = MockTransport::new();
        transport.status(PROBE, 403);

        let mut rotator = create_test_rotator();
        rotator
            .validate(&transport, PROBE, Duration::from_secs(1))
            .await;
        assert!(rotator.is_empty());
    }

    #[test]
    fn test_parse_proxy_lines() {
        let text = "# pool\nhttp://p1:8080\n\n  http://p2:3128  \n# http://disabled:1\n";
        let proxies = parse_proxy_lines(text);
        assert_eq!(
            proxies,
            vec![
                Proxy::from_address("http://p1:8080"),
                Proxy::from_address("http://p2:3128"),
            ]
        );
    }

    #[test]
    fn test_load_proxy_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"http://p1:8080\nhttp://p2:8080\n").unwrap();
        file.flush().unwrap();

        let proxies = load_proxy_file(file.path()).unwrap();
        assert_eq!(proxies.len(), 2);
        assert!(load_proxy_file(Path::new("/nonexistent/proxies.txt")).is_err());
    }
}
