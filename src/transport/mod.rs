//! HTTP transport boundary
//!
//! The crawler never talks to `reqwest` directly. Every request goes through
//! the [`Transport`] trait so that proxy handling, per-session connection
//! pools and status-level retries live in one place, and so tests can script
//! responses without a network.

mod client;
#[cfg(test)]
pub(crate) mod mock;

pub use client::ReqwestTransport;

use crate::resilience::Proxy;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Statuses retried by default
pub const DEFAULT_RETRY_STATUSES: &[u16] = &[429, 500, 502, 503, 504, 520, 521, 522, 524];

/// Default backoff factor between status retries (seconds)
pub const DEFAULT_BACKOFF_FACTOR: f64 = 0.3;

/// Status-level retry behaviour for one session
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    pub backoff_factor: f64,
    /// Statuses that trigger a retry
    pub retry_statuses: BTreeSet<u16>,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            retry_statuses: DEFAULT_RETRY_STATUSES.iter().copied().collect(),
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self::new(0)
    }

    pub fn should_retry(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }

    /// Pause before the given retry (1-based)
    ///
    /// The first retry is immediate; later ones wait `factor * 2^(n-1)`.
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry <= 1 {
            return Duration::ZERO;
        }
        let exponent = (retry - 1).min(16) as i32;
        Duration::from_secs_f64(self.backoff_factor * 2f64.powi(exponent))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// One GET request as issued by the crawler
#[derive(Debug, Clone)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    pub proxy: Option<&'a Proxy>,
    pub timeout: Duration,
    pub verify_ssl: bool,
    pub headers: &'a BTreeMap<String, String>,
    /// Identifies the connection pool to use
    pub session_id: &'a str,
    pub retry: &'a RetryPolicy,
}

/// A fully read HTTP response
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    /// Header names are lowercased
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
    /// Wall time from first send to fully read body, retries included
    pub elapsed: Duration,
    /// Number of status-level retries performed
    pub retries: u32,
}

impl TransportResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// The Content-Type header, or an empty string
    pub fn content_type(&self) -> &str {
        self.header("content-type").unwrap_or("")
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Coarse classification of transport failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    /// Could not establish a connection to the target
    Connect,
    /// The proxy refused or could not be configured
    Proxy,
    /// Anything else (invalid request, body read failure, ...)
    Request,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Timeout => "timeout",
            Self::Connect => "connection error",
            Self::Proxy => "proxy error",
            Self::Request => "request error",
        };
        f.write_str(s)
    }
}

/// A failed transport call
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// True for failures that warrant switching to another proxy
    pub fn is_proxy_related(&self) -> bool {
        matches!(self.kind, TransportErrorKind::Connect | TransportErrorKind::Proxy)
    }
}

/// Performs HTTP GETs on behalf of the crawler
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a GET, retrying retryable statuses per `request.retry`
    ///
    /// When retries are exhausted the last response is returned, not an error.
    async fn get(&self, request: &FetchRequest<'_>) -> Result<TransportResponse, TransportError>;

    /// Releases any pooled connections held for a session
    fn close_session(&self, _session_id: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_defaults() {
        let policy = RetryPolicy::new(3);
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.backoff_factor, 0.3);
        for status in [429, 500, 502, 503, 504, 520, 521, 522, 524] {
            assert!(policy.should_retry(status));
        }
        assert!(!policy.should_retry(200));
        assert!(!policy.should_retry(404));
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::new(5);
        assert_eq!(policy.backoff(1), Duration::ZERO);
        assert!((policy.backoff(2).as_secs_f64() - 0.6).abs() < 1e-9);
        assert!((policy.backoff(3).as_secs_f64() - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_response_header_lookup() {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "text/html".to_string());
        let response = TransportResponse {
            status: 200,
            headers,
            body: b"<html></html>".to_vec(),
            elapsed: Duration::from_millis(5),
            retries: 0,
        };

        assert_eq!(response.content_type(), "text/html");
        assert_eq!(response.header("Content-Type"), Some("text/html"));
        assert_eq!(response.header("x-missing"), None);
        assert_eq!(response.text(), "<html></html>");
    }

    #[test]
    fn test_error_classification() {
        let err = TransportError::new(TransportErrorKind::Connect, "refused");
        assert!(err.is_proxy_related());
        assert_eq!(err.to_string(), "connection error: refused");

        let err = TransportError::new(TransportErrorKind::Timeout, "slow");
        assert!(!err.is_proxy_related());
    }
}
