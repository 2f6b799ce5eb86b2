//! Per-page crawl record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of fetching one dequeued URL
///
/// Exactly one record is produced per dequeued-and-processed URL. Every
/// field is always present in the serialized form; absent optional values
/// become `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,
    pub title: String,
    pub meta_description: String,
    /// Normalized outgoing links, deduplicated in discovery order
    pub links: Vec<String>,
    pub status_code: Option<u16>,
    /// Set when the page counts as a failure
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub content_type: Option<String>,
    /// Body size in bytes
    pub content_length: Option<u64>,
    #[serde(with = "secs_f64")]
    pub response_time: Option<Duration>,
    pub user_agent_used: String,
    pub proxy_used: Option<String>,
    pub retry_count: u32,
    /// Depth of the frontier entry that produced this record
    pub depth: u32,
}

impl PageResult {
    /// Creates an empty record stamped with the current time
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            meta_description: String::new(),
            links: Vec::new(),
            status_code: None,
            error: None,
            timestamp: Utc::now(),
            content_type: None,
            content_length: None,
            response_time: None,
            user_agent_used: String::new(),
            proxy_used: None,
            retry_count: 0,
            depth,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Serializes `Option<Duration>` as fractional seconds
mod secs_f64 {
    use crate::resilience::seconds_to_duration;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<f64>::deserialize(deserializer)?;
        Ok(secs
            .filter(|s| s.is_finite() && *s >= 0.0)
            .map(seconds_to_duration))
    }
}
