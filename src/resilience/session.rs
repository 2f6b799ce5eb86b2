use crate::resilience::headers::baseline_headers;
use crate::transport::{RetryPolicy, Transport};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Builds the id of the n-th rotated session
pub fn session_id(index: u64) -> String {
    format!("session_{}", index)
}

/// Identity and retry settings shared by a run of requests
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: String,
    headers: BTreeMap<String, String>,
    request_count: u64,
    retry: RetryPolicy,
}

impl SessionHandle {
    fn new(id: &str, retry: RetryPolicy) -> Self {
        Self {
            id: id.to_string(),
            headers: baseline_headers(),
            request_count: 0,
            retry,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.headers.get("User-Agent").map(String::as_str)
    }

    pub fn set_user_agent(&mut self, user_agent: &str) {
        self.headers
            .insert("User-Agent".to_string(), user_agent.to_string());
    }

    /// Overwrites session headers with the given ones
    pub fn merge_headers(&mut self, headers: BTreeMap<String, String>) {
        self.headers.extend(headers);
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    pub fn record_request(&mut self) {
        self.request_count += 1;
    }
}

/// Owns the live sessions of a crawl
///
/// Closing a session also releases the transport's pooled connections for
/// that session id.
pub struct SessionManager {
    sessions: HashMap<String, SessionHandle>,
    retry: RetryPolicy,
    transport: Arc<dyn Transport>,
}

impl SessionManager {
    pub fn new(retry: RetryPolicy, transport: Arc<dyn Transport>) -> Self {
        Self {
            sessions: HashMap::new(),
            retry,
            transport,
        }
    }

    /// Returns the session with this id, creating it on first use
    pub fn get_session(&mut self, id: &str) -> &mut SessionHandle {
        let retry = &self.retry;
        self.sessions.entry(id.to_string()).or_insert_with(|| {
            tracing::debug!("Opening session {}", id);
            SessionHandle::new(id, retry.clone())
        })
    }

    /// Closes a session, returning false if it was not open
    pub fn close_session(&mut self, id: &str) -> bool {
        let existed = self.sessions.remove(id).is_some();
        self.transport.close_session(id);
        if existed {
            tracing::debug!("Closed session {}", id);
        }
        existed
    }

    pub fn close_all(&mut self) {
        let ids: Vec<String> = self.sessions.keys().cloned().collect();
        for id in ids {
            self.close_session(&id);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
