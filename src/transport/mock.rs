//! Scripted [`Transport`] for unit tests

use crate::transport::{
    FetchRequest, Transport, TransportError, TransportErrorKind, TransportResponse,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

type Reply = Result<TransportResponse, TransportError>;

/// A request as seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub proxy: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub session_id: String,
}

/// Replies per URL; the last scripted reply for a URL repeats forever.
/// Unknown URLs get a 404.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    dead_proxies: Mutex<HashSet<String>>,
    calls: Mutex<Vec<RecordedCall>>,
    closed: Mutex<Vec<String>>,
}

pub fn response(status: u16, content_type: &str, body: &str) -> TransportResponse {
    let mut headers = BTreeMap::new();
    if !content_type.is_empty() {
        headers.insert("content-type".to_string(), content_type.to_string());
    }
    TransportResponse {
        status,
        headers,
        body: body.as_bytes().to_vec(),
        elapsed: Duration::from_millis(10),
        retries: 0,
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, url: &str, reply: Reply) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn html(&self, url: &str, body: &str) -> &Self {
        self.reply(url, Ok(response(200, "text/html; charset=utf-8", body)))
    }

    pub fn status(&self, url: &str, status: u16) -> &Self {
        self.reply(url, Ok(response(status, "text/html", "")))
    }

    pub fn fail(&self, url: &str, kind: TransportErrorKind) -> &Self {
        self.reply(url, Err(TransportError::new(kind, "scripted failure")))
    }

    /// Every request routed through this proxy fails to connect
    pub fn kill_proxy(&self, proxy_key: &str) -> &Self {
        self.dead_proxies.lock().unwrap().insert(proxy_key.to_string());
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.url == url).count()
    }

    pub fn closed_sessions(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, request: &FetchRequest<'_>) -> Result<TransportResponse, TransportError> {
        let proxy = request.proxy.map(|p| p.key());
        self.calls.lock().unwrap().push(RecordedCall {
            url: request.url.to_string(),
            proxy: proxy.clone(),
            headers: request.headers.clone(),
            session_id: request.session_id.to_string(),
        });

        if let Some(key) = proxy {
            if self.dead_proxies.lock().unwrap().contains(&key) {
                return Err(TransportError::new(
                    TransportErrorKind::Connect,
                    format!("proxy {} unreachable", key),
                ));
            }
        }

        let mut replies = self.replies.lock().unwrap();
        match replies.get_mut(request.url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| Ok(response(404, "", ""))),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(response(404, "", ""))),
            None => Ok(response(404, "text/html", "")),
        }
    }

    fn close_session(&self, session_id: &str) {
        self.closed.lock().unwrap().push(session_id.to_string());
    }
}
