use crate::resilience::Proxy;
use crate::transport::{
    FetchRequest, Transport, TransportError, TransportErrorKind, TransportResponse,
};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::{BTreeMap, HashMap};
use std::error::Error as StdError;
use std::io;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Pool key: one client per session, proxy and TLS mode
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    session_id: String,
    proxy: Option<String>,
    verify_ssl: bool,
}

/// [`Transport`] backed by `reqwest`
///
/// Clients are built lazily and cached per session so that connections are
/// reused until the session is rotated away.
#[derive(Debug, Default)]
pub struct ReqwestTransport {
    clients: Mutex<HashMap<ClientKey, Client>>,
    connect_timeout: Option<Duration>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a connect timeout applied to every client built afterwards
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Number of pooled clients currently held
    #[cfg(test)]
    fn pooled_clients(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn client_for(&self, request: &FetchRequest<'_>) -> Result<Client, TransportError> {
        let key = ClientKey {
            session_id: request.session_id.to_string(),
            proxy: request.proxy.map(Proxy::key),
            verify_ssl: request.verify_ssl,
        };

        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let client = self.build_client(request.proxy, request.verify_ssl)?;
        tracing::trace!("Built HTTP client for session {}", request.session_id);
        clients.insert(key, client.clone());
        Ok(client)
    }

    fn build_client(&self, proxy: Option<&Proxy>, verify_ssl: bool) -> Result<Client, TransportError> {
        let mut builder = Client::builder()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .danger_accept_invalid_certs(!verify_ssl);

        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        match proxy {
            Some(proxy) => {
                for (scheme, address) in proxy.endpoints() {
                    let configured = match scheme.as_str() {
                        "http" => reqwest::Proxy::http(address.as_str()),
                        "https" => reqwest::Proxy::https(address.as_str()),
                        _ => reqwest::Proxy::all(address.as_str()),
                    };
                    let configured = configured.map_err(|e| {
                        TransportError::new(TransportErrorKind::Proxy, e.to_string())
                    })?;
                    builder = builder.proxy(configured);
                }
            }
            None => builder = builder.no_proxy(),
        }

        builder
            .build()
            .map_err(|e| TransportError::new(TransportErrorKind::Request, e.to_string()))
    }
}

/// Messages of connection-level failures that carry no `io::Error` source
const DROPPED_CONNECTION_MESSAGES: &[&str] = &[
    "connection closed before message completed",
    "connection reset",
    "broken pipe",
];

/// Maps a reqwest failure onto the crawler's error classes
///
/// Connect-phase timeouts count as connection failures, as does a peer
/// (target or proxy) that drops an established connection mid-request.
fn classify(error: &reqwest::Error) -> TransportErrorKind {
    if error.is_connect() || is_dropped_connection(error) {
        TransportErrorKind::Connect
    } else if error.is_timeout() {
        TransportErrorKind::Timeout
    } else {
        TransportErrorKind::Request
    }
}

/// Walks the source chain looking for a reset, aborted or truncated connection
fn is_dropped_connection(error: &(dyn StdError + 'static)) -> bool {
    let mut current = error.source();
    while let Some(cause) = current {
        if let Some(io) = cause.downcast_ref::<io::Error>() {
            if matches!(
                io.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        let message = cause.to_string().to_lowercase();
        if DROPPED_CONNECTION_MESSAGES.iter().any(|m| message.contains(m)) {
            return true;
        }
        current = cause.source();
    }
    false
}

fn to_transport_error(error: reqwest::Error) -> TransportError {
    let kind = classify(&error);
    let mut message = error.to_string();
    if let Some(source) = error.source() {
        message = format!("{} ({})", message, source);
    }
    TransportError::new(kind, message)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, request: &FetchRequest<'_>) -> Result<TransportResponse, TransportError> {
        let client = self.client_for(request)?;
        let start = Instant::now();
        let mut retries = 0;

        loop {
            let mut builder = client.get(request.url).timeout(request.timeout);
            for (name, value) in request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            let response = builder.send().await.map_err(to_transport_error)?;
            let status = response.status().as_u16();

            if request.retry.should_retry(status) && retries < request.retry.max_retries {
                retries += 1;
                let backoff = request.retry.backoff(retries);
                tracing::debug!(
                    "HTTP {} from {}, retry {}/{} in {:.1}s",
                    status,
                    request.url,
                    retries,
                    request.retry.max_retries,
                    backoff.as_secs_f64()
                );
                drop(response);
                if !backoff.is_zero() {
                    tokio::time::sleep(backoff).await;
                }
                continue;
            }

            let headers: BTreeMap<String, String> = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_lowercase(), v.to_string()))
                })
                .collect();

            let body = response.bytes().await.map_err(to_transport_error)?;

            return Ok(TransportResponse {
                status,
                headers,
                body: body.to_vec(),
                elapsed: start.elapsed(),
                retries,
            });
        }
    }

    fn close_session(&self, session_id: &str) {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        clients.retain(|key, _| key.session_id != session_id);
    }
}
