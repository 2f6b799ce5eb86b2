//! Request resilience layer
//!
//! Pacing, identity rotation and failover: everything that keeps the crawler
//! from overwhelming a server or being trivially blocked by it.

mod delay;
mod headers;
mod proxy;
mod session;
mod user_agent;

pub use delay::{
    seconds_to_duration, DelayManager, DelayStrategy, ADAPTIVE_WINDOW, RATE_LIMIT_ESCALATION,
};
pub use headers::{baseline_headers, generate_random_headers};
pub use proxy::{load_proxy_file, parse_proxy_lines, probe, Proxy, ProxyHealth, ProxyRotator};
pub use session::{session_id, SessionHandle, SessionManager};
pub use user_agent::{RotationMode, UserAgentRotator, DEFAULT_USER_AGENTS};
