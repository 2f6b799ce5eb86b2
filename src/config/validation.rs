use crate::config::types::{AntiDetectionConfig, CrawlConfig, CrawlerConfig, ProxyConfig, RequestConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound for any duration given in seconds (one day)
pub const MAX_SECONDS: f64 = 86_400.0;

/// Validates the entire configuration
pub fn validate(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_anti_detection_config(&config.anti_detection)?;
    validate_proxy_config(&config.proxy)?;
    validate_request_config(&config.request)?;
    Ok(())
}

/// Validates traversal settings and the seed URL
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_depth >= 0 is always true for u32, so no check needed

    if config.seed_url.trim().is_empty() {
        return Err(ConfigError::Validation(
            "seed_url cannot be empty".to_string(),
        ));
    }

    if !(config.seed_url.starts_with("http://") || config.seed_url.starts_with("https://")) {
        return Err(ConfigError::InvalidUrl(format!(
            "Invalid seed URL scheme: {}",
            config.seed_url
        )));
    }

    let seed = Url::parse(&config.seed_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", config.seed_url, e)))?;
    if seed.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' has no host",
            config.seed_url
        )));
    }

    if config.max_pages == 0 {
        return Err(ConfigError::Validation(
            "max_pages must be positive".to_string(),
        ));
    }

    validate_seconds("delay", config.delay)?;

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates delay bounds and rotation intervals
fn validate_anti_detection_config(config: &AntiDetectionConfig) -> Result<(), ConfigError> {
    validate_seconds("min_delay", config.min_delay)?;
    validate_seconds("max_delay", config.max_delay)?;

    if config.max_delay < config.min_delay {
        return Err(ConfigError::Validation(format!(
            "max_delay ({}) must be >= min_delay ({})",
            config.max_delay, config.min_delay
        )));
    }

    if config.session_rotation_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "session_rotation_interval must be >= 1, got {}",
            config.session_rotation_interval
        )));
    }

    if config.custom_user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "custom_user_agents cannot contain empty entries".to_string(),
        ));
    }

    Ok(())
}

/// Validates the proxy pool
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    if config.enabled && config.proxies.is_empty() {
        return Err(ConfigError::Validation(
            "Proxy rotation enabled but no proxies provided".to_string(),
        ));
    }

    for proxy in &config.proxies {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }

    if config.enabled && config.validate {
        Url::parse(&config.probe_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid probe URL '{}': {}", config.probe_url, e))
        })?;
    }

    Ok(())
}

/// Validates per-request settings
fn validate_request_config(config: &RequestConfig) -> Result<(), ConfigError> {
    if !config.timeout.is_finite() || config.timeout <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "timeout must be positive, got {}",
            config.timeout
        )));
    }
    validate_seconds("timeout", config.timeout)?;

    Ok(())
}

/// Rejects negative, non-finite or oversized durations given in seconds
fn validate_seconds(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::Validation(format!(
            "{} cannot be negative, got {}",
            name, value
        )));
    }
    if value > MAX_SECONDS {
        return Err(ConfigError::Validation(format!(
            "{} must be at most {} seconds, got {}",
            name, MAX_SECONDS, value
        )));
    }
    Ok(())
}
