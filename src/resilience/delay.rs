//! Inter-request pacing
//!
//! The [`DelayManager`] decides how long to pause between requests. The
//! target delay comes from the active [`DelayStrategy`]; only the part of it
//! that has not already elapsed since the previous dispatch is slept.

use crate::ConfigError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Number of response times kept for the adaptive strategy
pub const ADAPTIVE_WINDOW: usize = 10;

/// Multiplier applied to the base delay after an HTTP 429
pub const RATE_LIMIT_ESCALATION: f64 = 1.5;

/// Converts seconds to a [`Duration`], saturating instead of panicking
///
/// Negative and NaN inputs give zero; values too large to represent give
/// [`Duration::MAX`].
pub fn seconds_to_duration(seconds: f64) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}

/// How the delay between consecutive requests is chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayStrategy {
    /// Always the base delay
    #[default]
    Fixed,
    /// Uniform in `[0.5, 1.5] * base`
    Random,
    /// Base delay growing by 1.5x every 10 requests, capped at 5 steps
    Exponential,
    /// Base delay scaled by the recent average response time
    Adaptive,
}

impl DelayStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Random => "random",
            Self::Exponential => "exponential",
            Self::Adaptive => "adaptive",
        }
    }
}

impl fmt::Display for DelayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DelayStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "random" => Ok(Self::Random),
            "exponential" => Ok(Self::Exponential),
            "adaptive" => Ok(Self::Adaptive),
            _ => Err(ConfigError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Paces requests according to a [`DelayStrategy`]
///
/// The base delay is mutable for the lifetime of a run: every call to
/// [`DelayManager::escalate_rate_limit`] inflates it permanently.
#[derive(Debug)]
pub struct DelayManager {
    strategy: DelayStrategy,
    base_delay: f64,
    request_count: u64,
    response_times: VecDeque<f64>,
    last_dispatch: Option<Instant>,
    rng: StdRng,
}

impl DelayManager {
    /// Creates a delay manager
    ///
    /// # Arguments
    ///
    /// * `strategy` - The pacing strategy
    /// * `base_delay` - Base delay in seconds
    /// * `seed` - Seed for the random strategy (entropy when `None`)
    pub fn new(strategy: DelayStrategy, base_delay: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            strategy,
            base_delay: base_delay.max(0.0),
            request_count: 0,
            response_times: VecDeque::with_capacity(ADAPTIVE_WINDOW),
            last_dispatch: None,
            rng,
        }
    }

    pub fn strategy(&self) -> DelayStrategy {
        self.strategy
    }

    /// Current base delay in seconds
    pub fn base_delay(&self) -> f64 {
        self.base_delay
    }

    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    /// Response times (seconds) currently in the adaptive window
    pub fn response_times(&self) -> impl Iterator<Item = f64> + '_ {
        self.response_times.iter().copied()
    }

    /// Computes the target delay for the next request
    ///
    /// For the adaptive strategy the given response time is pushed into the
    /// rolling window before the average is taken.
    pub fn compute_delay(&mut self, last_response_time: Option<Duration>) -> Duration {
        let base = self.base_delay;
        let seconds = match self.strategy {
            DelayStrategy::Fixed => base,
            DelayStrategy::Random => {
                if base > 0.0 {
                    self.rng.gen_range(base * 0.5..=base * 1.5)
                } else {
                    0.0
                }
            }
            DelayStrategy::Exponential => {
                let steps = (self.request_count / 10).min(5) as i32;
                base * 1.5_f64.powi(steps)
            }
            DelayStrategy::Adaptive => {
                if let Some(rt) = last_response_time {
                    self.record_response_time(rt);
                }
                self.adaptive_delay()
            }
        };

        seconds_to_duration(seconds)
    }

    /// Computes the remaining pause and records the next dispatch instant
    ///
    /// Only the part of the target delay not already elapsed since the
    /// previous dispatch is returned. The request counter is incremented.
    pub fn next_pause(&mut self, last_response_time: Option<Duration>) -> Duration {
        let target = self.compute_delay(last_response_time);
        let now = Instant::now();

        let pause = match self.last_dispatch {
            Some(last) => target.saturating_sub(now.duration_since(last)),
            None => target,
        };

        self.last_dispatch = Some(now + pause);
        self.request_count += 1;
        pause
    }

    /// Sleeps according to the strategy
    pub async fn wait(&mut self, last_response_time: Option<Duration>) {
        let pause = self.next_pause(last_response_time);
        if !pause.is_zero() {
            tracing::trace!("Pausing {:.3}s ({})", pause.as_secs_f64(), self.strategy);
            tokio::time::sleep(pause).await;
        }
    }

    /// Permanently multiplies the base delay by 1.5 for the rest of the run
    pub fn escalate_rate_limit(&mut self) {
        let previous = self.base_delay;
        self.base_delay *= RATE_LIMIT_ESCALATION;
        tracing::warn!(
            "Rate limited: base delay raised from {:.2}s to {:.2}s",
            previous,
            self.base_delay
        );
    }

    /// Switches strategy, optionally replacing the base delay
    pub fn set_strategy(&mut self, strategy: DelayStrategy, base_delay: Option<f64>) {
        self.strategy = strategy;
        if let Some(base) = base_delay {
            self.base_delay = base.max(0.0);
        }
    }

    /// Clears the counter, the response-time window and the last dispatch
    pub fn reset(&mut self) {
        self.request_count = 0;
        self.response_times.clear();
        self.last_dispatch = None;
    }

    fn record_response_time(&mut self, response_time: Duration) {
        if self.response_times.len() == ADAPTIVE_WINDOW {
            self.response_times.pop_front();
        }
        self.response_times.push_back(response_time.as_secs_f64());
    }

    fn adaptive_delay(&self) -> f64 {
        if self.response_times.is_empty() {
            return self.base_delay;
        }

        let avg = self.response_times.iter().sum::<f64>() / self.response_times.len() as f64;
        if avg > 3.0 {
            self.base_delay * 2.0
        } else if avg > 1.0 {
            self.base_delay * 1.5
        } else {
            self.base_delay
        }
    }
}
