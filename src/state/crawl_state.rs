//! Lifecycle states of a crawl run
//!
//! ```text
//! Idle -> Running -> Done
//!                 -> Draining    -> Done   (too many consecutive failures)
//!                 -> Interrupted -> Done   (external interrupt)
//! ```
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    /// Constructed, not started
    Idle,

    /// Dequeuing and fetching pages
    Running,

    /// Stopping early after repeated failures
    Draining,

    /// Stopping early because an interrupt was triggered
    Interrupted,

    /// Finished; results are final
    Done,
}

impl CrawlState {
    /// Checks whether moving to `next` is a legal transition
    pub fn can_transition_to(&self, next: CrawlState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::Draining)
                | (Self::Running, Self::Interrupted)
                | (Self::Running, Self::Done)
                | (Self::Draining, Self::Done)
                | (Self::Interrupted, Self::Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Interrupted => "interrupted",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(CrawlState::Idle.can_transition_to(CrawlState::Running));
        assert!(CrawlState::Running.can_transition_to(CrawlState::Done));
    }

    #[test]
    fn test_early_stop_transitions() {
        assert!(CrawlState::Running.can_transition_to(CrawlState::Draining));
        assert!(CrawlState::Draining.can_transition_to(CrawlState::Done));
        assert!(CrawlState::Running.can_transition_to(CrawlState::Interrupted));
        assert!(CrawlState::Interrupted.can_transition_to(CrawlState::Done));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!CrawlState::Done.can_transition_to(CrawlState::Running));
        assert!(!CrawlState::Idle.can_transition_to(CrawlState::Done));
        assert!(!CrawlState::Draining.can_transition_to(CrawlState::Running));
        assert!(!CrawlState::Running.can_transition_to(CrawlState::Idle));
    }

    #[test]
    fn test_display() {
        assert_eq!(CrawlState::Interrupted.to_string(), "interrupted");
        assert_eq!(format!("{}", CrawlState::Idle), "idle");
    }
}
