use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Realistic desktop and mobile browser user agents
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36",
    // Firefox on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/118.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/117.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/116.0",
    // Safari on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Safari/605.1.15",
    // Chrome on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36",
    // Chrome on Linux
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36",
    // Firefox on Linux
    "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/118.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/117.0",
    // Edge
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36 Edg/118.0.2088.46",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36 Edg/117.0.2045.47",
    // Mobile
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Android 13; Mobile; rv:109.0) Gecko/118.0 Firefox/118.0",
    "Mozilla/5.0 (Linux; Android 13; SM-G991B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Mobile Safari/537.36",
];

/// How the next user agent is picked from the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationMode {
    /// Uniformly random pick on every call
    Random,
    /// Walk the pool in order, wrapping around
    Cyclic,
}

impl RotationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Cyclic => "cyclic",
        }
    }
}

/// Rotates through a pool of user agent strings
#[derive(Debug)]
pub struct UserAgentRotator {
    pool: Vec<String>,
    mode: RotationMode,
    index: usize,
    rng: StdRng,
}

impl UserAgentRotator {
    /// Creates a rotator over `user_agents`, or the built-in pool when empty
    pub fn new(user_agents: Vec<String>, mode: RotationMode, seed: Option<u64>) -> Self {
        let pool = if user_agents.is_empty() {
            DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect()
        } else {
            user_agents
        };

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            pool,
            mode,
            index: 0,
            rng,
        }
    }

    /// Returns the next user agent, or `None` if the pool is empty
    pub fn get_next(&mut self) -> Option<String> {
        if self.pool.is_empty() {
            return None;
        }

        match self.mode {
            RotationMode::Random => self.pool.choose(&mut self.rng).cloned(),
            RotationMode::Cyclic => {
                let ua = self.pool[self.index % self.pool.len()].clone();
                self.index = (self.index + 1) % self.pool.len();
                Some(ua)
            }
        }
    }

    /// Adds a user agent unless it is already in the pool
    pub fn add(&mut self, user_agent: impl Into<String>) {
        let user_agent = user_agent.into();
        if !self.pool.contains(&user_agent) {
            self.pool.push(user_agent);
        }
    }

    /// Removes a user agent, returning false if it was not in the pool
    pub fn remove(&mut self, user_agent: &str) -> bool {
        match self.pool.iter().position(|ua| ua == user_agent) {
            Some(pos) => {
                self.pool.remove(pos);
                if self.index >= self.pool.len() {
                    self.index = 0;
                }
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn mode(&self) -> RotationMode {
        self.mode
    }

    pub fn user_agents(&self) -> &[String] {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom_pool() -> Vec<String> {
        vec!["agent-a".to_string(), "agent-b".to_string(), "agent-c".to_string()]
    }

    #[test]
    fn test_default_pool() {
        let rotator = UserAgentRotator::new(Vec::new(), RotationMode::Random, Some(1));
        assert_eq!(rotator.len(), 19);
        assert_eq!(rotator.len(), DEFAULT_USER_AGENTS.len());
    }

    #[test]
    fn test_cyclic_rotation_wraps() {
        let mut rotator = UserAgentRotator::new(custom_pool(), RotationMode::Cyclic, None);
        let picks: Vec<_> = (0..4).filter_map(|_| rotator.get_next()).collect();
        assert_eq!(picks, vec!["agent-a", "agent-b", "agent-c", "agent-a"]);
    }

    #[test]
    fn test_random_rotation_stays_in_pool() {
        let mut rotator = UserAgentRotator::new(custom_pool(), RotationMode::Random, Some(3));
        for _ in 0..50 {
            let ua = rotator.get_next().unwrap();
            assert!(custom_pool().contains(&ua));
        }
    }

    #[test]
    fn test_random_rotation_seeded() {
        let mut a = UserAgentRotator::new(Vec::new(), RotationMode::Random, Some(11));
        let mut b = UserAgentRotator::new(Vec::new(), RotationMode::Random, Some(11));
        for _ in 0..10 {
            assert_eq!(a.get_next(), b.get_next());
        }
    }

    #[test]
    fn test_add_ignores_duplicates() {
        let mut rotator = UserAgentRotator::new(custom_pool(), RotationMode::Cyclic, None);
        rotator.add("agent-a");
        assert_eq!(rotator.len(), 3);
        rotator.add("agent-d");
        assert_eq!(rotator.len(), 4);
    }

    #[test]
    fn test_remove() {
        let mut rotator = UserAgentRotator::new(custom_pool(), RotationMode::Cyclic, None);
        assert!(rotator.remove("agent-b"));
        assert!(!rotator.remove("agent-b"));
        assert_eq!(rotator.user_agents(), &["agent-a", "agent-c"]);
    }

    #[test]
    fn test_empty_pool_returns_none() {
        let mut rotator = UserAgentRotator::new(vec!["only".to_string()], RotationMode::Cyclic, None);
        assert!(rotator.remove("only"));
        assert!(rotator.is_empty());
        assert_eq!(rotator.get_next(), None);
    }
}
