//! Robots.txt parser implementation
//!
//! A deliberately small line-oriented parser: only `User-agent`, `Disallow`
//! and `Crawl-delay` are understood, and disallow rules are plain path
//! prefixes.

use std::collections::BTreeSet;

/// Rules from one robots.txt that apply to our user agent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RobotsRules {
    disallowed: BTreeSet<String>,
    crawl_delay: f64,
}

impl RobotsRules {
    /// Parses robots.txt content for the given user agent
    ///
    /// A record applies when its `User-agent` is `*` or equals `user_agent`
    /// ignoring case. Empty `Disallow` values are ignored and the largest
    /// `Crawl-delay` seen wins.
    ///
    /// # Examples
    ///
    /// ```
    /// use webcrawler::robots::RobotsRules;
    ///
    /// let rules = RobotsRules::parse("User-agent: *\nDisallow: /private\n", "MyBot");
    /// assert!(!rules.can_crawl("/private/page"));
    /// assert!(rules.can_crawl("/public/page"));
    /// ```
    pub fn parse(content: &str, user_agent: &str) -> Self {
        let user_agent = user_agent.to_lowercase();
        let mut rules = Self::default();
        let mut applies = false;

        for line in content.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let directive = directive.trim().to_lowercase();
            let value = value.trim();

            match directive.as_str() {
                "user-agent" => {
                    let agent = value.to_lowercase();
                    applies = agent == "*" || agent == user_agent;
                }
                "disallow" if applies && !value.is_empty() => {
                    rules.disallowed.insert(value.to_string());
                }
                "crawl-delay" if applies => {
                    if let Ok(delay) = value.parse::<f64>() {
                        if delay.is_finite() {
                            rules.crawl_delay = rules.crawl_delay.max(delay);
                        }
                    }
                }
                _ => {}
            }
        }

        rules
    }

    /// Rules that permit everything
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Returns false if the path starts with any disallowed prefix
    pub fn can_crawl(&self, path: &str) -> bool {
        !self
            .disallowed
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Requested crawl delay in seconds (0 when unspecified)
    ///
    /// Exposed for reporting only; pacing is driven by the delay strategy.
    pub fn crawl_delay(&self) -> f64 {
        self.crawl_delay
    }

    pub fn disallowed(&self) -> impl Iterator<Item = &str> {
        self.disallowed.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.disallowed.is_empty() && self.crawl_delay == 0.0
    }
}
