//! Breadth-first frontier and visited set
//!
//! The frontier is a FIFO queue, so pages are fetched in discovery order and
//! all pages at depth `d` are dequeued before any page at depth `d + 1`.
//! A URL may be queued more than once; the visited set makes sure it is only
//! processed once.

use std::collections::{HashSet, VecDeque};

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Normalized URL
    pub url: String,

    /// Link distance from the seed (seed = 0)
    pub depth: u32,
}

/// FIFO queue of pending URLs plus the set of URLs already processed
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
    visited: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frontier holding only the seed at depth 0
    pub fn with_seed(seed_url: impl Into<String>) -> Self {
        let mut frontier = Self::new();
        frontier.push(seed_url, 0);
        frontier
    }

    /// Queues a URL at the given depth
    pub fn push(&mut self, url: impl Into<String>, depth: u32) {
        self.queue.push_back(FrontierEntry {
            url: url.into(),
            depth,
        });
    }

    /// Removes and returns the oldest entry
    pub fn pop(&mut self) -> Option<FrontierEntry> {
        self.queue.pop_front()
    }

    /// Records a URL as processed, returning false if it already was
    pub fn mark_visited(&mut self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Number of entries waiting in the queue
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}
