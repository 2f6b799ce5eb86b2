//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching robots.txt files.

mod cache;
mod parser;

pub use cache::{RobotsCache, ROBOTS_TIMEOUT};
pub use parser::RobotsRules;
