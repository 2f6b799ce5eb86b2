//! URL handling module
//!
//! This module provides URL normalization, domain extraction and the
//! validation rules that decide which discovered links are worth crawling.

mod domain;
mod normalize;
mod validator;

// Re-export main functions
pub use domain::{domain_of, extract_domain};
pub use normalize::normalize_url;
pub use validator::{UrlValidator, BLOCKED_EXTENSIONS};
