//! Configuration module for sitesnap
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sitesnap::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sitesnap.toml")).unwrap();
//! println!("Each page gets {} attempts", config.crawler.max_retry);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CaptureConfig, Config, CrawlerConfig, OutputConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
