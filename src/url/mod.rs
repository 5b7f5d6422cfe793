//! URL handling module for sitesnap
//!
//! This module provides URL normalization, the base-origin scope test and
//! the artifact file-name encoding.

mod filename;
mod normalize;
mod scope;

pub use filename::artifact_name;
pub use normalize::normalize_url;
pub use scope::Scope;
