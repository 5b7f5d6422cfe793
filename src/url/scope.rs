use crate::url::normalize::normalize_url;
use crate::UrlResult;
use url::Url;

/// Crawl boundary: a normalized URL prefix
///
/// A URL is in scope iff its normalized form starts with the normalized
/// base origin. Anything that fails to normalize is out of scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    prefix: String,
}

impl Scope {
    /// Creates a scope from a base origin such as `https://example.com/docs/`
    pub fn new(base_origin: &str) -> UrlResult<Self> {
        let base = normalize_url(base_origin)?;
        Ok(Self {
            prefix: base.into(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Tests an already normalized URL
    pub fn contains(&self, url: &Url) -> bool {
        url.as_str().starts_with(&self.prefix)
    }

    /// Normalizes `raw` and tests it; malformed input is simply out of scope
    pub fn contains_str(&self, raw: &str) -> bool {
        normalize_url(raw)
            .map(|url| self.contains(&url))
            .unwrap_or(false)
    }
}
