use sha2::{Digest, Sha256};
use url::Url;

/// Maximum length of the readable part of an artifact name
const MAX_SLUG_LEN: usize = 80;

/// Number of hex characters of the URL digest appended to the slug
const DIGEST_LEN: usize = 16;

/// Derives a deterministic, filesystem-safe artifact stem for a URL
///
/// The stem is a readable slug of the URL (scheme dropped, ASCII
/// alphanumerics kept, any other run of characters folded to `_`, capped at
/// 80 characters) followed by `-` and 64 bits of the SHA-256 of the full
/// URL. The slug alone collides easily (`/a-b` and `/a_b`); the digest
/// makes the name unique.
///
/// # Examples
///
/// ```
/// use sitesnap::url::{artifact_name, normalize_url};
///
/// let url = normalize_url("https://example.com/docs/intro?lang=en").unwrap();
/// let name = artifact_name(&url);
/// assert!(name.starts_with("example_com_docs_intro_lang_en-"));
/// assert_eq!(name, artifact_name(&url));
/// ```
pub fn artifact_name(url: &Url) -> String {
    let full = url.as_str();
    let without_scheme = full
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(full);

    let mut slug = String::with_capacity(MAX_SLUG_LEN);
    let mut pending_separator = false;
    for c in without_scheme.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }
    slug.truncate(MAX_SLUG_LEN);
    if slug.is_empty() {
        slug.push_str("page");
    }

    let digest = hex::encode(Sha256::digest(full.as_bytes()));
    format!("{}-{}", slug, &digest[..DIGEST_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::normalize_url;
    use std::collections::HashSet;

    fn name(raw: &str) -> String {
        artifact_name(&normalize_url(raw).unwrap())
    }

    #[test]
    fn test_slug_shape() {
        let n = name("https://example.com/docs/getting-started/");
        assert!(n.starts_with("example_com_docs_getting_started-"));
        assert_eq!(n.len(), "example_com_docs_getting_started".len() + 1 + DIGEST_LEN);
    }

    #[test]
    fn test_filesystem_safe() {
        let corpus = [
            "https://example.com/",
            "https://example.com/a b/ü?q=%2F..%2F&x=<y>",
            "https://example.com/..%2F..%2Fetc%2Fpasswd",
            "https://example.com/C:\\windows",
            "https://example.com/%00",
        ];
        for raw in corpus {
            let n = name(raw);
            assert!(
                n.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
                "unsafe name {} for {}",
                n,
                raw
            );
            assert!(!n.starts_with('.'));
        }
    }

    #[test]
    fn test_long_urls_are_capped() {
        let long = format!("https://example.com/{}", "segment/".repeat(100));
        let n = name(&long);
        assert!(n.len() <= MAX_SLUG_LEN + 1 + DIGEST_LEN);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(
            name("https://example.com/a?b=1"),
            name("https://example.com/a?b=1")
        );
    }

    #[test]
    fn test_unique_across_corpus() {
        // Pairs that fold to the same slug must still get distinct names
        let corpus = [
            "https://example.com/",
            "http://example.com/",
            "https://example.com/a-b",
            "https://example.com/a_b",
            "https://example.com/a/b",
            "https://example.com/a.b",
            "https://example.com/a/b/",
            "https://example.com/a?b",
            "https://example.com/A/B",
            "https://example.com/a%20b",
            "https://example.com/a+b",
            "https://example.com:8080/a/b",
            "https://sub.example.com/a/b",
            "https://example.com/page?id=1",
            "https://example.com/page?id=2",
            "https://example.com/page?id=10",
            "https://example.com/page/id/1",
        ];

        let names: HashSet<String> = corpus.iter().map(|raw| name(raw)).collect();
        assert_eq!(names.len(), corpus.len());
    }

    #[test]
    fn test_truncated_slugs_still_unique() {
        let prefix = format!("https://example.com/{}", "x".repeat(200));
        let a = name(&format!("{}/one", prefix));
        let b = name(&format!("{}/two", prefix));
        assert_ne!(a, b);
        assert_eq!(a[..MAX_SLUG_LEN], b[..MAX_SLUG_LEN]);
    }
}
