//! Outbound link extraction from captured markup
//!
//! **Include:** `<a href="...">` anywhere in the document, in document order.
//!
//! **Exclude:**
//! - `<a href="..." download>`
//! - `javascript:`, `mailto:`, `tel:` links
//! - Data URIs
//! - Fragment-only links (same page anchors)
//! - Anything that does not resolve to an http(s) URL

use scraper::{Html, Selector};
use url::Url;

/// Extracts every followable link from `html`, resolved against `page_url`
///
/// Duplicates are kept; the frontier decides what is new.
///
/// # Example
///
/// ```
/// use sitesnap::capture::extract_links;
/// use url::Url;
///
/// let html = r#"<a href="/b">B</a><a href="mailto:x@example.com">mail</a><a href="c">C</a>"#;
/// let page = Url::parse("https://example.com/a/").unwrap();
/// assert_eq!(
///     extract_links(html, &page),
///     vec!["https://example.com/b", "https://example.com/a/c"]
/// );
/// ```
pub fn extract_links(html: &str, page_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let base = document_base(&document, page_url);

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, &base))
        .collect()
}

/// Honors `<base href>` when present
fn document_base(document: &Html, page_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|element| element.value().attr("href"))
                .and_then(|href| page_url.join(href.trim()).ok())
        })
        .unwrap_or_else(|| page_url.clone())
}

/// Resolves a link href to an absolute URL and validates it
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(absolute_url.to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    #[test]
    fn test_extract_absolute_link() {
        let html = r#"<html><body><a href="https://other.com/page">Link</a></body></html>"#;
        assert_eq!(extract_links(html, &base_url()), vec!["https://other.com/page"]);
    }

    #[test]
    fn test_extract_relative_links() {
        let html = r#"<a href="/other">Root</a><a href="sibling">Sibling</a>"#;
        assert_eq!(
            extract_links(html, &base_url()),
            vec!["https://example.com/other", "https://example.com/sibling"]
        );
    }

    #[test]
    fn test_document_order_and_duplicates_kept() {
        let html = r#"
            <nav><a href="/z">Z</a></nav>
            <main><a href="/a">A</a><a href="/z">Z again</a></main>
            <footer><a href="/m">M</a></footer>
        "#;
        assert_eq!(
            extract_links(html, &base_url()),
            vec![
                "https://example.com/z",
                "https://example.com/a",
                "https://example.com/z",
                "https://example.com/m",
            ]
        );
    }

    #[test]
    fn test_skip_special_schemes() {
        let html = r#"
            <a href="javascript:void(0)">js</a>
            <a href="JavaScript:alert(1)">js upper</a>
            <a href="mailto:test@example.com">Email</a>
            <a href="tel:+1234567890">Call</a>
            <a href="data:text/html,<h1>Test</h1>">Data</a>
            <a href="ftp://example.com/file">FTP</a>
        "#;
        assert!(extract_links(html, &base_url()).is_empty());
    }

    #[test]
    fn test_skip_fragment_only_and_empty() {
        let html = r##"<a href="#section">Jump</a><a href="">Empty</a><a href="   ">Blank</a>"##;
        assert!(extract_links(html, &base_url()).is_empty());
    }

    #[test]
    fn test_fragment_on_other_page_is_kept() {
        let html = r##"<a href="/other#section">Other</a>"##;
        assert_eq!(
            extract_links(html, &base_url()),
            vec!["https://example.com/other#section"]
        );
    }

    #[test]
    fn test_skip_download_link() {
        let html = r#"<a href="/file.pdf" download>Download</a>"#;
        assert!(extract_links(html, &base_url()).is_empty());
    }

    #[test]
    fn test_follow_nofollow_links() {
        let html = r#"<a href="/page" rel="nofollow">Link</a>"#;
        assert_eq!(extract_links(html, &base_url()), vec!["https://example.com/page"]);
    }

    #[test]
    fn test_anchor_without_href_ignored() {
        let html = r#"<a name="top">Top</a><a href="/x">X</a>"#;
        assert_eq!(extract_links(html, &base_url()), vec!["https://example.com/x"]);
    }

    #[test]
    fn test_base_element_respected() {
        let html = r#"<head><base href="https://example.com/docs/"></head><a href="intro">Intro</a>"#;
        assert_eq!(
            extract_links(html, &base_url()),
            vec!["https://example.com/docs/intro"]
        );
    }
}
