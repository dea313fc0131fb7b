//! Base-URL resolution for links found in a page.
//!
//! Parsing and joining follow the URL Standard through the `url` crate.

use url::Url;

/// Returns true if `href` is an absolute URL, i.e. it parses on its own with
/// a scheme.
#[must_use]
pub fn has_scheme(href: &str) -> bool {
    Url::parse(href.trim()).is_ok()
}

/// Resolve a potentially relative link against a base URL.
///
/// With no base, or a base that does not parse, the link is returned as
/// given.
///
/// ```
/// use pagelex_common::url::resolve_url;
///
/// let base = Some("http://example.com/docs/guide/index.html");
/// assert_eq!(resolve_url("../api.html", base), "http://example.com/docs/api.html");
/// assert_eq!(resolve_url("/top", base), "http://example.com/top");
/// assert_eq!(resolve_url("//cdn.example.com/x.js", base), "http://cdn.example.com/x.js");
/// ```
#[must_use]
pub fn resolve_url(href: &str, base_url: Option<&str>) -> String {
    let href = href.trim();
    let Some(base) = base_url else {
        return href.to_string();
    };
    match Url::parse(base).and_then(|base| base.join(href)) {
        Ok(url) => url.into(),
        Err(e) => {
            log::debug!(target: "pagelex::url", "cannot resolve {href:?} against {base:?}: {e}");
            href.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://example.com/a/b/page.html?q=1#top";

    #[test]
    fn test_absolute_link_is_unchanged() {
        assert_eq!(resolve_url("https://other.org/x", Some(BASE)), "https://other.org/x");
        assert_eq!(resolve_url("mailto:me@example.com", Some(BASE)), "mailto:me@example.com");
    }

    #[test]
    fn test_relative_links() {
        assert_eq!(resolve_url("c.html", Some(BASE)), "http://example.com/a/b/c.html");
        assert_eq!(resolve_url("./c.html", Some(BASE)), "http://example.com/a/b/c.html");
        assert_eq!(resolve_url("../../../c.html", Some(BASE)), "http://example.com/c.html");
        assert_eq!(resolve_url("sub/", Some(BASE)), "http://example.com/a/b/sub/");
    }

    #[test]
    fn test_query_and_fragment_links() {
        assert_eq!(resolve_url("?q=2", Some(BASE)), "http://example.com/a/b/page.html?q=2");
        assert_eq!(resolve_url("#end", Some(BASE)), "http://example.com/a/b/page.html?q=1#end");
        assert_eq!(resolve_url("c.html#x", Some(BASE)), "http://example.com/a/b/c.html#x");
    }

    #[test]
    fn test_links_are_normalized() {
        let base = Some("http://example.com/dir/index.html");
        assert_eq!(resolve_url("a b.html", base), "http://example.com/dir/a%20b.html");
        assert_eq!(resolve_url("..\\x.html", base), "http://example.com/x.html");
        assert_eq!(resolve_url("//cdn.example.com", base), "http://cdn.example.com/");
    }

    #[test]
    fn test_base_without_path() {
        assert_eq!(resolve_url("x.html", Some("http://example.com")), "http://example.com/x.html");
    }

    #[test]
    fn test_no_base() {
        assert_eq!(resolve_url("x.html", None), "x.html");
        assert_eq!(resolve_url("x.html", Some("not a url")), "x.html");
    }

    #[test]
    fn test_has_scheme() {
        assert!(has_scheme("svn+ssh://host"));
        assert!(has_scheme("data:text/html,hi"));
        assert!(!has_scheme(""));
        assert!(!has_scheme("1http://x"));
        assert!(!has_scheme("/a:b"));
        assert!(!has_scheme("./page.html"));
    }
}
