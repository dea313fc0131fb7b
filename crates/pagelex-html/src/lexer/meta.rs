//! Tags that change how the rest of the page is read: `<meta>` charset
//! declarations and `<base href>`.

use pagelex_common::warning::warn_once;

use crate::charset::{self, EncodingRegistry};
use crate::error::{LexError, Result};
use crate::node::{Attribute, NodeFactory};

use super::dispatch::Lexer;

impl<F: NodeFactory> Lexer<F> {
    /// Act on a tag about to be handed to the node factory.
    ///
    /// `attributes[0]` holds the tag name.
    pub(super) fn apply_document_hints(&mut self, attributes: &[Attribute]) -> Result<()> {
        let Some(name) = attributes.first().map(|a| a.name(&self.page)).transpose()?.flatten() else {
            return Ok(());
        };
        if name.eq_ignore_ascii_case("base") {
            if let Some(href) = self.hint_value(attributes, "href")? {
                let base = self.page.absolute_url(href.trim());
                log::debug!(target: "pagelex::lexer", "base URL {base}");
                self.page.set_base_url(base);
            }
        } else if name.eq_ignore_ascii_case("meta") && self.follow_meta_charset {
            if let Some(declared) = self.declared_charset(attributes)? {
                self.switch_charset(&declared)?;
            }
        }
        Ok(())
    }

    /// The charset a `<meta>` tag declares, either directly or through an
    /// `http-equiv="Content-Type"` content value.
    fn declared_charset(&self, attributes: &[Attribute]) -> Result<Option<String>> {
        if let Some(declared) = self.hint_value(attributes, "charset")? {
            return Ok(Some(declared.trim().to_string()));
        }
        let is_content_type = self
            .hint_value(attributes, "http-equiv")?
            .is_some_and(|equiv| equiv.trim().eq_ignore_ascii_case("content-type"));
        if !is_content_type {
            return Ok(None);
        }
        let content = self.hint_value(attributes, "content")?;
        let current = self.page.encoding();
        let declared = charset::charset_from_content_type(&EncodingRegistry, content.as_deref(), current);
        Ok((declared != current).then_some(declared))
    }

    /// Switch the page to `declared`, reading UTF-16 labels as UTF-8 since a
    /// page that got this far is not UTF-16 encoded.
    fn switch_charset(&mut self, declared: &str) -> Result<()> {
        let Some(encoding) = charset::lookup(declared) else {
            let _ = warn_once("Page", &format!("ignoring unknown meta charset {declared}"));
            return Ok(());
        };
        let target = encoding.output_encoding().name();
        if target == self.page.encoding() {
            return Ok(());
        }
        log::debug!(
            target: "pagelex::lexer",
            "meta charset switches {} to {target}",
            self.page.encoding()
        );
        match self.page.set_encoding(target) {
            Err(LexError::UnsupportedRewind | LexError::UnsupportedCharset(_)) => {
                let _ = warn_once(
                    "Page",
                    &format!("cannot switch to meta charset {target}; keeping {}", self.page.encoding()),
                );
                Ok(())
            }
            other => other,
        }
    }

    /// Value of the attribute called `name` (ASCII case-insensitive), skipping
    /// the tag name. A standalone attribute has the empty value.
    fn hint_value(&self, attributes: &[Attribute], name: &str) -> Result<Option<String>> {
        for attribute in attributes.iter().skip(1).filter(|a| !a.is_whitespace()) {
            let Some(found) = attribute.name(&self.page)? else {
                continue;
            };
            if found.eq_ignore_ascii_case(name) {
                return Ok(Some(attribute.value(&self.page)?.unwrap_or_default()));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::LexError;
    use crate::lexer::Lexer;
    use crate::page::Page;
    use crate::stream::Stream;

    fn drain(lexer: &mut Lexer) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(node) = lexer.next_node().unwrap() {
            out.push(node.source_text(lexer.page()).unwrap());
        }
        out
    }

    #[test]
    fn test_base_href_sets_base_url() {
        let mut page = Page::from_text_with_charset("<base href=\"/docs/\"><a href=x>", "UTF-8");
        page.set_url("http://example.com/index.html");
        let mut lexer = Lexer::new(page);
        let _ = drain(&mut lexer);
        assert_eq!(lexer.page().base_url(), Some("http://example.com/docs/"));
        assert_eq!(lexer.page().absolute_url("x"), "http://example.com/docs/x");
    }

    #[test]
    fn test_meta_charset_ignored_by_default() {
        let page = Page::from_bytes(b"<meta charset=utf-8>".to_vec(), Some("ISO-8859-1")).unwrap();
        let mut lexer = Lexer::new(page);
        let _ = drain(&mut lexer);
        assert_eq!(lexer.page().encoding(), "windows-1252");
    }

    #[test]
    fn test_meta_charset_switches_encoding() {
        let bytes = "<meta charset=\"utf-8\"><p>caf\u{e9}".as_bytes().to_vec();
        let page = Page::from_bytes(bytes, Some("ISO-8859-1")).unwrap();
        let mut lexer = Lexer::new(page);
        lexer.set_follow_meta_charset(true);
        let nodes = drain(&mut lexer);
        assert_eq!(lexer.page().encoding(), "UTF-8");
        assert_eq!(nodes.last().map(String::as_str), Some("caf\u{e9}"));
    }

    #[test]
    fn test_http_equiv_content_type() {
        let input = "<META HTTP-EQUIV=\"Content-Type\" CONTENT=\"text/html; charset=UTF-16\">";
        let page = Page::from_bytes(input.as_bytes().to_vec(), Some("ISO-8859-1")).unwrap();
        let mut lexer = Lexer::new(page);
        lexer.set_follow_meta_charset(true);
        let _ = drain(&mut lexer);
        assert_eq!(lexer.page().encoding(), "UTF-8");
    }

    #[test]
    fn test_unknown_charset_only_warns() {
        let page = Page::from_bytes(b"<meta charset=klingon>x".to_vec(), Some("UTF-8")).unwrap();
        let mut lexer = Lexer::new(page);
        lexer.set_follow_meta_charset(true);
        assert_eq!(drain(&mut lexer), ["<meta charset=klingon>", "x"]);
        assert_eq!(lexer.page().encoding(), "UTF-8");
    }

    #[test]
    fn test_unrewindable_stream_only_warns() {
        let stream = Stream::unbuffered(&b"<meta charset=utf-8>x"[..]);
        let page = Page::from_stream(stream, Some("ISO-8859-1")).unwrap();
        let mut lexer = Lexer::new(page);
        lexer.set_follow_meta_charset(true);
        assert_eq!(drain(&mut lexer), ["<meta charset=utf-8>", "x"]);
        assert_eq!(lexer.page().encoding(), "windows-1252");
    }

    #[test]
    fn test_mismatch_propagates() {
        let bytes = "caf\u{e9}<meta charset=utf-8>".as_bytes().to_vec();
        let page = Page::from_bytes(bytes, Some("ISO-8859-1")).unwrap();
        let mut lexer = Lexer::new(page);
        lexer.set_follow_meta_charset(true);
        assert_eq!(
            lexer.next_node().unwrap().unwrap().source_text(lexer.page()).unwrap(),
            "caf\u{c3}\u{a9}"
        );
        let err = lexer.next_node().unwrap_err();
        assert!(matches!(err, LexError::EncodingChange { .. }), "{err}");
        assert_eq!(lexer.page().encoding(), "windows-1252");
    }
}
