//! Integration tests for substituting the node factory.

use std::io;

use pagelex_html::{Attribute, LexError, Lexer, NodeFactory, Page, Result};

/// Builds owned summaries instead of span-based nodes.
#[derive(Debug, Default)]
struct Summaries {
    made: usize,
}

#[derive(Debug, PartialEq, Eq)]
enum Summary {
    Text(String),
    Comment(String),
    Tag { name: String, attributes: usize },
}

impl NodeFactory for Summaries {
    type Node = Summary;

    fn make_text(&mut self, page: &Page, start: usize, end: usize) -> Result<Summary> {
        self.made += 1;
        Ok(Summary::Text(page.text(start, end)?))
    }

    fn make_comment(&mut self, page: &Page, start: usize, end: usize) -> Result<Summary> {
        self.made += 1;
        Ok(Summary::Comment(page.text(start + 4, end.saturating_sub(3).max(start + 4))?))
    }

    fn make_tag(
        &mut self,
        page: &Page,
        _start: usize,
        _end: usize,
        attributes: Vec<Attribute>,
    ) -> Result<Summary> {
        self.made += 1;
        let name = attributes[0].name(page)?.unwrap_or_default();
        let attributes = attributes.iter().skip(1).filter(|a| !a.is_whitespace()).count();
        Ok(Summary::Tag { name, attributes })
    }
}

/// Refuses to build tags.
struct NoTags;

impl NodeFactory for NoTags {
    type Node = ();

    fn make_text(&mut self, _page: &Page, _start: usize, _end: usize) -> Result<()> {
        Ok(())
    }

    fn make_comment(&mut self, _page: &Page, _start: usize, _end: usize) -> Result<()> {
        Ok(())
    }

    fn make_tag(
        &mut self,
        _page: &Page,
        _start: usize,
        _end: usize,
        _attributes: Vec<Attribute>,
    ) -> Result<()> {
        Err(LexError::Io(io::Error::other("tags not allowed")))
    }
}

#[test]
fn test_custom_factory_sees_every_node() {
    let page = Page::from_text_with_charset("<p id=a class=b>hi<!-- note --></p>", "UTF-8");
    let mut lexer = Lexer::with_factory(page, Summaries::default());
    let nodes = lexer.nodes().collect::<Result<Vec<_>>>().unwrap();
    assert_eq!(
        nodes,
        [
            Summary::Tag { name: "p".to_string(), attributes: 2 },
            Summary::Text("hi".to_string()),
            Summary::Comment(" note ".to_string()),
            Summary::Tag { name: "/p".to_string(), attributes: 0 },
        ]
    );
    assert_eq!(lexer.node_factory().made, 4);

    let old = lexer.set_node_factory(Summaries::default());
    assert_eq!(old.made, 4);
    assert_eq!(lexer.node_factory().made, 0);
}

#[test]
fn test_factory_error_stops_iteration() {
    let page = Page::from_text_with_charset("a<b>c", "UTF-8");
    let mut lexer = Lexer::with_factory(page, NoTags);
    let results: Vec<_> = lexer.nodes().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(LexError::Io(_))));
}
