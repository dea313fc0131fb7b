//! Integration tests for the lexer over whole pages.

use pagelex_html::{LexError, Lexer, Node, NodeKind, Page};
use quickcheck_macros::quickcheck;

/// Lex `input` to the end, returning the nodes and the page.
fn lex_with(input: &str, quotesmart: bool) -> (Vec<Node>, Page) {
    let mut lexer = Lexer::new(Page::from_text_with_charset(input, "UTF-8"));
    let nodes = lexer
        .nodes()
        .quotesmart(quotesmart)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    (nodes, lexer.into_page())
}

fn describe(input: &str) -> Vec<(NodeKind, String)> {
    let (nodes, page) = lex_with(input, false);
    nodes
        .iter()
        .map(|node| (node.kind(), node.source_text(&page).unwrap()))
        .collect()
}

/// What the page should hold after reading `input`: line terminators
/// collapsed to LF and a leading byte order mark dropped.
fn normalized(input: &str) -> String {
    let text = input.replace("\r\n", "\n").replace('\r', "\n");
    text.strip_prefix('\u{feff}').map_or(text.clone(), str::to_string)
}

#[quickcheck]
fn prop_nodes_tile_the_input(input: String, quotesmart: bool) -> bool {
    let (nodes, page) = lex_with(&input, quotesmart);
    let mut expected_start = 0;
    let mut rebuilt = String::new();
    for node in &nodes {
        if node.start() != expected_start || node.end() <= node.start() {
            return false;
        }
        expected_start = node.end();
        rebuilt.push_str(&node.source_text(&page).unwrap());
    }
    expected_start == page.fill_offset() && rebuilt == normalized(&input)
}

#[quickcheck]
fn prop_line_count_matches_terminators(pieces: Vec<(String, u8)>) -> bool {
    let mut input = String::new();
    for (piece, terminator) in pieces {
        input.push_str(&piece);
        input.push_str(match terminator % 4 {
            0 => "\n",
            1 => "\r",
            2 => "\r\n",
            _ => "",
        });
    }
    let (_, page) = lex_with(&input, false);
    let text = normalized(&input);
    if page.index().count() != text.matches('\n').count() {
        return false;
    }
    let mut line = 0;
    let mut line_start = 0;
    for (offset, c) in text.chars().enumerate() {
        if page.row(offset) != line || page.column(offset) != offset - line_start {
            return false;
        }
        if c == '\n' {
            line += 1;
            line_start = offset + 1;
        }
    }
    true
}

#[test]
fn test_lone_less_than_at_end_is_text() {
    assert_eq!(describe("<"), [(NodeKind::Text, "<".to_string())]);
    assert_eq!(describe("a<"), [(NodeKind::Text, "a<".to_string())]);
    assert_eq!(describe("<!"), [(NodeKind::Text, "<!".to_string())]);
}

#[test]
fn test_mixed_document() {
    let input = "<!DOCTYPE html>\n<html><!-- c --><body class=main>Hi &amp; <% x %></body>";
    let kinds: Vec<_> = describe(input).into_iter().map(|(kind, _)| kind).collect();
    assert_eq!(
        kinds,
        [
            NodeKind::Tag,
            NodeKind::Text,
            NodeKind::Tag,
            NodeKind::Remark,
            NodeKind::Tag,
            NodeKind::Text,
            NodeKind::Tag,
            NodeKind::Tag,
        ]
    );
}

#[test]
fn test_attribute_lookup() {
    let (nodes, page) = lex_with(r#"<A HREF = "x" TARGET=_top checked>"#, false);
    let tag = nodes[0].as_tag().unwrap();
    assert_eq!(tag.name(&page).unwrap(), "A");
    assert_eq!(tag.attribute_value(&page, "href").unwrap().as_deref(), Some("x"));
    assert_eq!(tag.attribute_value(&page, "Target").unwrap().as_deref(), Some("_top"));
    assert_eq!(tag.attribute_value(&page, "CHECKED").unwrap().as_deref(), Some(""));
    assert_eq!(tag.attribute_value(&page, "missing").unwrap(), None);
    let names: Vec<_> = tag
        .attributes()
        .map(|a| a.name(&page).unwrap().unwrap())
        .collect();
    assert_eq!(names, ["A", "HREF", "TARGET", "checked"]);
}

#[test]
fn test_end_and_empty_tags() {
    let (nodes, page) = lex_with("</p><br/>", false);
    let end = nodes[0].as_tag().unwrap();
    assert!(end.is_end_tag(&page).unwrap());
    assert_eq!(end.name(&page).unwrap(), "P");
    let br = nodes[1].as_tag().unwrap();
    assert!(br.is_empty_xml_tag(&page).unwrap());
}

#[test]
fn test_malformed_comment_is_text() {
    assert_eq!(
        describe("<!-x-->y"),
        [(NodeKind::Text, "<!-x-->y".to_string())]
    );
}

#[test]
fn test_bang_without_dashes_is_a_tag_not_a_remark() {
    let (nodes, page) = lex_with("<!not-a-comment>x", false);
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].kind(), NodeKind::Tag);
    assert_eq!(nodes[0].source_text(&page).unwrap(), "<!not-a-comment>");
    assert_eq!(nodes[1].kind(), NodeKind::Text);
    assert!(nodes.iter().all(|node| node.kind() != NodeKind::Remark));
}

#[test]
fn test_line_numbers_follow_lexing() {
    let mut lexer = Lexer::new(Page::from_text_with_charset("a\r\nb\rc\n<p>", "UTF-8"));
    let text = lexer.next_node().unwrap().unwrap();
    assert_eq!(text.source_text(lexer.page()).unwrap(), "a\nb\nc\n");
    assert_eq!(lexer.current_line_number(), 3);
    let tag = lexer.next_node().unwrap().unwrap();
    assert_eq!(lexer.page().row(tag.start()), 3);
    assert_eq!(lexer.page().column(tag.end()), 3);
    assert_eq!(lexer.page().line(2).unwrap(), "b");
    assert_eq!(lexer.current_line().unwrap(), "<p>");
}

#[test]
fn test_reset_replays_same_nodes() {
    let mut lexer = Lexer::new(Page::from_text_with_charset("x<b>y</b>", "UTF-8"));
    let first: Vec<_> = lexer.nodes().map(Result::unwrap).collect();
    lexer.reset();
    let second: Vec<_> = lexer.nodes().map(Result::unwrap).collect();
    assert_eq!(first, second);
}

#[test]
fn test_future_read_is_an_error() {
    let mut page = Page::from_text_with_charset("abc", "UTF-8");
    let mut cursor = page.cursor(2);
    assert!(matches!(
        page.character(&mut cursor),
        Err(LexError::FutureRead { position: 2, offset: 0 })
    ));
    assert!(page.text(0, 1).is_err());

    let mut lexer = Lexer::new(page);
    assert!(matches!(
        lexer.set_position(1),
        Err(LexError::FutureRead { position: 1, offset: 0 })
    ));
    let _ = lexer.next_node().unwrap();
    lexer.set_position(1).unwrap();
    assert_eq!(
        lexer.next_node().unwrap().unwrap().source_text(lexer.page()).unwrap(),
        "bc"
    );
}

#[test]
fn test_node_from_other_page() {
    let (nodes, _) = lex_with("<p>", false);
    let other = Page::from_text_with_charset("<p>", "UTF-8");
    assert!(matches!(nodes[0].source_text(&other), Err(LexError::ForeignPage)));
}

#[test]
fn test_encoding_mismatch_leaves_page_unchanged() {
    let bytes = "d\u{e9}j\u{e0}".as_bytes().to_vec();
    let mut page = Page::from_bytes(bytes, Some("ISO-8859-1")).unwrap();
    let mut cursor = page.cursor(0);
    while page.character(&mut cursor).unwrap().is_some() {}
    let before = page.text_to_fill().unwrap();

    let err = page.set_encoding("UTF-8").unwrap_err();
    assert!(err.is_encoding_change(), "{err}");
    assert!(matches!(err, LexError::EncodingChange { position: 1, .. }));
    assert_eq!(page.text_to_fill().unwrap(), before);
    assert_eq!(page.encoding(), "windows-1252");
}

#[test]
fn test_encoding_switch_before_divergence() {
    let bytes = "ab\u{e9}".as_bytes().to_vec();
    let mut page = Page::from_bytes(bytes, Some("ISO-8859-1")).unwrap();
    let mut cursor = page.cursor(0);
    assert_eq!(page.character(&mut cursor).unwrap(), Some('a'));
    assert_eq!(page.character(&mut cursor).unwrap(), Some('b'));

    page.set_encoding("utf-8").unwrap();
    assert_eq!(page.encoding(), "UTF-8");
    assert_eq!(page.character(&mut cursor).unwrap(), Some('\u{e9}'));
    assert_eq!(page.character(&mut cursor).unwrap(), None);
    page.set_encoding("UTF-8").unwrap();
}
