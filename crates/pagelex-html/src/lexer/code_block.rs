//! Server-side code blocks, `<% ... %>`, and processing instructions,
//! `<? ... ?>`.
//!
//! Both scan to their closing delimiter, skipping over quoted strings so that
//! a `%>` inside a string literal does not close the block. The resulting tag
//! has three entries: the opener (`%`, `%=`, `%@` or `?`), the body, and the
//! closing `%` or `?`. A block that never closes is rescanned as text.

use strum_macros::Display;

use crate::cursor::Cursor;
use crate::error::Result;
use crate::node::{Attribute, NodeFactory, Span};

use super::dispatch::Lexer;

/// Which kind of directive is being scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Directive {
    /// `<% ... %>`, optionally `<%= ... %>` or `<%@ ... %>`.
    Code,
    /// `<? ... ?>`, also closed by a bare `>`.
    Instruction,
}

impl Directive {
    /// The character after `<` and before the closing `>`.
    #[must_use]
    pub const fn marker(self) -> char {
        match self {
            Self::Code => '%',
            Self::Instruction => '?',
        }
    }
}

/// States of the directive scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DirectiveState {
    /// Just past `<%`; an `=` or `@` may follow.
    Qualifier,
    /// In the body.
    Body,
    /// Just read the marker; a `>` closes.
    Closing,
    /// Inside a string opened by the given quote.
    Quoted(char),
}

/// What the directive scanner does with one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveAction {
    /// Keep scanning.
    Continue,
    /// A qualifier; the body starts after it.
    Qualified,
    /// No qualifier; the body starts at this character, which is rescanned.
    Unqualified,
    /// Not part of a close after all; rescan this character in the body.
    Reconsume,
    /// Closed by marker and `>`.
    Close,
    /// Closed by a bare `>`.
    CloseBare,
    /// No close before end of input; the input is text.
    Abort,
}

/// One transition of the directive scanner. `None` is end of input.
#[must_use]
pub fn step(
    kind: Directive,
    state: DirectiveState,
    c: Option<char>,
) -> (DirectiveState, DirectiveAction) {
    use DirectiveState::{Body, Closing, Qualifier, Quoted};

    let Some(c) = c else {
        return (state, DirectiveAction::Abort);
    };
    match (state, c) {
        (Qualifier, '>') => (state, DirectiveAction::Abort),
        (Qualifier, '=' | '@') => (Body, DirectiveAction::Qualified),
        (Qualifier, _) => (Body, DirectiveAction::Unqualified),

        (Body, '>') if kind == Directive::Instruction => (Body, DirectiveAction::CloseBare),
        (Body, '\'' | '"') => (Quoted(c), DirectiveAction::Continue),
        (Body | Closing, c) if c == kind.marker() => (Closing, DirectiveAction::Continue),
        (Closing, '>') => (Closing, DirectiveAction::Close),
        (Closing, _) => (Body, DirectiveAction::Reconsume),

        (Quoted(quote), c) if c == quote => (Body, DirectiveAction::Continue),
        (Body | Quoted(_), _) => (state, DirectiveAction::Continue),
    }
}

impl<F: NodeFactory> Lexer<F> {
    /// Scan a directive at `start`; `cursor` is just past the marker.
    pub(super) fn scan_directive(
        &mut self,
        start: usize,
        mut cursor: Cursor,
        kind: Directive,
        quotesmart: bool,
    ) -> Result<Option<F::Node>> {
        let mut state = match kind {
            Directive::Code => DirectiveState::Qualifier,
            Directive::Instruction => DirectiveState::Body,
        };
        let mut code = cursor.position();
        let closed_by_marker = loop {
            let at = cursor.position();
            let c = self.read(&mut cursor)?;
            let (next, action) = step(kind, state, c);
            match action {
                DirectiveAction::Continue => {}
                DirectiveAction::Qualified => code = cursor.position(),
                DirectiveAction::Unqualified => {
                    code = at;
                    cursor.retreat();
                }
                DirectiveAction::Reconsume => cursor.retreat(),
                DirectiveAction::Close => break true,
                DirectiveAction::CloseBare => break false,
                DirectiveAction::Abort => {
                    log::trace!(target: "pagelex::lexer", "unclosed {kind} directive at {start}");
                    let resume = self.page.cursor(start + 1);
                    return self.scan_text(start, resume, quotesmart);
                }
            }
            state = next;
        };

        let end = cursor.position();
        let mut attributes = vec![Attribute::standalone(Span::new(start + 1, code))];
        if closed_by_marker {
            attributes.push(Attribute::standalone(Span::new(code, end - 2)));
            attributes.push(Attribute::standalone(Span::new(end - 2, end - 1)));
        } else {
            attributes.push(Attribute::standalone(Span::new(code, end - 1)));
        }
        self.cursor = cursor;
        self.make_tag(start, end, attributes).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, NodeKind};
    use crate::page::Page;

    fn first(input: &str, instructions: bool) -> (Node, Page) {
        let mut lexer = Lexer::new(Page::from_text_with_charset(input, "UTF-8"));
        lexer.set_processing_instructions(instructions);
        let node = lexer.next_node().unwrap().unwrap();
        (node, lexer.into_page())
    }

    fn parts(node: &Node, page: &Page) -> Vec<String> {
        node.as_tag()
            .unwrap()
            .raw_attributes()
            .iter()
            .map(|a| a.name(page).unwrap().unwrap())
            .collect()
    }

    #[test]
    fn test_code_block_parts() {
        let (node, page) = first("<%= user.name %>tail", false);
        assert_eq!(node.source_text(&page).unwrap(), "<%= user.name %>");
        assert_eq!(parts(&node, &page), ["%=", " user.name ", "%"]);
        assert!(node.as_tag().unwrap().is_code_block(&page).unwrap());

        let (node, page) = first("<%@ page %>", false);
        assert_eq!(parts(&node, &page), ["%@", " page ", "%"]);

        let (node, page) = first("<%x%>", false);
        assert_eq!(parts(&node, &page), ["%", "x", "%"]);

        let (node, page) = first("<%%>", false);
        assert_eq!(parts(&node, &page), ["%", "", "%"]);
    }

    #[test]
    fn test_quotes_hide_close() {
        let (node, page) = first(r#"<% s = "%>"; if (a > b) %>x"#, false);
        assert_eq!(node.source_text(&page).unwrap(), r#"<% s = "%>"; if (a > b) %>"#);
    }

    #[test]
    fn test_repeated_marker_before_close() {
        let (node, page) = first("<% a %%>", false);
        assert_eq!(parts(&node, &page), ["%", " a %", "%"]);
    }

    #[test]
    fn test_unclosed_block_is_text() {
        let (node, page) = first("<% never closed <b>", false);
        assert_eq!(node.kind(), NodeKind::Text);
        assert_eq!(node.source_text(&page).unwrap(), "<% never closed ");

        let (node, page) = first("<%>", false);
        assert_eq!(node.kind(), NodeKind::Text);
        assert_eq!(node.source_text(&page).unwrap(), "<%>");
    }

    #[test]
    fn test_processing_instruction() {
        let (node, page) = first("<?xml version='1.0'?>", true);
        assert_eq!(parts(&node, &page), ["?", "xml version='1.0'", "?"]);

        let (node, page) = first("<?php echo 1 >", true);
        assert_eq!(node.source_text(&page).unwrap(), "<?php echo 1 >");
        assert_eq!(parts(&node, &page), ["?", "php echo 1 "]);
    }

    #[test]
    fn test_step() {
        assert_eq!(
            step(Directive::Code, DirectiveState::Body, Some('>')),
            (DirectiveState::Body, DirectiveAction::Continue)
        );
        assert_eq!(
            step(Directive::Code, DirectiveState::Closing, Some('%')),
            (DirectiveState::Closing, DirectiveAction::Continue)
        );
        assert_eq!(
            step(Directive::Instruction, DirectiveState::Quoted('"'), None),
            (DirectiveState::Quoted('"'), DirectiveAction::Abort)
        );
    }
}
