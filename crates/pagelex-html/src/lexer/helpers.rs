//! Lookahead and node construction shared by the scanners.

use crate::cursor::Cursor;
use crate::error::Result;
use crate::node::{Attribute, NodeFactory};

use super::dispatch::Lexer;

// =============================================================================
// Input helpers
// =============================================================================

impl<F: NodeFactory> Lexer<F> {
    /// Read the character at `cursor` and advance it.
    pub(super) fn read(&mut self, cursor: &mut Cursor) -> Result<Option<char>> {
        self.page.character(cursor)
    }

    /// The character at `cursor`, without moving it.
    pub(super) fn peek(&mut self, cursor: Cursor) -> Result<Option<char>> {
        let mut probe = cursor;
        self.page.character(&mut probe)
    }
}

// =============================================================================
// Node construction
// =============================================================================

impl<F: NodeFactory> Lexer<F> {
    pub(super) fn make_text(&mut self, start: usize, end: usize) -> Result<F::Node> {
        self.factory.make_text(&self.page, start, end)
    }

    pub(super) fn make_comment(&mut self, start: usize, end: usize) -> Result<F::Node> {
        self.factory.make_comment(&self.page, start, end)
    }

    /// A tag, or text if the span is too short to be one.
    pub(super) fn make_tag(
        &mut self,
        start: usize,
        end: usize,
        attributes: Vec<Attribute>,
    ) -> Result<F::Node> {
        if end - start < 2 {
            return self.make_text(start, end);
        }
        self.apply_document_hints(&attributes)?;
        self.factory.make_tag(&self.page, start, end, attributes)
    }

    /// Commit `cursor` and make text from `start` to it, or nothing if empty.
    pub(super) fn finish_text(&mut self, start: usize, cursor: Cursor) -> Result<Option<F::Node>> {
        self.cursor = cursor;
        let end = cursor.position();
        if end == start {
            return Ok(None);
        }
        self.make_text(start, end).map(Some)
    }
}
