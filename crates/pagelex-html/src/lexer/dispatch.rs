//! The lexer itself: construction, options, and the top-level dispatch on the
//! character after `<`.

use std::fmt;

use crate::cursor::Cursor;
use crate::error::{LexError, Result};
use crate::node::{DefaultNodeFactory, NodeFactory};
use crate::page::Page;

use super::code_block::Directive;

/// Splits a [`Page`] into nodes.
///
/// The lexer owns its page and a committed cursor. Scanners probe ahead with
/// copies of the cursor and commit only the end of the node they produce.
/// Nodes are built by a [`NodeFactory`], [`DefaultNodeFactory`] unless another
/// is supplied.
///
/// ```
/// use pagelex_html::{Lexer, Page};
///
/// let mut lexer = Lexer::new(Page::from_text("<p class=x>hi</p>"));
/// let mut kinds = Vec::new();
/// while let Some(node) = lexer.next_node().unwrap() {
///     kinds.push(node.kind().to_string());
/// }
/// assert_eq!(kinds, ["tag", "text", "tag"]);
/// ```
pub struct Lexer<F: NodeFactory = DefaultNodeFactory> {
    pub(super) page: Page,
    pub(super) cursor: Cursor,
    pub(super) factory: F,
    pub(super) strict_remarks: bool,
    pub(super) processing_instructions: bool,
    pub(super) follow_meta_charset: bool,
}

impl Lexer<DefaultNodeFactory> {
    /// A lexer at the start of `page`.
    #[must_use]
    pub fn new(page: Page) -> Self {
        Self::with_factory(page, DefaultNodeFactory)
    }
}

impl<F: NodeFactory> Lexer<F> {
    /// A lexer at the start of `page` that builds nodes with `factory`.
    #[must_use]
    pub fn with_factory(page: Page, factory: F) -> Self {
        let cursor = page.cursor(0);
        Self {
            page,
            cursor,
            factory,
            strict_remarks: false,
            processing_instructions: false,
            follow_meta_charset: false,
        }
    }

    // =========================================================================
    // Options
    // =========================================================================

    /// Only accept whitespace between the closing `--` and `>` of a comment.
    pub const fn set_strict_remarks(&mut self, strict: bool) {
        self.strict_remarks = strict;
    }

    /// Whether comments are scanned strictly.
    #[must_use]
    pub const fn strict_remarks(&self) -> bool {
        self.strict_remarks
    }

    /// Scan `<?...?>` as a tag instead of text.
    pub const fn set_processing_instructions(&mut self, enabled: bool) {
        self.processing_instructions = enabled;
    }

    /// Whether `<?...?>` is scanned as a tag.
    #[must_use]
    pub const fn processing_instructions(&self) -> bool {
        self.processing_instructions
    }

    /// Switch the page encoding when a `<meta>` tag names a charset.
    ///
    /// A switch that would change text already returned fails the call to
    /// [`Lexer::next_node`] with [`LexError::EncodingChange`].
    pub const fn set_follow_meta_charset(&mut self, follow: bool) {
        self.follow_meta_charset = follow;
    }

    /// Whether `<meta>` charsets are followed.
    #[must_use]
    pub const fn follow_meta_charset(&self) -> bool {
        self.follow_meta_charset
    }

    // =========================================================================
    // Page, cursor and factory
    // =========================================================================

    /// The page being read.
    #[must_use]
    pub const fn page(&self) -> &Page {
        &self.page
    }

    /// The page being read, mutably.
    pub const fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    /// Give up the lexer and keep the page.
    #[must_use]
    pub fn into_page(self) -> Page {
        self.page
    }

    /// The node factory.
    #[must_use]
    pub const fn node_factory(&self) -> &F {
        &self.factory
    }

    /// The node factory, mutably.
    pub const fn node_factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }

    /// Replace the node factory, returning the old one.
    pub fn set_node_factory(&mut self, factory: F) -> F {
        std::mem::replace(&mut self.factory, factory)
    }

    /// The committed cursor.
    #[must_use]
    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Offset of the next character to be lexed.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Move to `position`, which must already have been read.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::FutureRead`] if `position` is past the page's fill offset.
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        let offset = self.page.fill_offset();
        if position > offset {
            return Err(LexError::FutureRead { position, offset });
        }
        self.cursor.set_position(position);
        Ok(())
    }

    /// Go back to the start of the page. Text already read is replayed from
    /// the page's buffer.
    pub const fn reset(&mut self) {
        self.cursor.set_position(0);
    }

    /// Zero-based line of the cursor.
    #[must_use]
    pub fn current_line_number(&self) -> usize {
        self.page.row(self.cursor.position())
    }

    /// Text of the line the cursor is on, up to what has been read.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::Closed`] if the page has been destroyed.
    pub fn current_line(&self) -> Result<String> {
        self.page.line(self.cursor.position())
    }

    // =========================================================================
    // Lexing
    // =========================================================================

    /// The next node, or `None` at end of input. Text is scanned without
    /// quote awareness.
    ///
    /// # Errors
    ///
    /// Propagates I/O and encoding-change errors from the page, and errors
    /// from the node factory.
    pub fn next_node(&mut self) -> Result<Option<F::Node>> {
        self.next_node_with(false)
    }

    /// The next node, or `None` at end of input.
    ///
    /// With `quotesmart`, a `<` inside a quoted string or a `//` or `/* */`
    /// comment does not end a text run.
    ///
    /// # Errors
    ///
    /// Propagates I/O and encoding-change errors from the page, and errors
    /// from the node factory.
    pub fn next_node_with(&mut self, quotesmart: bool) -> Result<Option<F::Node>> {
        let start = self.cursor.position();
        let mut cursor = self.cursor;
        let node = match self.page.character(&mut cursor)? {
            None => None,
            Some('<') => self.dispatch_open(start, cursor, quotesmart)?,
            Some(_) => self.scan_text(start, self.cursor, quotesmart)?,
        };
        log::trace!(target: "pagelex::lexer", "node {start}..{}", self.cursor.position());
        Ok(node)
    }

    /// Decide what a `<` at `start` opens. `after` is just past the `<`.
    fn dispatch_open(
        &mut self,
        start: usize,
        after: Cursor,
        quotesmart: bool,
    ) -> Result<Option<F::Node>> {
        let mut probe = after;
        match self.page.character(&mut probe)? {
            None => {
                self.cursor = after;
                self.make_text(start, after.position()).map(Some)
            }
            Some('%') => self.scan_directive(start, probe, Directive::Code, quotesmart),
            Some('?') if self.processing_instructions => {
                self.scan_directive(start, probe, Directive::Instruction, quotesmart)
            }
            Some('/') => self.scan_tag(start, after),
            Some('!') => {
                let mut bang = probe;
                match self.page.character(&mut bang)? {
                    None => {
                        self.cursor = bang;
                        self.make_text(start, bang.position()).map(Some)
                    }
                    Some('>') => {
                        self.cursor = bang;
                        self.make_comment(start, bang.position()).map(Some)
                    }
                    Some('-') => self.scan_remark(start, probe, quotesmart),
                    Some(_) => self.scan_tag(start, after),
                }
            }
            Some(c) if c.is_alphabetic() => self.scan_tag(start, after),
            Some(_) => self.scan_text(start, after, quotesmart),
        }
    }

    /// Iterate over the remaining nodes. Iteration stops after the first error.
    pub const fn nodes(&mut self) -> Nodes<'_, F> {
        Nodes {
            lexer: self,
            quotesmart: false,
            failed: false,
        }
    }
}

impl<F: NodeFactory + fmt::Debug> fmt::Debug for Lexer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lexer")
            .field("page", &self.page.id())
            .field("position", &self.cursor.position())
            .field("factory", &self.factory)
            .field("strict_remarks", &self.strict_remarks)
            .finish_non_exhaustive()
    }
}

/// Iterator over a lexer's nodes. See [`Lexer::nodes`].
pub struct Nodes<'a, F: NodeFactory> {
    lexer: &'a mut Lexer<F>,
    quotesmart: bool,
    failed: bool,
}

impl<F: NodeFactory> Nodes<'_, F> {
    /// Scan text with quote awareness.
    #[must_use]
    pub const fn quotesmart(mut self, quotesmart: bool) -> Self {
        self.quotesmart = quotesmart;
        self
    }
}

impl<F: NodeFactory> Iterator for Nodes<'_, F> {
    type Item = Result<F::Node>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.lexer.next_node_with(self.quotesmart) {
            Ok(node) => node.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
