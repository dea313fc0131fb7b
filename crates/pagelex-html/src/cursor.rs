//! Cursors: copyable positions into a page.

use crate::page::PageId;

/// A position in a particular page.
///
/// A cursor is a plain value. Copying one is how the lexer probes ahead
/// without moving its committed position. Only [`Page::character`] moves a
/// cursor forward, and it refuses cursors that point past what has been read.
///
/// [`Page::character`]: crate::page::Page::character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor {
    page: PageId,
    position: usize,
}

impl Cursor {
    /// A cursor at `position` in the page identified by `page`.
    #[must_use]
    pub const fn new(page: PageId, position: usize) -> Self {
        Self { page, position }
    }

    /// The character offset this cursor addresses.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// The page this cursor belongs to.
    #[must_use]
    pub const fn page(&self) -> PageId {
        self.page
    }

    pub(crate) const fn advance(&mut self) {
        self.position += 1;
    }

    /// Step back one character. Does nothing at offset 0.
    pub(crate) const fn retreat(&mut self) {
        self.position = self.position.saturating_sub(1);
    }

    pub(crate) const fn set_position(&mut self, position: usize) {
        self.position = position;
    }
}
