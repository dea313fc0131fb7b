//! Error type shared by the source, page and lexer.
//!
//! Malformed markup is never an error: every scanner degrades to a text node.
//! The variants here are about the input stream and about misuse of cursors.

use std::io;

use pagelex_common::net::FetchError;

/// Errors raised while reading or lexing a page.
#[derive(Debug, thiserror::Error)]
pub enum LexError {
    /// The underlying byte source failed.
    #[error("I/O failure reading page source")]
    Io(#[from] io::Error),

    /// A cursor addressed a position that has not been read yet.
    #[error("attempt to read future characters from source {position} > {offset}")]
    FutureRead {
        /// The position the cursor asked for.
        position: usize,
        /// The page's fill offset at the time.
        offset: usize,
    },

    /// Characters already handed out decode differently under a new charset.
    ///
    /// The page is left as it was; callers usually restart lexing from the
    /// beginning with the new charset.
    #[error(
        "character mismatch (new: {new:?} != old: {old:?}) at {position} switching from {from} to {to}"
    )]
    EncodingChange {
        /// Offset of the first differing character.
        position: usize,
        /// The character under the new charset (`None` if it ran out).
        new: Option<char>,
        /// The character previously handed out.
        old: char,
        /// Canonical name of the charset in use.
        from: String,
        /// Canonical name of the requested charset.
        to: String,
    },

    /// The byte source does not keep history and cannot be rewound.
    #[error("source does not support rewinding for an encoding change")]
    UnsupportedRewind,

    /// The charset label is not known to the decoder.
    #[error("unsupported charset {0:?}")]
    UnsupportedCharset(String),

    /// The source has been destroyed.
    #[error("source is closed")]
    Closed,

    /// `unread` was called with nothing read.
    #[error("can't unread with no characters read")]
    UnreadAtStart,

    /// A cursor or node created for one page was used with another.
    #[error("cursor or node belongs to a different page")]
    ForeignPage,

    /// Opening a URL failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl LexError {
    /// True for [`LexError::EncodingChange`], the one error a caller can recover from
    /// by starting over.
    #[must_use]
    pub const fn is_encoding_change(&self) -> bool {
        matches!(self, Self::EncodingChange { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LexError>;
