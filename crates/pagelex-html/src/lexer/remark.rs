//! Comments.
//!
//! `<!--` opens a comment and `-->` closes it. Before the `>`, any mix of `-`,
//! `!` and whitespace is tolerated after the `--`, so `--!>` and `-- >` also
//! close. `<!-->` is an empty comment. An opening that is not `<!--` is
//! rescanned as text.

use strum_macros::Display;

use crate::cursor::Cursor;
use crate::error::Result;
use crate::node::NodeFactory;

use super::dispatch::Lexer;

/// States of the comment scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RemarkState {
    /// Expecting the first `-`.
    Open,
    /// Expecting the second `-`.
    OpenDash,
    /// In the body.
    Body,
    /// After one `-` in the body.
    EndDash,
    /// After `--`; a `>` closes.
    EndDashDash,
}

/// What the comment scanner does with one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemarkAction {
    /// Keep scanning.
    Continue,
    /// The comment ends here.
    Done,
    /// The opening was not `<!--`; the input is text.
    Fallback,
    /// `<!--` was just read; a `>` straight after closes the comment.
    CheckEmpty,
}

/// One transition of the comment scanner. `None` is end of input.
#[must_use]
pub fn step(state: RemarkState, c: Option<char>, strict: bool) -> (RemarkState, RemarkAction) {
    use RemarkState::{Body, EndDash, EndDashDash, Open, OpenDash};

    match (state, c) {
        (Open, Some('-')) => (OpenDash, RemarkAction::Continue),
        (OpenDash, Some('-')) => (Body, RemarkAction::CheckEmpty),
        (Open | OpenDash, _) => (state, RemarkAction::Fallback),

        (Body | EndDash | EndDashDash, None) | (EndDashDash, Some('>')) => (state, RemarkAction::Done),
        (Body, Some('-')) => (EndDash, RemarkAction::Continue),
        (EndDash, Some('-')) => (EndDashDash, RemarkAction::Continue),
        (EndDashDash, Some(c)) if c == '-' || c.is_whitespace() || (c == '!' && !strict) => {
            (EndDashDash, RemarkAction::Continue)
        }
        (Body | EndDash | EndDashDash, Some(_)) => (Body, RemarkAction::Continue),
    }
}

impl<F: NodeFactory> Lexer<F> {
    /// Scan a comment at `start`; `cursor` is just past `<!`.
    pub(super) fn scan_remark(
        &mut self,
        start: usize,
        mut cursor: Cursor,
        quotesmart: bool,
    ) -> Result<Option<F::Node>> {
        let mut state = RemarkState::Open;
        loop {
            let c = self.read(&mut cursor)?;
            let (next, action) = step(state, c, self.strict_remarks);
            match action {
                RemarkAction::Continue => {}
                RemarkAction::Done => break,
                RemarkAction::Fallback => {
                    if c.is_some() {
                        cursor.retreat();
                    }
                    log::trace!(target: "pagelex::lexer", "not a comment at {start}");
                    return self.scan_text(start, cursor, quotesmart);
                }
                RemarkAction::CheckEmpty => match self.peek(cursor)? {
                    None => break,
                    Some('>') => {
                        let _ = self.read(&mut cursor)?;
                        break;
                    }
                    Some(_) => {}
                },
            }
            state = next;
        }
        self.cursor = cursor;
        self.make_comment(start, cursor.position()).map(Some)
    }
}
