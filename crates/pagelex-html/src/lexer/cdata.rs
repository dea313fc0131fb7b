//! Raw character data: the body of a `script` or `style` element.
//!
//! The body runs up to the first end tag opener (`</` and a letter). A
//! `<!-- -->` section hides end tags. With quotesmart, so do string literals
//! and `/* */` comments; quotes inside a `//` comment are ignored.

use strum_macros::Display;

use crate::error::Result;
use crate::node::NodeFactory;

use super::dispatch::Lexer;

/// States of the character data scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CdataState {
    /// Ordinary content.
    Data,
    /// Just read `<`.
    LessThan,
    /// Just read `</`.
    EndTagOpen,
    /// Inside `<!-- -->`, with the count of consecutive `-` just read.
    Remark(u8),
}

impl<F: NodeFactory> Lexer<F> {
    /// Scan character data from the current position up to, not including, the
    /// next end tag. Returns `None` if the end tag comes first.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the page and errors from the node factory.
    pub fn parse_cdata(&mut self, quotesmart: bool) -> Result<Option<F::Node>> {
        let start = self.cursor.position();
        let mut cursor = self.cursor;
        let mut state = CdataState::Data;
        let mut quote: Option<char> = None;
        let mut line_comment = false;
        let mut open = cursor;

        loop {
            let at = cursor;
            let Some(c) = self.read(&mut cursor)? else {
                break;
            };
            state = match (state, c) {
                (CdataState::Data, '\'' | '"') => {
                    if quotesmart && !line_comment {
                        quote = match quote {
                            None => Some(c),
                            Some(q) if q == c => None,
                            other => other,
                        };
                    }
                    CdataState::Data
                }
                (CdataState::Data, '\\') => {
                    if quotesmart && quote.is_some() {
                        let escaped = self.peek(cursor)?;
                        if escaped == Some('\\') || escaped == quote {
                            let _ = self.read(&mut cursor)?;
                        }
                    }
                    CdataState::Data
                }
                (CdataState::Data, '/') => {
                    if quotesmart && quote.is_none() {
                        match self.peek(cursor)? {
                            Some('/') => {
                                let _ = self.read(&mut cursor)?;
                                line_comment = true;
                            }
                            Some('*') => self.skip_script_comment(&mut cursor)?,
                            _ => {}
                        }
                    }
                    CdataState::Data
                }
                (CdataState::Data, '\n') => {
                    line_comment = false;
                    CdataState::Data
                }
                (CdataState::Data, '<') if !quotesmart || quote.is_none() => {
                    open = at;
                    CdataState::LessThan
                }
                (CdataState::Data, _) => CdataState::Data,

                (CdataState::LessThan, '/') => CdataState::EndTagOpen,
                (CdataState::LessThan, '!') => {
                    let mut probe = cursor;
                    if self.read(&mut probe)? == Some('-') && self.read(&mut probe)? == Some('-') {
                        cursor = probe;
                        line_comment = false;
                        CdataState::Remark(0)
                    } else {
                        CdataState::Data
                    }
                }
                (CdataState::LessThan | CdataState::EndTagOpen, _) => {
                    if state == CdataState::EndTagOpen && c.is_alphabetic() {
                        cursor = open;
                        break;
                    }
                    cursor = at;
                    CdataState::Data
                }

                (CdataState::Remark(dashes), '-') => CdataState::Remark(dashes.saturating_add(1)),
                (CdataState::Remark(dashes), '>') if dashes >= 2 => CdataState::Data,
                (CdataState::Remark(_), _) => CdataState::Remark(0),
            };
        }
        self.finish_text(start, cursor)
    }
}
