//! Text runs.
//!
//! A run ends just before a `<` that starts markup. Two things can hide a `<`
//! from that check: ISO-2022-JP kanji shifted in with `ESC $ B` (whose bytes
//! may look like `<`), and, in quotesmart mode, quoted strings and script
//! comments.

use strum_macros::Display;

use crate::cursor::Cursor;
use crate::error::Result;
use crate::node::NodeFactory;

use super::dispatch::Lexer;

const ESC: char = '\x1b';

/// Quote state of the text scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TextState {
    /// Outside any quotes.
    Data,
    /// Inside a string opened by the given quote character.
    Quoted(char),
}

/// What the text scanner does with one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAction {
    /// Part of the run.
    Continue,
    /// `ESC`; may open a kanji sequence.
    Escape,
    /// `<`; may start markup.
    TagOpen,
    /// Opens a quoted string.
    EnterQuote(char),
    /// Closes the quoted string.
    ExitQuote,
    /// A backslash inside quotes.
    Backslash,
    /// `/` outside quotes; may open a comment.
    Slash,
}

/// Classify `c` in `state`. Quotes and comments only matter with `quotesmart`.
#[must_use]
pub fn classify(state: TextState, c: char, quotesmart: bool) -> TextAction {
    match (state, c) {
        (_, ESC) => TextAction::Escape,
        (TextState::Data, '<') => TextAction::TagOpen,
        _ if !quotesmart => TextAction::Continue,
        (TextState::Data, '\'' | '"') => TextAction::EnterQuote(c),
        (TextState::Data, '/') => TextAction::Slash,
        (TextState::Quoted(_), '\\') => TextAction::Backslash,
        (TextState::Quoted(quote), c) if c == quote => TextAction::ExitQuote,
        _ => TextAction::Continue,
    }
}

/// Progress through a shifted-in kanji sequence, looking for `ESC ( J` or
/// `ESC ( B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum JisState {
    /// Inside two-byte characters.
    Kanji,
    /// Just read `ESC`.
    Escape,
    /// Just read `ESC (`.
    EscapeParen,
}

/// The next state, or `None` once the sequence has shifted back out.
#[must_use]
pub const fn jis_step(state: JisState, c: char) -> Option<JisState> {
    match (state, c) {
        (JisState::EscapeParen, 'J' | 'B') => None,
        (JisState::Escape, '(') => Some(JisState::EscapeParen),
        (_, ESC) => Some(JisState::Escape),
        _ => Some(JisState::Kanji),
    }
}

impl<F: NodeFactory> Lexer<F> {
    /// Scan a text run from `start`; `cursor` is where scanning resumes
    /// (past any `<` the dispatcher already decided is text).
    pub(super) fn scan_text(
        &mut self,
        start: usize,
        mut cursor: Cursor,
        quotesmart: bool,
    ) -> Result<Option<F::Node>> {
        let mut state = TextState::Data;
        while let Some(c) = self.read(&mut cursor)? {
            match classify(state, c, quotesmart) {
                TextAction::Continue => {}
                TextAction::Escape => self.skip_kanji(&mut cursor)?,
                TextAction::TagOpen => match self.peek(cursor)? {
                    // A `<` at end of input stays in the run.
                    None => break,
                    Some(next) if self.starts_markup(next) => {
                        cursor.retreat();
                        break;
                    }
                    Some(_) => {}
                },
                TextAction::EnterQuote(quote) => state = TextState::Quoted(quote),
                TextAction::ExitQuote => state = TextState::Data,
                TextAction::Backslash => {
                    let quote = match state {
                        TextState::Quoted(quote) => Some(quote),
                        TextState::Data => None,
                    };
                    let escaped = self.peek(cursor)?;
                    if escaped == Some('\\') || escaped == quote {
                        let _ = self.read(&mut cursor)?;
                    }
                }
                TextAction::Slash => self.skip_script_comment(&mut cursor)?,
            }
        }
        self.finish_text(start, cursor)
    }

    /// Whether `<` followed by `next` opens markup.
    pub(super) fn starts_markup(&self, next: char) -> bool {
        matches!(next, '/' | '!' | '%')
            || next.is_alphabetic()
            || (next == '?' && self.processing_instructions)
    }

    /// After an `ESC`: if it introduces kanji (`ESC $ @` or `ESC $ B`), skip
    /// to the shift back out.
    fn skip_kanji(&mut self, cursor: &mut Cursor) -> Result<()> {
        let mut probe = *cursor;
        if self.read(&mut probe)? != Some('$') {
            return Ok(());
        }
        if !matches!(self.read(&mut probe)?, Some('@' | 'B')) {
            return Ok(());
        }
        *cursor = probe;
        let mut state = JisState::Kanji;
        while let Some(c) = self.read(cursor)? {
            match jis_step(state, c) {
                Some(next) => state = next,
                None => break,
            }
        }
        Ok(())
    }

    /// After a `/`: skip a `//` comment through its LF, or a `/* */` comment.
    pub(super) fn skip_script_comment(&mut self, cursor: &mut Cursor) -> Result<()> {
        match self.peek(*cursor)? {
            Some('/') => {
                let _ = self.read(cursor)?;
                while let Some(c) = self.read(cursor)? {
                    if c == '\n' {
                        break;
                    }
                }
            }
            Some('*') => {
                let _ = self.read(cursor)?;
                let mut star = false;
                while let Some(c) = self.read(cursor)? {
                    if star && c == '/' {
                        break;
                    }
                    star = c == '*';
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::page::Page;

    fn texts(input: &str, quotesmart: bool) -> Vec<String> {
        let mut lexer = Lexer::new(Page::from_text_with_charset(input, "UTF-8"));
        let mut out = Vec::new();
        while let Some(node) = lexer.next_node_with(quotesmart).unwrap() {
            out.push(node.source_text(lexer.page()).unwrap());
        }
        out
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(TextState::Data, '"', false), TextAction::Continue);
        assert_eq!(classify(TextState::Data, '"', true), TextAction::EnterQuote('"'));
        assert_eq!(classify(TextState::Quoted('"'), '<', true), TextAction::Continue);
        assert_eq!(classify(TextState::Quoted('"'), '\'', true), TextAction::Continue);
        assert_eq!(classify(TextState::Quoted('\''), '\'', true), TextAction::ExitQuote);
        assert_eq!(classify(TextState::Quoted('\''), ESC, true), TextAction::Escape);
    }

    #[test]
    fn test_jis_step() {
        let mut state = Some(JisState::Kanji);
        for c in ['<', ESC, '(', 'J'] {
            state = state.and_then(|s| jis_step(s, c));
        }
        assert_eq!(state, None);
        assert_eq!(jis_step(JisState::EscapeParen, 'x'), Some(JisState::Kanji));
    }

    #[test]
    fn test_text_stops_before_markup() {
        assert_eq!(texts("a < b <c", false), ["a < b ", "<c"]);
        assert_eq!(texts("x</y>", false), ["x", "</y>"]);
        assert_eq!(texts("1 <% 2", false), ["1 ", "<% 2"]);
    }

    #[test]
    fn test_kanji_sequence_hides_markup() {
        let input = "\x1b$B<a\x1b(Jx<b>";
        assert_eq!(texts(input, false), ["\x1b$B<a\x1b(Jx", "<b>"]);
        // An escape that does not shift in kanji is ordinary text.
        assert_eq!(texts("\x1b$x<b>", false), ["\x1b$x", "<b>"]);
    }

    #[test]
    fn test_quotesmart_strings_and_comments() {
        let script = "var s = '<b>'; // <i>\n/* <u> */ x<p>";
        assert_eq!(texts(script, true), ["var s = '<b>'; // <i>\n/* <u> */ x", "<p>"]);
        assert_eq!(texts(script, false)[0], "var s = '");
    }

    #[test]
    fn test_quotesmart_escapes() {
        assert_eq!(texts(r#"'it\'s <b>' <p>"#, true), [r#"'it\'s <b>' "#, "<p>"]);
        assert_eq!(texts(r#""a\\" <p>"#, true), [r#""a\\" "#, "<p>"]);
    }
}
