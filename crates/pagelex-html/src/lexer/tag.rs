//! Tags and their attribute lists.
//!
//! The scanner starts just after the `<` and treats the tag name as the first
//! attribute. Every gap between attributes is kept as a whitespace
//! pseudo-attribute, so the list covers the tag's text without holes.
//!
//! Whitespace after an attribute name is undecided until the next character:
//! an `=` makes it part of the assignment, anything else ends the name as a
//! standalone attribute and the gap is rescanned as whitespace.

use strum_macros::{Display, EnumCount};

use crate::cursor::Cursor;
use crate::error::Result;
use crate::node::{Attribute, NodeFactory, Span};

use super::dispatch::Lexer;

/// States of the tag scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumCount)]
pub enum TagState {
    /// Between attributes.
    Between,
    /// In an attribute name.
    Name,
    /// Just past `=`.
    Equals,
    /// In an unquoted value.
    NakedValue,
    /// In a `'`-quoted value.
    SingleQuoted,
    /// In a `"`-quoted value.
    DoubleQuoted,
    /// Whitespace after a name; an `=` or a new attribute may follow.
    AfterName,
}

/// How the last attribute is closed off when the tag ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    /// Only a trailing gap remains.
    Gap,
    /// A name without a value.
    Standalone,
    /// A name and `=` with nothing after.
    Empty,
    /// An unquoted value.
    Naked,
    /// A quoted value missing its closing quote.
    Quoted,
    /// A name followed by whitespace up to end of input.
    StandaloneThenGap,
}

/// What the tag scanner does with one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagAction {
    /// Nothing to record.
    Continue,
    /// Flush the gap and start a name here.
    BeginName,
    /// The name ends here; whitespace follows.
    EndName,
    /// The name ends here with `=`.
    EndNameAssign,
    /// `=` after whitespace following a name.
    Assign,
    /// A quote opens the value.
    OpenQuote,
    /// An unquoted value starts here.
    BeginValue,
    /// Whitespace ends an unquoted value.
    EndNaked,
    /// The matching quote ends the value.
    EndQuoted,
    /// The undecided name was standalone; rescan this character.
    StandaloneReconsume,
    /// The tag ends. With `before`, the current character (a `<`) is not part
    /// of the tag.
    Finish {
        /// How to close off the last attribute.
        ending: Ending,
        /// Leave the current character for the next node.
        before: bool,
    },
}

const fn finish(ending: Ending) -> TagAction {
    TagAction::Finish {
        ending,
        before: false,
    }
}

const fn finish_before(ending: Ending) -> TagAction {
    TagAction::Finish {
        ending,
        before: true,
    }
}

/// One transition of the tag scanner. `None` is end of input.
#[must_use]
pub fn step(state: TagState, c: Option<char>) -> (TagState, TagAction) {
    use TagState::{AfterName, Between, DoubleQuoted, Equals, NakedValue, Name, SingleQuoted};

    let space = c.is_some_and(char::is_whitespace);
    match (state, c) {
        (Between, None | Some('>')) => (Between, finish(Ending::Gap)),
        (Between, Some('<')) => (Between, finish_before(Ending::Gap)),
        (Between, _) if space => (Between, TagAction::Continue),
        (Between, Some(_)) => (Name, TagAction::BeginName),

        (Name, None | Some('>')) => (Name, finish(Ending::Standalone)),
        (Name, Some('<')) => (Name, finish_before(Ending::Standalone)),
        (Name, Some('=')) => (Equals, TagAction::EndNameAssign),
        (Name, _) if space => (AfterName, TagAction::EndName),
        (Name, Some(_)) => (Name, TagAction::Continue),

        (Equals, None | Some('>')) => (Equals, finish(Ending::Empty)),
        (Equals, Some('\'')) => (SingleQuoted, TagAction::OpenQuote),
        (Equals, Some('"')) => (DoubleQuoted, TagAction::OpenQuote),
        (Equals, _) if space => (Equals, TagAction::Continue),
        (Equals, Some(_)) => (NakedValue, TagAction::BeginValue),

        (NakedValue, None | Some('>')) => (NakedValue, finish(Ending::Naked)),
        (NakedValue, _) if space => (Between, TagAction::EndNaked),
        (NakedValue, Some(_)) => (NakedValue, TagAction::Continue),

        (SingleQuoted | DoubleQuoted, None) => (state, finish(Ending::Quoted)),
        (SingleQuoted, Some('\'')) | (DoubleQuoted, Some('"')) => (Between, TagAction::EndQuoted),
        (SingleQuoted | DoubleQuoted, Some(_)) => (state, TagAction::Continue),

        (AfterName, None) => (AfterName, finish(Ending::StandaloneThenGap)),
        (AfterName, _) if space => (AfterName, TagAction::Continue),
        (AfterName, Some('=')) => (Equals, TagAction::Assign),
        (AfterName, Some(_)) => (Between, TagAction::StandaloneReconsume),
    }
}

/// Offsets remembered while scanning one tag.
#[derive(Debug, Clone, Copy, Default)]
struct Marks {
    gap_start: usize,
    name_start: usize,
    name_end: usize,
    /// Where the value starts (past the opening quote, if any).
    value_start: usize,
    quote: Option<char>,
}

impl Marks {
    const fn name(&self) -> Span {
        Span::new(self.name_start, self.name_end)
    }

    /// The `=` and whitespace between the name and the value.
    const fn assignment(&self) -> Span {
        let end = match self.quote {
            Some(_) => self.value_start - 1,
            None => self.value_start,
        };
        Span::new(self.name_end, end)
    }

    fn push_gap(&self, attributes: &mut Vec<Attribute>, end: usize) {
        if end > self.gap_start {
            attributes.push(Attribute::whitespace(Span::new(self.gap_start, end)));
        }
    }

    fn push_value(&self, attributes: &mut Vec<Attribute>, end: usize) {
        attributes.push(Attribute::valued(
            self.name(),
            self.assignment(),
            Span::new(self.value_start, end),
            self.quote,
        ));
    }
}

impl<F: NodeFactory> Lexer<F> {
    /// Scan a tag starting at `start`; `cursor` is just past the `<`.
    pub(super) fn scan_tag(&mut self, start: usize, mut cursor: Cursor) -> Result<Option<F::Node>> {
        let mut attributes = Vec::new();
        let mut marks = Marks {
            gap_start: cursor.position(),
            ..Marks::default()
        };
        let mut state = TagState::Between;
        loop {
            let at = cursor.position();
            let c = self.read(&mut cursor)?;
            let (next, action) = step(state, c);
            match action {
                TagAction::Continue | TagAction::Assign => {}
                TagAction::BeginName => {
                    marks.push_gap(&mut attributes, at);
                    marks.name_start = at;
                }
                TagAction::EndName | TagAction::EndNameAssign => marks.name_end = at,
                TagAction::OpenQuote => {
                    marks.quote = c;
                    marks.value_start = at + 1;
                }
                TagAction::BeginValue => {
                    marks.quote = None;
                    marks.value_start = at;
                }
                TagAction::EndNaked => {
                    marks.push_value(&mut attributes, at);
                    marks.gap_start = at;
                }
                TagAction::EndQuoted => {
                    marks.push_value(&mut attributes, at);
                    marks.gap_start = at + 1;
                }
                TagAction::StandaloneReconsume => {
                    attributes.push(Attribute::standalone(marks.name()));
                    marks.gap_start = marks.name_end;
                    cursor.retreat();
                }
                TagAction::Finish { ending, before } => {
                    if before {
                        cursor.retreat();
                    }
                    match ending {
                        Ending::Gap => marks.push_gap(&mut attributes, at),
                        Ending::Standalone => {
                            marks.name_end = at;
                            attributes.push(Attribute::standalone(marks.name()));
                        }
                        Ending::Empty => {
                            marks.quote = None;
                            marks.value_start = at;
                            marks.push_value(&mut attributes, at);
                        }
                        Ending::Naked | Ending::Quoted => marks.push_value(&mut attributes, at),
                        Ending::StandaloneThenGap => {
                            attributes.push(Attribute::standalone(marks.name()));
                            marks.gap_start = marks.name_end;
                            marks.push_gap(&mut attributes, at);
                        }
                    }
                    break;
                }
            }
            state = next;
        }
        self.cursor = cursor;
        self.make_tag(start, cursor.position(), attributes).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use strum::EnumCount;

    use super::*;
    use crate::node::Node;
    use crate::page::Page;

    /// (name, value, quote) of one attribute entry.
    type Described = (Option<String>, Option<String>, Option<char>);

    /// Lex `input`, which must start with a tag, and describe its attributes.
    fn attributes_of(input: &str) -> (String, Vec<Described>) {
        let mut lexer = Lexer::new(Page::from_text_with_charset(input, "UTF-8"));
        let Some(Node::Tag(tag)) = lexer.next_node().unwrap() else {
            panic!("expected a tag");
        };
        let page = lexer.page();
        let source = Node::Tag(tag.clone()).source_text(page).unwrap();
        let described = tag
            .raw_attributes()
            .iter()
            .map(|a| (a.name(page).unwrap(), a.value(page).unwrap(), a.quote()))
            .collect();
        (source, described)
    }

    fn named(name: &str, value: Option<&str>, quote: Option<char>) -> Described {
        (Some(name.to_string()), value.map(str::to_string), quote)
    }

    fn gap(text: &str) -> Described {
        (None, Some(text.to_string()), None)
    }

    #[test]
    fn test_state_count() {
        assert_eq!(TagState::COUNT, 7);
    }

    #[test]
    fn test_mixed_attributes() {
        let (source, attributes) = attributes_of(r#"<A HREF = "x" TARGET=_top checked>"#);
        assert_eq!(source, r#"<A HREF = "x" TARGET=_top checked>"#);
        assert_eq!(
            attributes,
            [
                named("A", None, None),
                gap(" "),
                named("HREF", Some("x"), Some('"')),
                gap(" "),
                named("TARGET", Some("_top"), None),
                gap(" "),
                named("checked", None, None),
            ]
        );
    }

    #[test]
    fn test_assignment_span_covers_spaces() {
        let mut lexer = Lexer::new(Page::from_text_with_charset("<a b = 'c'>", "UTF-8"));
        let node = lexer.next_node().unwrap().unwrap();
        let tag = node.as_tag().unwrap();
        let b = &tag.raw_attributes()[2];
        assert_eq!(b.assignment_span(), Some(Span::new(4, 7)));
        assert_eq!(b.value_span(), Some(Span::new(8, 9)));
    }

    #[test]
    fn test_empty_value_and_trailing_gap() {
        let (_, attributes) = attributes_of("<a b= >");
        assert_eq!(attributes, [named("a", None, None), gap(" "), named("b", Some(""), None)]);

        let (_, attributes) = attributes_of("<br />");
        assert_eq!(attributes, [named("br", None, None), gap(" "), named("/", None, None)]);
    }

    #[test]
    fn test_standalone_before_end() {
        let (source, attributes) = attributes_of("<td nowrap >");
        assert_eq!(source, "<td nowrap >");
        assert_eq!(
            attributes,
            [named("td", None, None), gap(" "), named("nowrap", None, None), gap(" ")]
        );
    }

    #[test]
    fn test_open_bracket_ends_tag() {
        let mut lexer = Lexer::new(Page::from_text_with_charset("<a href=x<b>", "UTF-8"));
        let first = lexer.next_node().unwrap().unwrap();
        // Unquoted values run through `<`.
        assert_eq!(first.source_text(lexer.page()).unwrap(), "<a href=x<b>");

        let mut lexer = Lexer::new(Page::from_text_with_charset("<a <b>", "UTF-8"));
        let first = lexer.next_node().unwrap().unwrap();
        assert_eq!(first.source_text(lexer.page()).unwrap(), "<a ");
        let second = lexer.next_node().unwrap().unwrap();
        assert_eq!(second.source_text(lexer.page()).unwrap(), "<b>");
    }

    #[test]
    fn test_unterminated_tags() {
        let (source, attributes) = attributes_of("<a title='open");
        assert_eq!(source, "<a title='open");
        assert_eq!(attributes[2], named("title", Some("open"), Some('\'')));

        let (_, attributes) = attributes_of("<a b  ");
        assert_eq!(attributes, [named("a", None, None), gap(" "), named("b", None, None), gap("  ")]);
    }

    #[test]
    fn test_end_tag_and_doctype() {
        let mut lexer = Lexer::new(Page::from_text_with_charset("</P><!DOCTYPE html>", "UTF-8"));
        let end = lexer.next_node().unwrap().unwrap();
        let doctype = lexer.next_node().unwrap().unwrap();
        let page = lexer.page();
        let end = end.as_tag().unwrap();
        assert!(end.is_end_tag(page).unwrap());
        assert_eq!(end.name(page).unwrap(), "P");
        assert_eq!(doctype.as_tag().unwrap().name(page).unwrap(), "!DOCTYPE");
    }
}
