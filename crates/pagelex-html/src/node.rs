//! Lexer output: text runs, remarks and tags, described by page offsets.
//!
//! Nodes never copy text. They hold the [`PageId`] they came from and spans
//! into that page, and resolve their text through a `&Page`. Because a page's
//! buffer only grows, a node stays valid for as long as the page lives.

use strum_macros::Display;

use crate::error::Result;
use crate::page::{Page, PageId};

/// A half-open range of character offsets, `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// First offset in the range.
    pub start: usize,
    /// One past the last offset.
    pub end: usize,
}

impl Span {
    /// Create a span.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of characters covered.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// True if the span covers nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// One entry of a tag's attribute list.
///
/// The list alternates between real attributes and whitespace
/// pseudo-attributes that record the gaps, so a tag can be written back out
/// exactly as it appeared. The first entry is always the tag name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: Option<Span>,
    assignment: Option<Span>,
    value: Option<Span>,
    quote: Option<char>,
}

impl Attribute {
    /// A run of whitespace between attributes.
    #[must_use]
    pub const fn whitespace(gap: Span) -> Self {
        Self {
            name: None,
            assignment: None,
            value: Some(gap),
            quote: None,
        }
    }

    /// An attribute without a value, such as `checked`, or the tag name.
    #[must_use]
    pub const fn standalone(name: Span) -> Self {
        Self {
            name: Some(name),
            assignment: None,
            value: None,
            quote: None,
        }
    }

    /// A `name=value` attribute. `assignment` covers the `=` and any
    /// whitespace around it; `value` excludes the quotes.
    #[must_use]
    pub const fn valued(name: Span, assignment: Span, value: Span, quote: Option<char>) -> Self {
        Self {
            name: Some(name),
            assignment: Some(assignment),
            value: Some(value),
            quote,
        }
    }

    /// True for a whitespace pseudo-attribute.
    #[must_use]
    pub const fn is_whitespace(&self) -> bool {
        self.name.is_none()
    }

    /// True for an attribute with a name and no value.
    #[must_use]
    pub const fn is_standalone(&self) -> bool {
        self.name.is_some() && self.assignment.is_none()
    }

    /// Span of the name.
    #[must_use]
    pub const fn name_span(&self) -> Option<Span> {
        self.name
    }

    /// Span of the `=` and surrounding whitespace.
    #[must_use]
    pub const fn assignment_span(&self) -> Option<Span> {
        self.assignment
    }

    /// Span of the value, inside any quotes. For whitespace, the gap itself.
    #[must_use]
    pub const fn value_span(&self) -> Option<Span> {
        self.value
    }

    /// The quote character around the value, if any.
    #[must_use]
    pub const fn quote(&self) -> Option<char> {
        self.quote
    }

    /// The name as written.
    ///
    /// # Errors
    ///
    /// Fails if the span lies past the page's fill offset (a node from another page).
    pub fn name(&self, page: &Page) -> Result<Option<String>> {
        self.name.map(|span| page.text(span.start, span.end)).transpose()
    }

    /// The value as written, without quotes.
    ///
    /// # Errors
    ///
    /// Fails if the span lies past the page's fill offset (a node from another page).
    pub fn value(&self, page: &Page) -> Result<Option<String>> {
        self.value.map(|span| page.text(span.start, span.end)).transpose()
    }
}

/// The three kinds of node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum NodeKind {
    /// A run of text.
    Text,
    /// A `<!-- -->` comment.
    Remark,
    /// A tag, including `<!DOCTYPE>`, `<% %>` code blocks and `<? ?>`.
    Tag,
}

/// A run of character data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    page: PageId,
    span: Span,
}

impl TextNode {
    /// Create a text node.
    #[must_use]
    pub const fn new(page: PageId, span: Span) -> Self {
        Self { page, span }
    }

    /// The text.
    ///
    /// # Errors
    ///
    /// Fails with [`LexError::ForeignPage`](crate::error::LexError::ForeignPage)
    /// for a node of another page.
    pub fn text(&self, page: &Page) -> Result<String> {
        page.check(self.page)?;
        page.text(self.span.start, self.span.end)
    }
}

/// A comment, `<!-- ... -->` or the empty `<!>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemarkNode {
    page: PageId,
    span: Span,
}

impl RemarkNode {
    /// Create a remark node.
    #[must_use]
    pub const fn new(page: PageId, span: Span) -> Self {
        Self { page, span }
    }

    /// The comment body, without the delimiters.
    ///
    /// # Errors
    ///
    /// Fails with [`LexError::ForeignPage`](crate::error::LexError::ForeignPage)
    /// for a node of another page.
    pub fn text(&self, page: &Page) -> Result<String> {
        page.check(self.page)?;
        let raw = page.text(self.span.start, self.span.end)?;
        let inner = raw.strip_prefix("<!").unwrap_or(&raw);
        let closed = inner.strip_suffix('>');
        let inner = closed.unwrap_or(inner);
        let inner = inner.strip_prefix("--").unwrap_or(inner);
        if closed.is_none() {
            return Ok(inner.to_string());
        }
        let inner = inner.trim_end_matches(|c: char| c == '!' || c.is_whitespace());
        Ok(inner.strip_suffix("--").unwrap_or(inner).to_string())
    }
}

/// A tag with its attribute list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagNode {
    page: PageId,
    span: Span,
    attributes: Vec<Attribute>,
}

impl TagNode {
    /// Create a tag node.
    #[must_use]
    pub const fn new(page: PageId, span: Span, attributes: Vec<Attribute>) -> Self {
        Self {
            page,
            span,
            attributes,
        }
    }

    /// Every attribute entry, whitespace included, starting with the tag name.
    #[must_use]
    pub fn raw_attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Attributes other than whitespace, starting with the tag name.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| !a.is_whitespace())
    }

    /// The name as written, e.g. `a`, `/P` or `!DOCTYPE`.
    ///
    /// # Errors
    ///
    /// Fails with [`LexError::ForeignPage`](crate::error::LexError::ForeignPage)
    /// for a node of another page.
    pub fn raw_name(&self, page: &Page) -> Result<String> {
        page.check(self.page)?;
        let name = self.attributes.first().map(|a| a.name(page)).transpose()?;
        Ok(name.flatten().unwrap_or_default())
    }

    /// The name in upper case without the `/` of an end tag.
    ///
    /// # Errors
    ///
    /// See [`TagNode::raw_name`].
    pub fn name(&self, page: &Page) -> Result<String> {
        let raw = self.raw_name(page)?;
        Ok(raw.strip_prefix('/').unwrap_or(&raw).to_uppercase())
    }

    /// True for `</name>`.
    ///
    /// # Errors
    ///
    /// See [`TagNode::raw_name`].
    pub fn is_end_tag(&self, page: &Page) -> Result<bool> {
        Ok(self.raw_name(page)?.starts_with('/'))
    }

    /// True for a `<% %>` code block.
    ///
    /// # Errors
    ///
    /// See [`TagNode::raw_name`].
    pub fn is_code_block(&self, page: &Page) -> Result<bool> {
        Ok(self.raw_name(page)?.starts_with('%'))
    }

    /// True for `<name ... />`.
    ///
    /// # Errors
    ///
    /// See [`TagNode::raw_name`].
    pub fn is_empty_xml_tag(&self, page: &Page) -> Result<bool> {
        page.check(self.page)?;
        let raw = page.text(self.span.start, self.span.end)?;
        Ok(raw.len() > 2 && raw.ends_with("/>"))
    }

    /// The first attribute with this name, compared case-insensitively. The tag
    /// name itself is not considered.
    ///
    /// # Errors
    ///
    /// Fails with [`LexError::ForeignPage`](crate::error::LexError::ForeignPage)
    /// for a node of another page.
    pub fn attribute(&self, page: &Page, name: &str) -> Result<Option<&Attribute>> {
        page.check(self.page)?;
        for attribute in self.attributes().skip(1) {
            if attribute
                .name(page)?
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
            {
                return Ok(Some(attribute));
            }
        }
        Ok(None)
    }

    /// The value of the named attribute. A standalone attribute has an empty
    /// value; a missing one has none.
    ///
    /// # Errors
    ///
    /// See [`TagNode::attribute`].
    pub fn attribute_value(&self, page: &Page, name: &str) -> Result<Option<String>> {
        match self.attribute(page, name)? {
            Some(attribute) => Ok(Some(attribute.value(page)?.unwrap_or_default())),
            None => Ok(None),
        }
    }
}

/// A lexer output unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Character data.
    Text(TextNode),
    /// A comment.
    Remark(RemarkNode),
    /// A tag.
    Tag(TagNode),
}

impl Node {
    /// Which kind of node this is.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Text(_) => NodeKind::Text,
            Self::Remark(_) => NodeKind::Remark,
            Self::Tag(_) => NodeKind::Tag,
        }
    }

    /// The page this node was read from.
    #[must_use]
    pub const fn page(&self) -> PageId {
        match self {
            Self::Text(node) => node.page,
            Self::Remark(node) => node.page,
            Self::Tag(node) => node.page,
        }
    }

    /// The node's extent in its page.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Text(node) => node.span,
            Self::Remark(node) => node.span,
            Self::Tag(node) => node.span,
        }
    }

    /// Offset of the first character.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.span().start
    }

    /// Offset one past the last character.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.span().end
    }

    /// The node exactly as it appears in the page, delimiters included.
    ///
    /// # Errors
    ///
    /// Fails with [`LexError::ForeignPage`](crate::error::LexError::ForeignPage)
    /// for a node of another page.
    pub fn source_text(&self, page: &Page) -> Result<String> {
        page.check(self.page())?;
        page.text(self.start(), self.end())
    }

    /// The tag, if this is one.
    #[must_use]
    pub const fn as_tag(&self) -> Option<&TagNode> {
        match self {
            Self::Tag(tag) => Some(tag),
            _ => None,
        }
    }
}

/// Builds nodes from the offsets the lexer finds.
///
/// Substitute an implementation to produce a different node representation
/// from the same scan.
pub trait NodeFactory {
    /// The node type produced.
    type Node;

    /// A text run over `start..end`.
    ///
    /// # Errors
    ///
    /// Implementations may fail; the error is passed to the lexer's caller.
    fn make_text(&mut self, page: &Page, start: usize, end: usize) -> Result<Self::Node>;

    /// A comment over `start..end`, delimiters included.
    ///
    /// # Errors
    ///
    /// Implementations may fail; the error is passed to the lexer's caller.
    fn make_comment(&mut self, page: &Page, start: usize, end: usize) -> Result<Self::Node>;

    /// A tag over `start..end` with its attribute list, the tag name first.
    ///
    /// # Errors
    ///
    /// Implementations may fail; the error is passed to the lexer's caller.
    fn make_tag(
        &mut self,
        page: &Page,
        start: usize,
        end: usize,
        attributes: Vec<Attribute>,
    ) -> Result<Self::Node>;
}

/// Produces [`Node`] values.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNodeFactory;

impl NodeFactory for DefaultNodeFactory {
    type Node = Node;

    fn make_text(&mut self, page: &Page, start: usize, end: usize) -> Result<Node> {
        Ok(Node::Text(TextNode::new(page.id(), Span::new(start, end))))
    }

    fn make_comment(&mut self, page: &Page, start: usize, end: usize) -> Result<Node> {
        Ok(Node::Remark(RemarkNode::new(page.id(), Span::new(start, end))))
    }

    fn make_tag(
        &mut self,
        page: &Page,
        start: usize,
        end: usize,
        attributes: Vec<Attribute>,
    ) -> Result<Node> {
        Ok(Node::Tag(TagNode::new(page.id(), Span::new(start, end), attributes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_of(text: &str) -> Page {
        let mut page = Page::from_text_with_charset(text, "UTF-8");
        let mut cursor = page.cursor(0);
        while page.character(&mut cursor).unwrap().is_some() {}
        page
    }

    #[test]
    fn test_remark_body() {
        let page = page_of("<!-- a -->|<!---->|<!>|<!-- b --!>|<!-- c -- >|<!-- open");
        let bodies: Vec<String> = [(0, 10), (11, 18), (19, 22), (23, 34), (35, 46), (47, 56)]
            .into_iter()
            .map(|(s, e)| RemarkNode::new(page.id(), Span::new(s, e)).text(&page).unwrap())
            .collect();
        assert_eq!(bodies, [" a ", "", "", " b ", " c ", " open"]);
    }

    #[test]
    fn test_tag_attribute_lookup() {
        let page = page_of("<a href=x>");
        let tag = TagNode::new(
            page.id(),
            Span::new(0, 10),
            vec![
                Attribute::standalone(Span::new(1, 2)),
                Attribute::whitespace(Span::new(2, 3)),
                Attribute::valued(Span::new(3, 7), Span::new(7, 8), Span::new(8, 9), None),
            ],
        );
        assert_eq!(tag.name(&page).unwrap(), "A");
        assert_eq!(tag.attribute_value(&page, "HREF").unwrap().as_deref(), Some("x"));
        assert_eq!(tag.attribute_value(&page, "a").unwrap(), None);
        assert_eq!(tag.attributes().count(), 2);
        assert!(!tag.is_end_tag(&page).unwrap());
    }

    #[test]
    fn test_foreign_page_rejected() {
        let page = page_of("abc");
        let other = page_of("xyz");
        let node = Node::Text(TextNode::new(other.id(), Span::new(0, 3)));
        assert!(node.source_text(&page).is_err());
        assert_eq!(node.source_text(&other).unwrap(), "xyz");
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(NodeKind::Remark.to_string(), "remark");
    }
}
