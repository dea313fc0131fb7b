//! Position-tracking HTML lexer.
//!
//! # Scope
//!
//! This crate implements:
//! - **Source** - a byte stream decoded into a growable character buffer, with
//!   mark/reset, CR/CRLF normalization and a verified mid-stream charset switch
//! - **Page** - the buffer plus a [`LineIndex`] of line starts, absolute-URL
//!   resolution and the page's origin (URL, base URL, content type)
//! - **Cursor** - a copyable position bound to one page
//! - **Lexer** - a tokenizer producing text, remark (comment) and tag nodes,
//!   with attribute spans, code blocks, opt-in processing instructions and
//!   script/style character data
//!
//! Every node records character offsets into its page, so the exact source
//! of any node can be recovered and concatenating all nodes reproduces the
//! input. Malformed markup is never an error; it degrades to text.
//!
//! ```
//! use pagelex_html::{Lexer, NodeKind, Page};
//!
//! let mut lexer = Lexer::new(Page::from_text("<!-- hi -->\n<a href=x>"));
//! let mut out = Vec::new();
//! for node in lexer.nodes() {
//!     let node = node.unwrap();
//!     out.push((node.kind(), node.start(), node.end()));
//! }
//! assert_eq!(
//!     out,
//!     [(NodeKind::Remark, 0, 11), (NodeKind::Text, 11, 12), (NodeKind::Tag, 12, 22)]
//! );
//! assert_eq!(lexer.page().row(12), 1);
//! ```
//!
//! # Not Implemented
//!
//! - Tree construction; the lexer only splits a page into nodes
//! - Character reference decoding

pub mod charset;
pub mod cursor;
pub mod error;
pub mod index;
pub mod lexer;
pub mod node;
pub mod page;
pub mod source;
pub mod stream;

pub use cursor::Cursor;
pub use error::{LexError, Result};
pub use index::LineIndex;
pub use lexer::{Lexer, Nodes};
pub use node::{Attribute, DefaultNodeFactory, Node, NodeFactory, NodeKind, RemarkNode, Span, TagNode, TextNode};
pub use page::{Page, PageId};
pub use source::Source;
pub use stream::Stream;
