//! The lexer: turns a page into a flat sequence of nodes.
//!
//! Each call to [`Lexer::next_node`] looks at the next character and hands
//! off to one of the scanners below. None of them fail on malformed markup;
//! anything that does not scan as what it first looked like is re-made as
//! text, so every call either makes progress or reports end of input.

/// CDATA scanning for the bodies of `script`, `style` and similar elements.
pub mod cdata;
/// `<% %>` code blocks and `<? ?>` processing instructions.
pub mod code_block;
/// The lexer itself and its top-level dispatch.
pub mod dispatch;
/// Lookahead and node construction shared by the scanners.
mod helpers;
/// `<meta charset>` and `<base href>` handling.
mod meta;
/// `<!-- -->` comments.
pub mod remark;
/// Tags and their attribute lists.
pub mod tag;
/// Text runs, with optional quote and comment awareness.
pub mod text;

pub use dispatch::{Lexer, Nodes};
