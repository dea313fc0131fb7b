//! Common utilities for the pagelex lexer.
//!
//! This crate provides shared infrastructure used by the lexer and the CLI:
//! - **Warning System** - deduplicated, colored terminal output for recoverable problems
//! - **Fetching** - opening `http(s):` and `data:` URLs as byte streams with their content type
//! - **URL Resolution** - joining relative links against a page's base URL

pub mod net;
pub mod url;
pub mod warning;
