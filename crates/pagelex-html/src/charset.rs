//! Charset names: the process-wide default, canonicalization, and extraction
//! from `Content-Type` style strings.
//!
//! Canonicalization goes through a [`CharsetRegistry`]. The default registry
//! is backed by `encoding_rs` label lookup. [`LiteralRegistry`] stands in for
//! a platform with no registry at all and hands names back unchanged.

use std::sync::{PoisonError, RwLock};

use encoding_rs::Encoding;
use pagelex_common::warning::warn_once;

/// Charset used when a page is constructed without one.
pub const DEFAULT_CHARSET: &str = "ISO-8859-1";

static DEFAULT: RwLock<Option<String>> = RwLock::new(None);

/// The process-wide default charset.
#[must_use]
pub fn default_charset() -> String {
    DEFAULT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .unwrap_or_else(|| DEFAULT_CHARSET.to_string())
}

/// Change the process-wide default charset.
///
/// Only pages constructed afterwards without an explicit charset are affected.
pub fn set_default_charset(charset: &str) {
    *DEFAULT.write().unwrap_or_else(PoisonError::into_inner) = Some(charset.to_string());
}

/// Look up a charset label.
#[must_use]
pub fn lookup(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

/// Outcome of asking a registry for a canonical charset name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Canonical {
    /// The registry knows the label under this canonical name.
    Name(String),
    /// The registry does not know the label.
    Unknown,
    /// There is no registry to ask.
    NoRegistry,
}

/// Resolves charset labels to canonical names.
pub trait CharsetRegistry {
    /// Canonicalize `label`.
    fn canonicalize(&self, label: &str) -> Canonical;
}

/// Registry backed by the WHATWG label table in `encoding_rs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodingRegistry;

impl CharsetRegistry for EncodingRegistry {
    fn canonicalize(&self, label: &str) -> Canonical {
        lookup(label).map_or(Canonical::Unknown, |encoding| {
            Canonical::Name(encoding.name().to_string())
        })
    }
}

/// A registry that knows nothing; every label is passed through literally.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralRegistry;

impl CharsetRegistry for LiteralRegistry {
    fn canonicalize(&self, _label: &str) -> Canonical {
        Canonical::NoRegistry
    }
}

/// Resolve `name` to a canonical charset name.
///
/// A known name resolves to its canonical form. Without a registry the name is
/// used literally. An unknown name yields `fallback`, with a one-time warning.
pub fn find_charset(registry: &dyn CharsetRegistry, name: &str, fallback: &str) -> String {
    match registry.canonicalize(name) {
        Canonical::Name(canonical) => canonical,
        Canonical::NoRegistry => name.to_string(),
        Canonical::Unknown => {
            let _ = warn_once(
                "Charset",
                &format!("unable to determine canonical charset name for {name} - using {fallback}"),
            );
            fallback.to_string()
        }
    }
}

/// Strip one pair of matching surrounding quotes.
fn unquote(value: &str, quote: char) -> &str {
    value
        .strip_prefix(quote)
        .and_then(|rest| rest.strip_suffix(quote))
        .unwrap_or(value)
}

/// Extract the charset named in a `Content-Type` style value.
///
/// Accepts `text/html; charset=UTF-8` and quoted variants such as
/// `text/html; charset="utf-8"`. Returns `fallback` when `content` is absent or
/// names no charset.
///
/// ```
/// use pagelex_html::charset::{EncodingRegistry, charset_from_content_type};
///
/// let name = charset_from_content_type(&EncodingRegistry, Some("text/html; charset='utf8'"), "ISO-8859-1");
/// assert_eq!(name, "UTF-8");
/// ```
pub fn charset_from_content_type(
    registry: &dyn CharsetRegistry,
    content: Option<&str>,
    fallback: &str,
) -> String {
    let Some(content) = content else {
        return fallback.to_string();
    };
    let lower = content.to_ascii_lowercase();
    let Some(index) = lower.find("charset") else {
        return fallback.to_string();
    };
    let rest = content[index + "charset".len()..].trim_start();
    let Some(value) = rest.strip_prefix('=') else {
        return fallback.to_string();
    };
    let value = value.split(';').next().unwrap_or_default().trim();
    let value = unquote(unquote(value, '"'), '\'').trim();
    if value.is_empty() {
        return fallback.to_string();
    }
    find_charset(registry, value, fallback)
}
