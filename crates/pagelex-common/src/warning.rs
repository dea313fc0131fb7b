//! Lexer warnings with colored terminal output.
//!
//! Provides deduplication to avoid spamming the same warning multiple times.
//! Used by the page and charset code to report recoverable problems such as an
//! unknown charset label or text that the requested charset cannot represent.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use owo_colors::OwoColorize;

/// Global set of warnings we've already printed (to deduplicate)
static WARNED: Mutex<Option<HashSet<String>>> = Mutex::new(None);

/// When false, warnings are still recorded but nothing is printed.
static ENABLED: AtomicBool = AtomicBool::new(true);

/// Warn about a recoverable problem (prints once per unique message).
///
/// Returns `true` if this is the first time the message was seen.
///
/// # Example
/// ```
/// use pagelex_common::warning::warn_once;
///
/// let first = warn_once("Charset", "unknown charset 'x-klingon', using ISO-8859-1");
/// let again = warn_once("Charset", "unknown charset 'x-klingon', using ISO-8859-1");
/// assert!(first || !again);
/// ```
pub fn warn_once(component: &str, message: &str) -> bool {
    let key = format!("[{component}] {message}");
    let first = WARNED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get_or_insert_with(HashSet::new)
        .insert(key);

    if first {
        log::warn!(target: "pagelex", "[{component}] {message}");
        if ENABLED.load(Ordering::Relaxed) {
            eprintln!("{}", format!("[pagelex {component}] ⚠ {message}").yellow());
        }
    }
    first
}

/// Turn terminal output of warnings on or off.
///
/// Deduplication and the `log` record are unaffected.
pub fn set_warnings_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

/// Clear all recorded warnings (call when lexing a new page)
pub fn clear_warnings() {
    let mut guard = WARNED.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(set) = guard.as_mut() {
        set.clear();
    }
}
