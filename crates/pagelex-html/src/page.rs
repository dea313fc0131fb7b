//! A page: one character source, its line index, and where it came from.
//!
//! The page is the only thing that advances the source. Everything else reads
//! through [`Page::character`] with a [`Cursor`], which either replays an
//! already decoded character or, at the fill point, decodes the next one.

use std::cmp::Ordering;
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use pagelex_common::net::{self, Connection};
use pagelex_common::url::resolve_url;
use pagelex_common::warning::warn_once;

use crate::charset::{self, EncodingRegistry};
use crate::cursor::Cursor;
use crate::error::{LexError, Result};
use crate::index::LineIndex;
use crate::source::Source;
use crate::stream::Stream;

static NEXT_PAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a page. Cursors and nodes carry it so that they can only be
/// resolved against the page that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId(u64);

impl PageId {
    fn next() -> Self {
        Self(NEXT_PAGE_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

/// A decoded HTML page with line tracking.
#[derive(Debug)]
pub struct Page {
    id: PageId,
    source: Source,
    index: LineIndex,
    url: Option<String>,
    base_url: Option<String>,
    content_type: Option<String>,
}

impl Page {
    fn with_source(source: Source) -> Self {
        Self {
            id: PageId::next(),
            source,
            index: LineIndex::new(),
            url: None,
            base_url: None,
            content_type: None,
        }
    }

    /// A page over a byte stream. Without a charset the process-wide default is
    /// used.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::UnsupportedCharset`] for an unknown charset.
    pub fn from_stream(stream: Stream, charset: Option<&str>) -> Result<Self> {
        let charset = charset.map_or_else(charset::default_charset, str::to_string);
        Ok(Self::with_source(Source::new(stream, &charset)?))
    }

    /// A page over any reader. The bytes read are retained so the encoding can
    /// be changed later.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::UnsupportedCharset`] for an unknown charset.
    pub fn from_reader(reader: impl Read + 'static, charset: Option<&str>) -> Result<Self> {
        Self::from_stream(Stream::new(reader), charset)
    }

    /// A page over bytes already in memory.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::UnsupportedCharset`] for an unknown charset.
    pub fn from_bytes(bytes: Vec<u8>, charset: Option<&str>) -> Result<Self> {
        Self::from_stream(Stream::from_bytes(bytes), charset)
    }

    /// A page over literal text, encoded with the process-wide default charset.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self::from_text_with_charset(text, &charset::default_charset())
    }

    /// A page over literal text, encoded with `charset`.
    ///
    /// If the charset is unknown or cannot represent the text, the page falls
    /// back to UTF-8 and a warning is issued.
    #[must_use]
    pub fn from_text_with_charset(text: &str, charset: &str) -> Self {
        let requested = charset::lookup(charset);
        let encoded = requested.and_then(|encoding| {
            let (bytes, used, had_errors) = encoding.encode(text);
            (!had_errors && used == encoding).then(|| (bytes.into_owned(), encoding))
        });
        let (bytes, encoding) = encoded.unwrap_or_else(|| {
            let _ = warn_once(
                "Page",
                &format!("text cannot be encoded as {charset} - using UTF-8"),
            );
            (text.as_bytes().to_vec(), encoding_rs::UTF_8)
        });
        Self::with_source(Source::with_encoding(Stream::from_bytes(bytes), encoding))
    }

    /// Fetch a page. `http` and `https` go over the network; `data:` and
    /// `file://` URLs are read locally.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::Fetch`] if the resource cannot be opened.
    pub fn from_url(url: &str) -> Result<Self> {
        Self::from_connection(net::open(url)?)
    }

    /// A page over an opened connection. The charset comes from the
    /// connection's content type, or the process-wide default.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::UnsupportedCharset`] if the charset cannot be decoded.
    pub fn from_connection(connection: Connection) -> Result<Self> {
        let (url, content_type, body) = connection.into_parts();
        let charset = charset::charset_from_content_type(
            &EncodingRegistry,
            content_type.as_deref(),
            &charset::default_charset(),
        );
        log::debug!(target: "pagelex::page", "opened {url} as {charset}");
        let mut page = Self::from_stream(Stream::new(body), Some(&charset))?;
        page.url = Some(url);
        page.content_type = content_type;
        Ok(page)
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// This page's identity.
    #[must_use]
    pub const fn id(&self) -> PageId {
        self.id
    }

    /// A cursor into this page.
    #[must_use]
    pub const fn cursor(&self, position: usize) -> Cursor {
        Cursor::new(self.id, position)
    }

    pub(crate) fn check(&self, page: PageId) -> Result<()> {
        if page == self.id {
            Ok(())
        } else {
            Err(LexError::ForeignPage)
        }
    }

    /// Read the character at the cursor and advance it.
    ///
    /// Behind the fill offset this replays a decoded character. At the fill
    /// offset it decodes the next one, recording a line start after each LF.
    /// Returns `None` at end of input.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::FutureRead`] if the cursor is past the fill offset,
    /// [`LexError::ForeignPage`] for another page's cursor,
    /// [`LexError::Closed`] after [`Page::destroy`], or an I/O error.
    pub fn character(&mut self, cursor: &mut Cursor) -> Result<Option<char>> {
        self.check(cursor.page())?;
        if self.source.is_closed() {
            return Err(LexError::Closed);
        }
        let position = cursor.position();
        let offset = self.source.offset();
        match position.cmp(&offset) {
            Ordering::Less => {
                let c = self.source.character_at(position)?;
                cursor.advance();
                Ok(Some(c))
            }
            Ordering::Equal => {
                let Some(c) = self.source.read()? else {
                    return Ok(None);
                };
                cursor.advance();
                if c == '\n' {
                    self.index.record_line_start(cursor.position());
                }
                Ok(Some(c))
            }
            Ordering::Greater => Err(LexError::FutureRead { position, offset }),
        }
    }

    /// Number of characters read so far.
    #[must_use]
    pub const fn fill_offset(&self) -> usize {
        self.source.offset()
    }

    /// Text between two offsets. Reversed bounds are swapped.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::FutureRead`] if either bound is past the fill offset.
    pub fn text(&self, start: usize, end: usize) -> Result<String> {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Ok(self.source.slice(start, end)?.iter().collect())
    }

    /// All text read so far.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::Closed`] after [`Page::destroy`].
    pub fn text_to_fill(&self) -> Result<String> {
        self.text(0, self.fill_offset())
    }

    /// Zero-based line of `offset`.
    #[must_use]
    pub fn row(&self, offset: usize) -> usize {
        self.index.line_of(offset)
    }

    /// Zero-based column of `offset`.
    #[must_use]
    pub fn column(&self, offset: usize) -> usize {
        self.index.column_of(offset)
    }

    /// Text of the line containing `offset`, without its LF. The line being
    /// read is cut at the fill offset.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::Closed`] after [`Page::destroy`].
    pub fn line(&self, offset: usize) -> Result<String> {
        let fill = self.fill_offset();
        let line = self.index.line_of(offset.min(fill));
        let (start, end) = self.index.line_span(line, fill).unwrap_or((fill, fill));
        self.text(start, end)
    }

    /// The line index.
    #[must_use]
    pub const fn index(&self) -> &LineIndex {
        &self.index
    }

    /// The character source.
    #[must_use]
    pub const fn source(&self) -> &Source {
        &self.source
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    /// Canonical name of the charset in use.
    #[must_use]
    pub fn encoding(&self) -> &'static str {
        self.source.encoding()
    }

    /// Switch to another charset, verifying that everything read so far
    /// decodes identically. Does nothing if the charset is already in use.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::EncodingChange`] if previously read characters would
    /// differ (the page is left untouched), [`LexError::UnsupportedRewind`] if
    /// the bytes were not retained, or [`LexError::UnsupportedCharset`].
    pub fn set_encoding(&mut self, charset: &str) -> Result<()> {
        let encoding =
            charset::lookup(charset).ok_or_else(|| LexError::UnsupportedCharset(charset.to_string()))?;
        if encoding == self.source.encoding_ref() {
            return Ok(());
        }
        self.source.set_encoding(encoding)
    }

    /// The charset named by a `Content-Type` value, canonicalized, or the
    /// process-wide default.
    #[must_use]
    pub fn charset_from_content_type(content: Option<&str>) -> String {
        charset::charset_from_content_type(&EncodingRegistry, content, &charset::default_charset())
    }

    // =========================================================================
    // Origin
    // =========================================================================

    /// Where the page was fetched from.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Record where the page came from.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = Some(url.into());
    }

    /// Base URL for relative links, if one was set (e.g. from `<base href>`).
    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Override the base URL for relative links.
    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = Some(base_url.into());
    }

    /// The content type reported when the page was fetched.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Resolve `link` against the base URL, or the page URL if there is none.
    #[must_use]
    pub fn absolute_url(&self, link: &str) -> String {
        resolve_url(link, self.base_url().or_else(|| self.url()))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// No-op; the page stays readable.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub const fn close(&self) -> Result<()> {
        self.source.close()
    }

    /// Release the byte stream and the character buffer. The page must not be
    /// read afterwards; reads fail with [`LexError::Closed`].
    pub fn destroy(&mut self) {
        self.source.destroy();
    }
}
