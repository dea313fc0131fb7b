//! Character source: a growable, re-readable buffer over a byte decoder.
//!
//! Bytes are pulled from the [`Stream`] only when a read reaches the end of
//! what has already been decoded. Decoded characters are kept for the life of
//! the source, so any offset that was once handed out stays addressable.
//!
//! Line terminators are normalized as characters enter the buffer: a CR, or a
//! CR LF pair, becomes a single LF. Offsets therefore address normalized text.

use std::fmt;
use std::io::{ErrorKind, Read};

use encoding_rs::{CoderResult, Decoder, Encoding};

use crate::charset;
use crate::error::{LexError, Result};
use crate::stream::Stream;

/// Initial size of the character buffer.
const BUFFER_SIZE: usize = 16384;

/// Number of bytes decoded per fill.
const CHUNK_SIZE: usize = 4096;

/// A decoded, re-readable character stream.
///
/// Invariant: `offset <= level <= buffer.len()`.
pub struct Source {
    stream: Option<Stream>,
    encoding: &'static Encoding,
    decoder: Decoder,
    /// Decoded characters; only `..level` is meaningful.
    buffer: Vec<char>,
    /// Count of valid decoded characters.
    level: usize,
    /// Index of the next character to hand out.
    offset: usize,
    mark: Option<usize>,
    /// The last character pushed was a CR turned into LF.
    pending_cr: bool,
    /// The stream returned end of input and the decoder was flushed.
    exhausted: bool,
    scratch: String,
}

impl Source {
    /// Create a source decoding `stream` with the named charset.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::UnsupportedCharset`] if the label is unknown.
    pub fn new(stream: Stream, charset: &str) -> Result<Self> {
        let encoding = charset::lookup(charset)
            .ok_or_else(|| LexError::UnsupportedCharset(charset.to_string()))?;
        Ok(Self::with_encoding(stream, encoding))
    }

    /// Create a source decoding `stream` with an already resolved encoding.
    #[must_use]
    pub fn with_encoding(stream: Stream, encoding: &'static Encoding) -> Self {
        Self {
            stream: Some(stream),
            encoding,
            decoder: encoding.new_decoder_with_bom_removal(),
            buffer: vec!['\0'; BUFFER_SIZE],
            level: 0,
            offset: 0,
            mark: None,
            pending_cr: false,
            exhausted: false,
            scratch: String::new(),
        }
    }

    /// Canonical name of the charset in use.
    #[must_use]
    pub fn encoding(&self) -> &'static str {
        self.encoding.name()
    }

    /// The encoding in use.
    #[must_use]
    pub const fn encoding_ref(&self) -> &'static Encoding {
        self.encoding
    }

    /// Index of the next character to hand out.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Number of characters decoded so far.
    #[must_use]
    pub const fn level(&self) -> usize {
        self.level
    }

    /// Characters decoded but not yet handed out.
    #[must_use]
    pub const fn available(&self) -> usize {
        self.level - self.offset
    }

    /// Whether a read can be satisfied without touching the stream.
    #[must_use]
    pub const fn ready(&self) -> bool {
        self.offset < self.level
    }

    /// True once [`Source::destroy`] has been called.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(LexError::Closed)
        } else {
            Ok(())
        }
    }

    /// Make room for `needed` characters: at least double, or exactly enough.
    fn grow(&mut self, needed: usize) {
        let size = needed.max(self.buffer.len() * 2);
        self.buffer.resize(size, '\0');
    }

    fn push(&mut self, c: char) {
        if self.level == self.buffer.len() {
            self.grow(self.level + 1);
        }
        self.buffer[self.level] = c;
        self.level += 1;
    }

    fn push_normalized(&mut self, c: char) {
        match c {
            '\r' => {
                self.push('\n');
                self.pending_cr = true;
            }
            '\n' if self.pending_cr => self.pending_cr = false,
            _ => {
                self.pending_cr = false;
                self.push(c);
            }
        }
    }

    fn decode_chunk(&mut self, bytes: &[u8], last: bool) {
        self.scratch.clear();
        let mut input = bytes;
        loop {
            let room = self
                .decoder
                .max_utf8_buffer_length(input.len())
                .unwrap_or(input.len() * 3 + 16);
            self.scratch.reserve(room);
            let (result, read, _replaced) =
                self.decoder.decode_to_string(input, &mut self.scratch, last);
            input = &input[read..];
            if result == CoderResult::InputEmpty {
                break;
            }
        }
        let decoded = std::mem::take(&mut self.scratch);
        for c in decoded.chars() {
            self.push_normalized(c);
        }
        self.scratch = decoded;
    }

    /// Decode until at least `wanted` characters are available past `offset`,
    /// or the stream ends.
    fn fill(&mut self, wanted: usize) -> Result<()> {
        let target = self.offset + wanted;
        let mut bytes = [0u8; CHUNK_SIZE];
        while self.level < target && !self.exhausted {
            let stream = self.stream.as_mut().ok_or(LexError::Closed)?;
            let count = loop {
                match stream.read(&mut bytes) {
                    Ok(count) => break count,
                    Err(e) if e.kind() == ErrorKind::Interrupted => {}
                    Err(e) => return Err(e.into()),
                }
            };
            let last = count == 0;
            self.decode_chunk(&bytes[..count], last);
            if last {
                self.exhausted = true;
                log::trace!(target: "pagelex::source", "source exhausted at {} characters", self.level);
            }
        }
        Ok(())
    }

    /// Read one character, or `None` at end of input.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::Closed`] after [`Source::destroy`], or an I/O error from the stream.
    pub fn read(&mut self) -> Result<Option<char>> {
        self.ensure_open()?;
        if self.offset >= self.level {
            self.fill(1)?;
        }
        if self.offset < self.level {
            let c = self.buffer[self.offset];
            self.offset += 1;
            Ok(Some(c))
        } else {
            Ok(None)
        }
    }

    /// Read up to `dst.len()` characters into `dst`.
    ///
    /// Returns the number read, or `None` at end of input.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::Closed`] after [`Source::destroy`], or an I/O error from the stream.
    pub fn read_into(&mut self, dst: &mut [char]) -> Result<Option<usize>> {
        self.ensure_open()?;
        if dst.is_empty() {
            return Ok(Some(0));
        }
        if self.offset >= self.level {
            self.fill(dst.len())?;
        }
        let count = dst.len().min(self.level - self.offset);
        if count == 0 {
            return Ok(None);
        }
        dst[..count].copy_from_slice(&self.buffer[self.offset..self.offset + count]);
        self.offset += count;
        Ok(Some(count))
    }

    /// Remember the current offset. Replaces any earlier mark.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::Closed`] after [`Source::destroy`].
    pub fn mark(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.mark = Some(self.offset);
        Ok(())
    }

    /// Go back to the mark, or to the start if no mark was set.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::Closed`] after [`Source::destroy`].
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.offset = self.mark.unwrap_or(0);
        Ok(())
    }

    /// Step back one character.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::UnreadAtStart`] if nothing has been read, or
    /// [`LexError::Closed`] after [`Source::destroy`].
    pub fn unread(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.offset == 0 {
            return Err(LexError::UnreadAtStart);
        }
        self.offset -= 1;
        Ok(())
    }

    /// Skip up to `count` characters, returning how many were skipped.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::Closed`] after [`Source::destroy`], or an I/O error from the stream.
    pub fn skip(&mut self, count: usize) -> Result<usize> {
        self.ensure_open()?;
        if self.available() < count {
            self.fill(count)?;
        }
        let skipped = count.min(self.available());
        self.offset += skipped;
        Ok(skipped)
    }

    /// A character that has already been handed out.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::FutureRead`] if `position` has not been read yet, or
    /// [`LexError::Closed`] after [`Source::destroy`].
    pub fn character_at(&self, position: usize) -> Result<char> {
        self.ensure_open()?;
        if position >= self.offset {
            return Err(LexError::FutureRead {
                position,
                offset: self.offset,
            });
        }
        Ok(self.buffer[position])
    }

    /// The characters in `start..end`, all of which must have been handed out.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::FutureRead`] if `end` is past the offset, or
    /// [`LexError::Closed`] after [`Source::destroy`].
    pub fn slice(&self, start: usize, end: usize) -> Result<&[char]> {
        self.ensure_open()?;
        if end > self.offset || start > end {
            return Err(LexError::FutureRead {
                position: end.max(start),
                offset: self.offset,
            });
        }
        Ok(&self.buffer[start..end])
    }

    /// `length` characters starting at `start`, as a string.
    ///
    /// # Errors
    ///
    /// See [`Source::slice`].
    pub fn string(&self, start: usize, length: usize) -> Result<String> {
        Ok(self.slice(start, start + length)?.iter().collect())
    }

    /// No-op. The buffer must stay readable by position after a close.
    ///
    /// # Errors
    ///
    /// Never fails; the signature mirrors [`Source::destroy`].
    pub const fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Release the stream and the buffer. Every later operation fails with
    /// [`LexError::Closed`].
    pub fn destroy(&mut self) {
        self.stream = None;
        self.buffer = Vec::new();
        self.level = 0;
        self.offset = 0;
        self.mark = None;
        self.exhausted = true;
    }

    /// Re-decode everything handed out so far with `encoding` and switch to it.
    ///
    /// The stream is rewound to byte 0 and `offset` characters are decoded
    /// again. If they all match, decoding continues with the new encoding.
    /// Otherwise the source is left exactly as it was and
    /// [`LexError::EncodingChange`] is returned.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::UnsupportedRewind`] if the stream keeps no history,
    /// [`LexError::EncodingChange`] on a mismatch, or an I/O error.
    pub fn set_encoding(&mut self, encoding: &'static Encoding) -> Result<()> {
        self.ensure_open()?;
        if encoding == self.encoding {
            return Ok(());
        }
        let Some(mut stream) = self.stream.take() else {
            return Err(LexError::Closed);
        };
        if !stream.can_rewind() {
            self.stream = Some(stream);
            return Err(LexError::UnsupportedRewind);
        }
        let saved = stream.position();
        if let Err(e) = stream.rewind() {
            self.stream = Some(stream);
            return Err(e);
        }

        let mut fresh = Self::with_encoding(stream, encoding);
        let outcome = fresh.compare_prefix(&self.buffer[..self.offset]);
        match outcome {
            Ok(None) => {
                log::debug!(
                    target: "pagelex::source",
                    "encoding changed from {} to {} after {} characters",
                    self.encoding.name(),
                    encoding.name(),
                    self.offset
                );
                fresh.mark = None;
                *self = fresh;
                Ok(())
            }
            Ok(Some((position, new))) => {
                let old = self.buffer[position];
                self.restore_stream(fresh, saved)?;
                Err(LexError::EncodingChange {
                    position,
                    new,
                    old,
                    from: self.encoding.name().to_string(),
                    to: encoding.name().to_string(),
                })
            }
            Err(e) => {
                self.restore_stream(fresh, saved)?;
                Err(e)
            }
        }
    }

    /// Decode `expected.len()` characters and report the first mismatch.
    fn compare_prefix(&mut self, expected: &[char]) -> Result<Option<(usize, Option<char>)>> {
        for (position, &old) in expected.iter().enumerate() {
            let new = self.read()?;
            if new != Some(old) {
                return Ok(Some((position, new)));
            }
        }
        Ok(None)
    }

    /// Take the stream back from `fresh` and return it to `saved`. The stream
    /// is reinstated even when the restore fails.
    fn restore_stream(&mut self, fresh: Self, saved: usize) -> Result<()> {
        let mut stream = fresh.stream.ok_or(LexError::Closed)?;
        let restored = stream.restore(saved);
        self.stream = Some(stream);
        restored
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("encoding", &self.encoding.name())
            .field("level", &self.level)
            .field("offset", &self.offset)
            .field("mark", &self.mark)
            .field("capacity", &self.buffer.len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
