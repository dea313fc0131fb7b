//! Rewindable byte stream underneath a [`Source`](crate::source::Source).
//!
//! The stream keeps every byte it has handed out so that the decoder can be
//! restarted from byte 0 with a different charset. A non-retaining stream can
//! be built for inputs that must not be held in memory; such a page simply
//! cannot change its encoding.

use std::fmt;
use std::io::{self, Read};

use crate::error::{LexError, Result};

/// A byte reader with an optional replay history.
pub struct Stream {
    inner: Option<Box<dyn Read>>,
    history: Vec<u8>,
    position: usize,
    retain: bool,
}

impl Stream {
    /// Wrap a reader, retaining its bytes so the stream can be rewound.
    #[must_use]
    pub fn new(reader: impl Read + 'static) -> Self {
        Self {
            inner: Some(Box::new(reader)),
            history: Vec::new(),
            position: 0,
            retain: true,
        }
    }

    /// Wrap a reader without retaining history. Rewinding fails.
    #[must_use]
    pub fn unbuffered(reader: impl Read + 'static) -> Self {
        Self {
            retain: false,
            ..Self::new(reader)
        }
    }

    /// A stream over bytes already in memory.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            inner: None,
            history: bytes,
            position: 0,
            retain: true,
        }
    }

    /// Whether [`Stream::rewind`] can succeed.
    #[must_use]
    pub const fn can_rewind(&self) -> bool {
        self.retain
    }

    /// Number of bytes handed out since the start (or the last rewind).
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Go back to byte 0.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::UnsupportedRewind`] for a non-retaining stream.
    pub fn rewind(&mut self) -> Result<()> {
        self.restore(0)
    }

    /// Move to a byte position previously returned by [`Stream::position`].
    ///
    /// # Errors
    ///
    /// Returns [`LexError::UnsupportedRewind`] for a non-retaining stream, or if the
    /// position lies beyond the bytes seen so far.
    pub fn restore(&mut self, position: usize) -> Result<()> {
        if !self.retain || position > self.history.len() {
            return Err(LexError::UnsupportedRewind);
        }
        self.position = position;
        Ok(())
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.position < self.history.len() {
            let replay = &self.history[self.position..];
            let count = replay.len().min(buf.len());
            buf[..count].copy_from_slice(&replay[..count]);
            self.position += count;
            return Ok(count);
        }
        let Some(inner) = self.inner.as_mut() else {
            return Ok(0);
        };
        let count = inner.read(buf)?;
        if self.retain {
            self.history.extend_from_slice(&buf[..count]);
        }
        self.position += count;
        Ok(count)
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("position", &self.position)
            .field("retained", &self.history.len())
            .field("retain", &self.retain)
            .finish_non_exhaustive()
    }
}
