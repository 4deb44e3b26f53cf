//! In-memory sinks and sources.

use crate::{bounds::check_range, ByteSink, ByteSource, Next, Result};
use std::{borrow::Cow, cmp::min};

impl ByteSink for Vec<u8> {
    #[inline]
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.push(byte);
        Ok(())
    }

    #[inline]
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.extend_from_slice(buf);
        Ok(())
    }
}

/// Reading from a slice advances it past the bytes read.
impl ByteSource for &[u8] {
    #[inline]
    fn read_into(&mut self, buf: &mut [u8]) -> Result<Next<usize>> {
        if buf.is_empty() {
            return Ok(Next::Data(0));
        }
        if self.is_empty() {
            return Ok(Next::EndOfStream);
        }
        let len = min(self.len(), buf.len());
        let (head, tail) = self.split_at(len);
        buf[..len].copy_from_slice(head);
        *self = tail;
        Ok(Next::Data(len))
    }

    #[inline]
    fn skip(&mut self, n: u64) -> Result<u64> {
        let len = min(n, self.len() as u64) as usize;
        *self = &self[len..];
        Ok(len as u64)
    }

    #[inline]
    fn available(&mut self) -> Result<usize> {
        Ok(self.len())
    }
}

/// A sink that collects everything written to it in a growable buffer.
#[derive(Clone, Debug, Default)]
pub struct ByteArraySink {
    buf: Vec<u8>,
}

impl ByteArraySink {
    /// Create an empty sink.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty sink with room for `capacity` bytes before growing.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if nothing has been written since creation or the
    /// last [`reset`](Self::reset).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Discard the contents, keeping the allocation.
    #[inline]
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// The bytes written so far.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// A copy of the bytes written so far.
    #[inline]
    pub fn to_vec(&self) -> Vec<u8> {
        self.buf.clone()
    }

    /// Consume the sink, returning its bytes.
    #[inline]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    /// The contents decoded as UTF-8, with invalid sequences replaced.
    #[inline]
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.buf)
    }

    /// Write the full contents to another sink.
    #[inline]
    pub fn write_to<S: ByteSink + ?Sized>(&self, out: &mut S) -> Result<()> {
        out.write_bytes(&self.buf)
    }
}

impl ByteSink for ByteArraySink {
    #[inline]
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.buf.push(byte);
        Ok(())
    }

    #[inline]
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(buf);
        Ok(())
    }

    /// Closing has no effect; the contents stay readable.
    #[inline]
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A source that reads from a byte buffer, optionally restricted to a window.
#[derive(Clone, Debug)]
pub struct ByteArraySource<B = Vec<u8>> {
    buf: B,
    pos: usize,
    end: usize,
    mark: usize,
}

impl<B: AsRef<[u8]>> ByteArraySource<B> {
    /// Read all of `buf`.
    #[inline]
    pub fn new(buf: B) -> Self {
        let end = buf.as_ref().len();
        Self {
            buf,
            pos: 0,
            end,
            mark: 0,
        }
    }

    /// Read the `len` bytes of `buf` starting at `offset`.
    pub fn with_range(buf: B, offset: usize, len: usize) -> Result<Self> {
        let range = check_range(buf.as_ref().len(), offset, len)?;
        Ok(Self {
            buf,
            pos: range.start,
            end: range.end,
            mark: range.start,
        })
    }

    /// Remember the current position for a later [`reset`](Self::reset).
    ///
    /// The whole buffer is always retained, so there is no read limit.
    #[inline]
    pub fn mark(&mut self) {
        self.mark = self.pos;
    }

    /// Return to the last mark, or to the start of the window if none was
    /// set.
    #[inline]
    pub fn reset(&mut self) {
        self.pos = self.mark;
    }

    /// The unread part of the window.
    #[inline]
    pub fn remaining(&self) -> &[u8] {
        &self.buf.as_ref()[self.pos..self.end]
    }

    /// Consume the source, returning the underlying buffer.
    #[inline]
    pub fn into_inner(self) -> B {
        self.buf
    }
}

impl<B: AsRef<[u8]>> ByteSource for ByteArraySource<B> {
    #[inline]
    fn read_byte(&mut self) -> Result<Next<u8>> {
        if self.pos >= self.end {
            return Ok(Next::EndOfStream);
        }
        let byte = self.buf.as_ref()[self.pos];
        self.pos += 1;
        Ok(Next::Data(byte))
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<Next<usize>> {
        if buf.is_empty() {
            return Ok(Next::Data(0));
        }
        if self.pos >= self.end {
            return Ok(Next::EndOfStream);
        }
        let len = min(self.end - self.pos, buf.len());
        buf[..len].copy_from_slice(&self.buf.as_ref()[self.pos..self.pos + len]);
        self.pos += len;
        Ok(Next::Data(len))
    }

    #[inline]
    fn skip(&mut self, n: u64) -> Result<u64> {
        let remaining = self.end - self.pos;
        let n = usize::try_from(n).unwrap_or(usize::MAX);
        let len = min(n, remaining);
        self.pos += len;
        Ok(len as u64)
    }

    #[inline]
    fn available(&mut self) -> Result<usize> {
        Ok(self.end - self.pos)
    }
}
