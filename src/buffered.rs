//! Buffering decorators.
//!
//! [`BufferedSink`] coalesces small writes into one fixed-capacity buffer and
//! forwards large writes directly. [`BufferedSource`] reads ahead into a
//! buffer and supports `mark`/`reset`.

use crate::{
    config::DEFAULT_BUFFER_CAPACITY, ByteSink, ByteSource, Next, Result, StreamConfig,
    StreamError,
};
use std::cmp::{max, min};

fn validate_capacity(capacity: usize) -> Result<usize> {
    if capacity == 0 {
        return Err(StreamError::InvalidArgument("buffer size <= 0"));
    }
    Ok(capacity)
}

/// A sink that buffers writes to another sink.
///
/// Writes of at least `capacity` bytes bypass the buffer: pending bytes are
/// flushed first and the whole range is then handed to the target in one
/// call. The buffer is never partially flushed.
///
/// After [`close`](ByteSink::close), every operation other than `close`
/// fails with [`StreamError::Closed`].
#[derive(Debug)]
pub struct BufferedSink<S: ByteSink> {
    inner: S,
    // `None` once closed.
    buf: Option<Box<[u8]>>,
    capacity: usize,
    count: usize,
}

impl<S: ByteSink> BufferedSink<S> {
    /// Wrap `inner` with a buffer of the default capacity.
    #[inline]
    pub fn new(inner: S) -> Self {
        Self::from_parts(inner, DEFAULT_BUFFER_CAPACITY)
    }

    /// Wrap `inner` with a buffer of `capacity` bytes, which must be
    /// positive.
    #[inline]
    pub fn with_capacity(inner: S, capacity: usize) -> Result<Self> {
        Ok(Self::from_parts(inner, validate_capacity(capacity)?))
    }

    /// Wrap `inner` with a buffer sized by `config`.
    #[inline]
    pub fn with_config(inner: S, config: &StreamConfig) -> Result<Self> {
        Self::with_capacity(inner, config.buffer_capacity)
    }

    fn from_parts(inner: S, capacity: usize) -> Self {
        Self {
            inner,
            buf: Some(vec![0_u8; capacity].into_boxed_slice()),
            capacity,
            count: 0,
        }
    }

    /// The fixed buffer capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes currently held in the buffer.
    #[inline]
    pub fn buffered_len(&self) -> usize {
        self.count
    }

    /// Returns `true` after [`close`](ByteSink::close).
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.buf.is_none()
    }

    /// The wrapped sink.
    #[inline]
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// The wrapped sink. Writing to it directly bypasses buffered bytes.
    #[inline]
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    fn buffer_mut(&mut self) -> Result<&mut [u8]> {
        self.buf.as_deref_mut().ok_or(StreamError::Closed)
    }

    /// Hand every buffered byte to the target and empty the buffer.
    fn flush_buffer(&mut self) -> Result<()> {
        let buf = self.buf.as_deref().ok_or(StreamError::Closed)?;
        if self.count > 0 {
            tracing::trace!(bytes = self.count, "flushing buffered sink");
            self.inner.write_bytes(&buf[..self.count])?;
            self.count = 0;
        }
        Ok(())
    }
}

impl<S: ByteSink> ByteSink for BufferedSink<S> {
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        if self.count == self.capacity {
            self.flush_buffer()?;
        }
        let count = self.count;
        self.buffer_mut()?[count] = byte;
        self.count += 1;
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        if self.is_closed() {
            return Err(StreamError::Closed);
        }
        if data.len() >= self.capacity {
            self.flush_buffer()?;
            return self.inner.write_bytes(data);
        }
        if data.len() > self.capacity - self.count {
            self.flush_buffer()?;
        }
        let count = self.count;
        self.buffer_mut()?[count..count + data.len()].copy_from_slice(data);
        self.count += data.len();
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flush_buffer()?;
        self.inner.flush()
    }

    /// Flush, then close the target even if flushing failed. The first
    /// failure is returned. Closing again has no effect.
    fn close(&mut self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        let flushed = self.flush();
        self.buf = None;
        self.count = 0;
        let closed = self.inner.close();
        if let Err(err) = &flushed {
            tracing::debug!(%err, "flush failed while closing buffered sink");
        }
        flushed.and(closed)
    }
}

impl<S: ByteSink> Drop for BufferedSink<S> {
    fn drop(&mut self) {
        if self.count > 0 {
            if let Err(err) = self.flush_buffer() {
                tracing::warn!(
                    %err,
                    lost = self.count,
                    "dropping buffered sink with unflushed bytes"
                );
            }
        }
    }
}

/// A source that reads ahead from another source into a buffer.
///
/// Supports [`mark`](Self::mark) and [`reset`](Self::reset); the buffer
/// grows up to the mark's read limit to keep a mark valid.
#[derive(Debug)]
pub struct BufferedSource<S: ByteSource> {
    inner: S,
    // `None` once closed.
    buf: Option<Vec<u8>>,
    pos: usize,
    count: usize,
    mark: Option<usize>,
    mark_limit: usize,
}

impl<S: ByteSource> BufferedSource<S> {
    /// Wrap `inner` with a buffer of the default capacity.
    #[inline]
    pub fn new(inner: S) -> Self {
        Self::from_parts(inner, DEFAULT_BUFFER_CAPACITY)
    }

    /// Wrap `inner` with a buffer of `capacity` bytes, which must be
    /// positive.
    #[inline]
    pub fn with_capacity(inner: S, capacity: usize) -> Result<Self> {
        Ok(Self::from_parts(inner, validate_capacity(capacity)?))
    }

    /// Wrap `inner` with a buffer sized by `config`.
    #[inline]
    pub fn with_config(inner: S, config: &StreamConfig) -> Result<Self> {
        Self::with_capacity(inner, config.buffer_capacity)
    }

    fn from_parts(inner: S, capacity: usize) -> Self {
        Self {
            inner,
            buf: Some(vec![0_u8; capacity]),
            pos: 0,
            count: 0,
            mark: None,
            mark_limit: 0,
        }
    }

    /// Number of bytes read ahead and not yet consumed.
    #[inline]
    pub fn buffered_len(&self) -> usize {
        self.count - self.pos
    }

    /// The wrapped source.
    #[inline]
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Remember the current position. A later [`reset`](Self::reset)
    /// returns here as long as no more than `read_limit` bytes (or the
    /// buffer capacity, if larger) have been read in between.
    #[inline]
    pub fn mark(&mut self, read_limit: usize) {
        self.mark_limit = read_limit;
        self.mark = Some(self.pos);
    }

    /// Return to the last mark.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.pos = self.mark.ok_or(StreamError::InvalidMark)?;
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        match self.buf {
            Some(_) => Ok(()),
            None => Err(StreamError::Closed),
        }
    }

    /// Read more bytes from the source, keeping marked bytes if a mark is
    /// live. Leaves `pos == count` at end of stream.
    fn fill(&mut self) -> Result<()> {
        let buf = self.buf.as_mut().ok_or(StreamError::Closed)?;
        match self.mark {
            None => self.pos = 0,
            Some(mark) if self.pos >= buf.len() => {
                if mark > 0 {
                    buf.copy_within(mark..self.pos, 0);
                    self.pos -= mark;
                    self.mark = Some(0);
                } else if buf.len() >= self.mark_limit {
                    self.mark = None;
                    self.pos = 0;
                } else {
                    let grown = min(max(self.pos * 2, 1), self.mark_limit);
                    buf.resize(grown, 0);
                }
            }
            Some(_) => {}
        }
        self.count = self.pos;
        if let Next::Data(n) = self.inner.read_into(&mut buf[self.pos..])? {
            self.count = self.pos + n;
        }
        Ok(())
    }

    /// Read from the buffer, refilling it at most once.
    fn read_once(&mut self, dst: &mut [u8]) -> Result<Next<usize>> {
        if self.pos >= self.count {
            let capacity = self.buf.as_ref().map_or(0, Vec::len);
            if dst.len() >= capacity && self.mark.is_none() {
                return self.inner.read_into(dst);
            }
            self.fill()?;
            if self.pos >= self.count {
                return Ok(Next::EndOfStream);
            }
        }
        let buf = self.buf.as_deref().ok_or(StreamError::Closed)?;
        let len = min(self.count - self.pos, dst.len());
        dst[..len].copy_from_slice(&buf[self.pos..self.pos + len]);
        self.pos += len;
        Ok(Next::Data(len))
    }
}

impl<S: ByteSource> ByteSource for BufferedSource<S> {
    fn read_byte(&mut self) -> Result<Next<u8>> {
        self.ensure_open()?;
        if self.pos >= self.count {
            self.fill()?;
            if self.pos >= self.count {
                return Ok(Next::EndOfStream);
            }
        }
        let byte = self.buf.as_deref().ok_or(StreamError::Closed)?[self.pos];
        self.pos += 1;
        Ok(Next::Data(byte))
    }

    fn read_into(&mut self, dst: &mut [u8]) -> Result<Next<usize>> {
        self.ensure_open()?;
        if dst.is_empty() {
            return Ok(Next::Data(0));
        }
        let mut n = 0;
        loop {
            match self.read_once(&mut dst[n..])? {
                Next::Data(got) => n += got,
                Next::EndOfStream if n == 0 => return Ok(Next::EndOfStream),
                Next::EndOfStream => return Ok(Next::Data(n)),
            }
            if n >= dst.len() || self.inner.available()? == 0 {
                return Ok(Next::Data(n));
            }
        }
    }

    fn skip(&mut self, n: u64) -> Result<u64> {
        self.ensure_open()?;
        if n == 0 {
            return Ok(0);
        }
        if self.pos >= self.count {
            if self.mark.is_none() {
                return self.inner.skip(n);
            }
            self.fill()?;
            if self.pos >= self.count {
                return Ok(0);
            }
        }
        let skipped = min((self.count - self.pos) as u64, n);
        self.pos += skipped as usize;
        Ok(skipped)
    }

    fn available(&mut self) -> Result<usize> {
        self.ensure_open()?;
        Ok((self.count - self.pos).saturating_add(self.inner.available()?))
    }

    /// Release the buffer and close the source. Closing again has no
    /// effect.
    fn close(&mut self) -> Result<()> {
        if self.buf.take().is_none() {
            return Ok(());
        }
        self.pos = 0;
        self.count = 0;
        self.mark = None;
        tracing::debug!("closing buffered source");
        self.inner.close()
    }
}
