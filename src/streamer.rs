//! Adapters between [`ByteSink`]/[`ByteSource`] and [`std::io`].

use crate::{ByteSink, ByteSource, Next, Result, StreamError};
use std::io::{self, Read, Write};

/// A [`Write`] implementation that forwards to a [`ByteSink`].
#[derive(Debug)]
pub struct IoWriter<S: ByteSink> {
    inner: S,
}

/// A [`Read`] implementation that pulls from a [`ByteSource`].
///
/// End of stream is reported as `Ok(0)`.
#[derive(Debug)]
pub struct IoReader<S: ByteSource> {
    inner: S,
}

/// A [`ByteSink`] implementation that writes to a [`Write`].
#[derive(Debug)]
pub struct WriteSink<W: Write> {
    inner: W,
}

/// A [`ByteSource`] implementation that reads from a [`Read`].
#[derive(Debug)]
pub struct ReadSource<R: Read> {
    inner: R,
}

impl<S: ByteSink> IoWriter<S> {
    /// Wrap `inner`.
    #[inline]
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Consume the adapter, returning the sink.
    #[inline]
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ByteSource> IoReader<S> {
    /// Wrap `inner`.
    #[inline]
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Consume the adapter, returning the source.
    #[inline]
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<W: Write> WriteSink<W> {
    /// Wrap `inner`.
    #[inline]
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Consume the adapter, returning the writer.
    #[inline]
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<R: Read> ReadSource<R> {
    /// Wrap `inner`.
    #[inline]
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Consume the adapter, returning the reader.
    #[inline]
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<S: ByteSink> Write for IoWriter<S> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write_bytes(buf)?;
        Ok(buf.len())
    }

    #[inline]
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        Ok(self.inner.write_bytes(buf)?)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        Ok(self.inner.flush()?)
    }
}

impl<S: ByteSource> Read for IoReader<S> {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read_into(buf)? {
            Next::Data(n) => Ok(n),
            Next::EndOfStream => Ok(0),
        }
    }
}

impl<W: Write> ByteSink for WriteSink<W> {
    #[inline]
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        Ok(self.inner.write_all(buf)?)
    }

    #[inline]
    fn flush(&mut self) -> Result<()> {
        Ok(self.inner.flush()?)
    }
}

impl<R: Read> ByteSource for ReadSource<R> {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<Next<usize>> {
        if buf.is_empty() {
            return Ok(Next::Data(0));
        }
        loop {
            match self.inner.read(buf) {
                Ok(0) => return Ok(Next::EndOfStream),
                Ok(n) => return Ok(Next::Data(n)),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(StreamError::Io(err)),
            }
        }
    }
}
