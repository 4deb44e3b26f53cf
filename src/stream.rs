use crate::{bounds::check_range, Result};
use std::cmp::min;

/// The outcome of a read: either data, or the end of the stream.
///
/// End of stream is an ordinary outcome rather than an error, so it is kept
/// out of the error channel entirely.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Next<T> {
    /// A byte, or a count of elements read.
    Data(T),
    /// No more data will ever be produced.
    EndOfStream,
}

impl<T> Next<T> {
    /// Returns the data, or `None` at end of stream.
    #[inline]
    pub fn data(self) -> Option<T> {
        match self {
            Next::Data(t) => Some(t),
            Next::EndOfStream => None,
        }
    }

    /// Returns `true` for [`Next::EndOfStream`].
    #[inline]
    pub fn is_end(&self) -> bool {
        matches!(self, Next::EndOfStream)
    }
}

/// A capability for accepting bytes.
///
/// Decorators hold one `ByteSink` and forward to it. Only
/// [`ByteSink::write_bytes`] is required.
pub trait ByteSink {
    /// Write a single byte.
    #[inline]
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write_bytes(&[byte])
    }

    /// Write all of `buf`.
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()>;

    /// Write `len` bytes of `buf` starting at `offset`.
    ///
    /// The range is validated before anything is written.
    #[inline]
    fn write_range(&mut self, buf: &[u8], offset: usize, len: usize) -> Result<()> {
        let range = check_range(buf.len(), offset, len)?;
        self.write_bytes(&buf[range])
    }

    /// Push any buffered bytes toward their destination.
    #[inline]
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Flush and release the sink.
    #[inline]
    fn close(&mut self) -> Result<()> {
        self.flush()
    }
}

/// A capability for producing bytes.
///
/// Only [`ByteSource::read_into`] is required.
pub trait ByteSource {
    /// Read one byte.
    #[inline]
    fn read_byte(&mut self) -> Result<Next<u8>> {
        let mut byte = [0_u8];
        loop {
            match self.read_into(&mut byte)? {
                Next::Data(0) => continue,
                Next::Data(_) => return Ok(Next::Data(byte[0])),
                Next::EndOfStream => return Ok(Next::EndOfStream),
            }
        }
    }

    /// Read up to `buf.len()` bytes, returning how many were read.
    ///
    /// An empty `buf` yields `Data(0)`. Otherwise a count of zero is never
    /// returned; sources block or report [`Next::EndOfStream`].
    fn read_into(&mut self, buf: &mut [u8]) -> Result<Next<usize>>;

    /// Read up to `len` bytes into `buf` starting at `offset`.
    #[inline]
    fn read_range(&mut self, buf: &mut [u8], offset: usize, len: usize) -> Result<Next<usize>> {
        let range = check_range(buf.len(), offset, len)?;
        self.read_into(&mut buf[range])
    }

    /// Skip over up to `n` bytes, returning how many were skipped.
    ///
    /// Sources may skip fewer than `n`; zero means nothing more could be
    /// skipped. The default reads and discards, so it only comes up short
    /// at end of stream.
    #[inline]
    fn skip(&mut self, n: u64) -> Result<u64> {
        skip_by_reading(self, n)
    }

    /// An estimate of how many bytes can be read without blocking.
    #[inline]
    fn available(&mut self) -> Result<usize> {
        Ok(0)
    }

    /// Release the source.
    #[inline]
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Skip by reading into a scratch buffer and discarding it.
pub(crate) fn skip_by_reading<S: ByteSource + ?Sized>(source: &mut S, n: u64) -> Result<u64> {
    let mut scratch = [0_u8; 2048];
    let mut remaining = n;
    while remaining > 0 {
        let want = min(remaining, scratch.len() as u64) as usize;
        match source.read_into(&mut scratch[..want])? {
            Next::Data(0) | Next::EndOfStream => break,
            Next::Data(got) => remaining -= got as u64,
        }
    }
    Ok(n - remaining)
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    #[inline]
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        (**self).write_byte(byte)
    }

    #[inline]
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        (**self).write_bytes(buf)
    }

    #[inline]
    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    #[inline]
    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

impl<S: ByteSink + ?Sized> ByteSink for Box<S> {
    #[inline]
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        (**self).write_byte(byte)
    }

    #[inline]
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        (**self).write_bytes(buf)
    }

    #[inline]
    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    #[inline]
    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    #[inline]
    fn read_byte(&mut self) -> Result<Next<u8>> {
        (**self).read_byte()
    }

    #[inline]
    fn read_into(&mut self, buf: &mut [u8]) -> Result<Next<usize>> {
        (**self).read_into(buf)
    }

    #[inline]
    fn skip(&mut self, n: u64) -> Result<u64> {
        (**self).skip(n)
    }

    #[inline]
    fn available(&mut self) -> Result<usize> {
        (**self).available()
    }

    #[inline]
    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    #[inline]
    fn read_byte(&mut self) -> Result<Next<u8>> {
        (**self).read_byte()
    }

    #[inline]
    fn read_into(&mut self, buf: &mut [u8]) -> Result<Next<usize>> {
        (**self).read_into(buf)
    }

    #[inline]
    fn skip(&mut self, n: u64) -> Result<u64> {
        (**self).skip(n)
    }

    #[inline]
    fn available(&mut self) -> Result<usize> {
        (**self).available()
    }

    #[inline]
    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
