//! Typed big-endian binary encoding over sinks and sources.

use crate::{mutf8, ByteSink, ByteSource, Next, Result, StreamError};
use byteorder::{BigEndian, ByteOrder};

/// Fill all of `buf` from `source`, failing with
/// [`StreamError::EndOfData`] if it ends first.
fn read_exact<S: ByteSource + ?Sized>(source: &mut S, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read_into(&mut buf[filled..])? {
            Next::Data(n) => filled += n,
            Next::EndOfStream => return Err(StreamError::EndOfData),
        }
    }
    Ok(())
}

/// Writes primitive values to a sink in big-endian order.
///
/// Values are staged in an 8-byte scratch buffer owned by the writer, so a
/// `DataSink` must not be shared between threads without a lock.
#[derive(Debug)]
pub struct DataSink<S: ByteSink> {
    inner: S,
    scratch: [u8; 8],
    written: u64,
}

impl<S: ByteSink> DataSink<S> {
    /// Wrap `inner`.
    #[inline]
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            scratch: [0; 8],
            written: 0,
        }
    }

    /// Total bytes written through this writer, saturating.
    #[inline]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// The wrapped sink.
    #[inline]
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// The wrapped sink.
    #[inline]
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consume the writer, returning the wrapped sink.
    #[inline]
    pub fn into_inner(self) -> S {
        self.inner
    }

    #[inline]
    fn count(&mut self, n: usize) {
        self.written = self.written.saturating_add(n as u64);
    }

    fn emit_scratch(&mut self, len: usize) -> Result<()> {
        self.inner.write_bytes(&self.scratch[..len])?;
        self.count(len);
        Ok(())
    }

    /// Write `1` for `true` and `0` for `false`.
    #[inline]
    pub fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_u8(u8::from(v))
    }

    /// Write one byte.
    #[inline]
    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.inner.write_byte(v)?;
        self.count(1);
        Ok(())
    }

    /// Write one signed byte.
    #[inline]
    pub fn write_i8(&mut self, v: i8) -> Result<()> {
        self.write_u8(v as u8)
    }

    /// Write two bytes.
    #[inline]
    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        BigEndian::write_u16(&mut self.scratch, v);
        self.emit_scratch(2)
    }

    /// Write two bytes.
    #[inline]
    pub fn write_i16(&mut self, v: i16) -> Result<()> {
        BigEndian::write_i16(&mut self.scratch, v);
        self.emit_scratch(2)
    }

    /// Write one UTF-16 code unit.
    #[inline]
    pub fn write_char(&mut self, unit: u16) -> Result<()> {
        self.write_u16(unit)
    }

    /// Write four bytes.
    #[inline]
    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        BigEndian::write_i32(&mut self.scratch, v);
        self.emit_scratch(4)
    }

    /// Write eight bytes.
    #[inline]
    pub fn write_i64(&mut self, v: i64) -> Result<()> {
        BigEndian::write_i64(&mut self.scratch, v);
        self.emit_scratch(8)
    }

    /// Write the IEEE-754 bit pattern of `v`.
    #[inline]
    pub fn write_f32(&mut self, v: f32) -> Result<()> {
        BigEndian::write_f32(&mut self.scratch, v);
        self.emit_scratch(4)
    }

    /// Write the IEEE-754 bit pattern of `v`.
    #[inline]
    pub fn write_f64(&mut self, v: f64) -> Result<()> {
        BigEndian::write_f64(&mut self.scratch, v);
        self.emit_scratch(8)
    }

    /// Write the low byte of each UTF-16 code unit of `s`, discarding the
    /// high byte.
    pub fn write_bytes_low(&mut self, s: &str) -> Result<()> {
        let bytes: Vec<u8> = s.encode_utf16().map(|unit| unit as u8).collect();
        self.inner.write_bytes(&bytes)?;
        self.count(bytes.len());
        Ok(())
    }

    /// Write each UTF-16 code unit of `s` as two bytes.
    pub fn write_chars(&mut self, s: &str) -> Result<()> {
        let units: Vec<u16> = s.encode_utf16().collect();
        let mut bytes = vec![0_u8; units.len() * 2];
        BigEndian::write_u16_into(&units, &mut bytes);
        self.inner.write_bytes(&bytes)?;
        self.count(bytes.len());
        Ok(())
    }

    /// Write `s` as a two-byte length followed by its modified UTF-8
    /// encoding. Returns the number of bytes written.
    ///
    /// Fails with [`StreamError::StringTooLong`], writing nothing, if the
    /// encoding is longer than 65535 bytes.
    pub fn write_utf(&mut self, s: &str) -> Result<usize> {
        let len = mutf8::encoded_len(s);
        if len > usize::from(u16::MAX) {
            return Err(StreamError::StringTooLong(len));
        }
        let mut bytes = vec![0_u8; 2];
        BigEndian::write_u16(&mut bytes, len as u16);
        bytes.reserve(len);
        mutf8::encode_into(s, &mut bytes);
        self.inner.write_bytes(&bytes)?;
        self.count(bytes.len());
        Ok(bytes.len())
    }
}

impl<S: ByteSink> ByteSink for DataSink<S> {
    #[inline]
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write_u8(byte)
    }

    #[inline]
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write_bytes(buf)?;
        self.count(buf.len());
        Ok(())
    }

    #[inline]
    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }

    #[inline]
    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}

/// Reads primitive values from a source in big-endian order.
///
/// Fixed-width reads are exact: if the source ends part-way through a
/// value, the read fails with [`StreamError::EndOfData`].
#[derive(Debug)]
pub struct DataSource<S: ByteSource> {
    inner: S,
    scratch: [u8; 8],
}

impl<S: ByteSource> DataSource<S> {
    /// Wrap `inner`.
    #[inline]
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            scratch: [0; 8],
        }
    }

    /// The wrapped source.
    #[inline]
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Consume the reader, returning the wrapped source.
    #[inline]
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn fill_scratch(&mut self, len: usize) -> Result<&[u8]> {
        read_exact(&mut self.inner, &mut self.scratch[..len])?;
        Ok(&self.scratch[..len])
    }

    /// Fill all of `buf`.
    #[inline]
    pub fn read_fully(&mut self, buf: &mut [u8]) -> Result<()> {
        read_exact(&mut self.inner, buf)
    }

    /// Fill `len` bytes of `buf` starting at `offset`.
    pub fn read_fully_range(&mut self, buf: &mut [u8], offset: usize, len: usize) -> Result<()> {
        let range = crate::bounds::check_range(buf.len(), offset, len)?;
        read_exact(&mut self.inner, &mut buf[range])
    }

    /// Skip up to `n` bytes, returning how many were skipped. Comes up
    /// short only when the source stops making progress.
    pub fn skip_bytes(&mut self, n: usize) -> Result<usize> {
        let n = n as u64;
        let mut total = 0;
        while total < n {
            let skipped = self.inner.skip(n - total)?;
            if skipped == 0 {
                break;
            }
            total += skipped;
        }
        Ok(total as usize)
    }

    /// Read a byte; any non-zero value is `true`.
    #[inline]
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Read one byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        match self.inner.read_byte()? {
            Next::Data(byte) => Ok(byte),
            Next::EndOfStream => Err(StreamError::EndOfData),
        }
    }

    /// Read one signed byte.
    #[inline]
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Read two bytes.
    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.fill_scratch(2)?))
    }

    /// Read two bytes.
    #[inline]
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(BigEndian::read_i16(self.fill_scratch(2)?))
    }

    /// Read one UTF-16 code unit.
    #[inline]
    pub fn read_char(&mut self) -> Result<u16> {
        self.read_u16()
    }

    /// Read four bytes.
    #[inline]
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(BigEndian::read_i32(self.fill_scratch(4)?))
    }

    /// Read eight bytes.
    #[inline]
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(BigEndian::read_i64(self.fill_scratch(8)?))
    }

    /// Read an IEEE-754 bit pattern.
    #[inline]
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(BigEndian::read_f32(self.fill_scratch(4)?))
    }

    /// Read an IEEE-754 bit pattern.
    #[inline]
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(BigEndian::read_f64(self.fill_scratch(8)?))
    }

    /// Read a string written by [`DataSink::write_utf`].
    ///
    /// Truncated input fails with [`StreamError::EndOfData`]; bytes that are
    /// not modified UTF-8 fail with [`StreamError::Malformed`].
    pub fn read_utf(&mut self) -> Result<String> {
        let len = usize::from(self.read_u16()?);
        let mut bytes = vec![0_u8; len];
        read_exact(&mut self.inner, &mut bytes)?;
        mutf8::decode(&bytes)
    }
}

impl<S: ByteSource> ByteSource for DataSource<S> {
    #[inline]
    fn read_byte(&mut self) -> Result<Next<u8>> {
        self.inner.read_byte()
    }

    #[inline]
    fn read_into(&mut self, buf: &mut [u8]) -> Result<Next<usize>> {
        self.inner.read_into(buf)
    }

    #[inline]
    fn skip(&mut self, n: u64) -> Result<u64> {
        self.inner.skip(n)
    }

    #[inline]
    fn available(&mut self) -> Result<usize> {
        self.inner.available()
    }

    #[inline]
    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}
