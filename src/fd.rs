//! Sinks and sources over OS file descriptors, and the process's standard
//! streams.

use crate::{
    stream::skip_by_reading, ByteSink, ByteSource, Next, Result, StreamError, Synchronized,
};
use io_lifetimes::{AsFilelike, FromFilelike, IntoFilelike};
use rustix::io::Errno;
use std::{
    fs,
    io::{self, SeekFrom},
    os::fd::{AsFd, BorrowedFd, RawFd},
    sync::OnceLock,
};
use system_interface::io::ReadReady;

/// The descriptor's preferred I/O block size, for sizing a
/// [`BufferedSink`](crate::BufferedSink) or
/// [`BufferedSource`](crate::BufferedSource) in front of it.
pub fn preferred_buffer_capacity<F: AsFd>(fd: &F) -> usize {
    match rustix::fs::fstat(fd) {
        Ok(stat) if stat.st_blksize > 0 => stat.st_blksize as usize,
        #[cfg(not(target_os = "wasi"))]
        _ => page_size::get(),
        // Hard-code the size here pending
        // <https://github.com/Elzair/page_size_rs/pull/3>
        #[cfg(target_os = "wasi")]
        _ => 65536,
    }
}

fn seek_fd(fd: BorrowedFd<'_>, pos: SeekFrom) -> Result<u64> {
    let pos = match pos {
        SeekFrom::Start(offset) => rustix::fs::SeekFrom::Start(offset),
        SeekFrom::End(offset) => rustix::fs::SeekFrom::End(offset),
        SeekFrom::Current(offset) => rustix::fs::SeekFrom::Current(offset),
    };
    Ok(rustix::fs::seek(fd, pos)?)
}

/// An unbuffered sink that writes to a file descriptor.
///
/// Closing drops `F`, which releases the descriptor if `F` owns it.
#[derive(Debug)]
pub struct FdSink<F: AsFd> {
    fd: Option<F>,
}

/// An unbuffered source that reads from a file descriptor.
///
/// Closing drops `F`, which releases the descriptor if `F` owns it.
#[derive(Debug)]
pub struct FdSource<F: AsFd> {
    fd: Option<F>,
}

impl FdSink<fs::File> {
    /// Convert a file-like owner into a sink.
    #[inline]
    #[must_use]
    pub fn file<Filelike: IntoFilelike>(filelike: Filelike) -> Self {
        Self::new(fs::File::from_into_filelike(filelike))
    }
}

impl FdSource<fs::File> {
    /// Convert a file-like owner into a source.
    #[inline]
    #[must_use]
    pub fn file<Filelike: IntoFilelike>(filelike: Filelike) -> Self {
        Self::new(fs::File::from_into_filelike(filelike))
    }
}

impl<F: AsFd> FdSink<F> {
    /// Write to `fd`.
    #[inline]
    pub fn new(fd: F) -> Self {
        Self { fd: Some(fd) }
    }

    fn fd(&self) -> Result<BorrowedFd<'_>> {
        self.fd.as_ref().map(AsFd::as_fd).ok_or(StreamError::Closed)
    }

    /// Force written data to the storage device, as `fsync` does.
    pub fn sync(&self) -> Result<()> {
        rustix::fs::fsync(self.fd()?)?;
        Ok(())
    }

    /// Returns `true` if the descriptor refers to a terminal.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.fd().map_or(false, rustix::termios::isatty)
    }

    /// The current file offset.
    #[inline]
    pub fn position(&self) -> Result<u64> {
        Ok(rustix::fs::tell(self.fd()?)?)
    }

    /// Move the file offset.
    #[inline]
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        seek_fd(self.fd()?, pos)
    }
}

impl<F: AsFd> FdSource<F> {
    /// Read from `fd`.
    #[inline]
    pub fn new(fd: F) -> Self {
        Self { fd: Some(fd) }
    }

    fn fd(&self) -> Result<BorrowedFd<'_>> {
        self.fd.as_ref().map(AsFd::as_fd).ok_or(StreamError::Closed)
    }

    /// Returns `true` if the descriptor refers to a terminal.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.fd().map_or(false, rustix::termios::isatty)
    }

    /// The current file offset.
    #[inline]
    pub fn position(&self) -> Result<u64> {
        Ok(rustix::fs::tell(self.fd()?)?)
    }

    /// Move the file offset.
    #[inline]
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        seek_fd(self.fd()?, pos)
    }
}

impl<F: AsFd> ByteSink for FdSink<F> {
    fn write_bytes(&mut self, mut buf: &[u8]) -> Result<()> {
        let fd = self.fd()?;
        while !buf.is_empty() {
            match rustix::io::write(fd, buf) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero).into()),
                Ok(n) => buf = &buf[n..],
                Err(errno) if errno == Errno::INTR => continue,
                Err(errno) => return Err(errno.into()),
            }
        }
        Ok(())
    }

    /// Writes are unbuffered, so there is nothing to flush.
    #[inline]
    fn flush(&mut self) -> Result<()> {
        self.fd().map(|_| ())
    }

    fn close(&mut self) -> Result<()> {
        if self.fd.take().is_some() {
            tracing::debug!("closed fd sink");
        }
        Ok(())
    }
}

impl<F: AsFd> ByteSource for FdSource<F> {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<Next<usize>> {
        let fd = self.fd()?;
        if buf.is_empty() {
            return Ok(Next::Data(0));
        }
        loop {
            match rustix::io::read(fd, &mut *buf) {
                Ok(0) => return Ok(Next::EndOfStream),
                Ok(n) => return Ok(Next::Data(n)),
                Err(errno) if errno == Errno::INTR => continue,
                Err(errno) => return Err(errno.into()),
            }
        }
    }

    /// Seeks past the bytes when the descriptor supports it, clamping at the
    /// end of a regular file; otherwise reads and discards them.
    fn skip(&mut self, n: u64) -> Result<u64> {
        let fd = self.fd()?;
        if n == 0 {
            return Ok(0);
        }
        let pos = match rustix::fs::tell(fd) {
            Ok(pos) => pos,
            Err(errno) if errno == Errno::SPIPE => return skip_by_reading(self, n),
            Err(errno) => return Err(errno.into()),
        };
        let meta = fd.as_filelike_view::<fs::File>().metadata()?;
        let mut target = pos.saturating_add(n);
        if meta.is_file() {
            target = target.min(meta.len().max(pos));
        }
        let landed = seek_fd(fd, SeekFrom::Start(target))?;
        Ok(landed.saturating_sub(pos))
    }

    fn available(&mut self) -> Result<usize> {
        let ready = self.fd()?.as_filelike_view::<fs::File>().num_ready_bytes()?;
        Ok(usize::try_from(ready).unwrap_or(usize::MAX))
    }

    fn close(&mut self) -> Result<()> {
        if self.fd.take().is_some() {
            tracing::debug!("closed fd source");
        }
        Ok(())
    }
}

fn std_fd(raw: RawFd) -> BorrowedFd<'static> {
    // SAFETY: the standard descriptors are open for the life of the process.
    unsafe { BorrowedFd::borrow_raw(raw) }
}

/// The process's standard input. Every call returns a handle to the same
/// shared instance.
pub fn stdin() -> Synchronized<FdSource<BorrowedFd<'static>>> {
    static STDIN: OnceLock<Synchronized<FdSource<BorrowedFd<'static>>>> = OnceLock::new();
    STDIN
        .get_or_init(|| Synchronized::new(FdSource::new(std_fd(0))))
        .clone()
}

/// The process's standard output. Every call returns a handle to the same
/// shared instance.
pub fn stdout() -> Synchronized<FdSink<BorrowedFd<'static>>> {
    static STDOUT: OnceLock<Synchronized<FdSink<BorrowedFd<'static>>>> = OnceLock::new();
    STDOUT
        .get_or_init(|| Synchronized::new(FdSink::new(std_fd(1))))
        .clone()
}

/// The process's standard error. Every call returns a handle to the same
/// shared instance.
pub fn stderr() -> Synchronized<FdSink<BorrowedFd<'static>>> {
    static STDERR: OnceLock<Synchronized<FdSink<BorrowedFd<'static>>>> = OnceLock::new();
    STDERR
        .get_or_init(|| Synchronized::new(FdSink::new(std_fd(2))))
        .clone()
}
