//! A bounded channel between one writing thread and one reading thread.
//!
//! The [`PipeReader`] owns the ring buffer; a [`PipeWriter`] binds to it
//! once with [`PipeWriter::connect`] (or both ends come from [`pipe`]).
//! Writers block while the ring is full and readers block while it is empty.
//! Every wait re-checks its condition after waking and polls, once a second,
//! whether the thread on the other end is still alive.
//!
//! Using both ends from the same thread can deadlock once the ring fills.

use crate::{
    config::DEFAULT_PIPE_CAPACITY, ByteSink, ByteSource, Next, Result, StreamConfig, StreamError,
};
use std::{
    cmp::min,
    fmt,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

/// How long a blocked pipe operation sleeps before re-checking the other
/// end's thread.
const LIVENESS_POLL: Duration = Duration::from_secs(1);

thread_local! {
    static THREAD_TOKEN: Arc<()> = Arc::new(());
}

/// A weak handle that stops upgrading once the calling thread has exited.
fn current_thread_token() -> Option<Weak<()>> {
    THREAD_TOKEN.try_with(Arc::downgrade).ok()
}

fn has_exited(token: &Option<Weak<()>>) -> bool {
    token.as_ref().map_or(false, |token| token.strong_count() == 0)
}

struct Ring<T> {
    buf: Box<[T]>,
    head: usize,
    len: usize,
    connected: bool,
    closed_by_writer: bool,
    closed_by_reader: bool,
    // Last threads to read and write; best-effort liveness only.
    reader_thread: Option<Weak<()>>,
    writer_thread: Option<Weak<()>>,
    // Pending interrupts, one per end.
    reader_interrupted: bool,
    writer_interrupted: bool,
}

/// Which end of a pipe an operation or interrupt belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum End {
    Reader,
    Writer,
}

impl<T> Ring<T> {
    fn interrupt_flag(&mut self, end: End) -> &mut bool {
        match end {
            End::Reader => &mut self.reader_interrupted,
            End::Writer => &mut self.writer_interrupted,
        }
    }

    /// Returns `false` if the reading end was already closed.
    fn close_reader(&mut self) -> bool {
        if self.closed_by_reader {
            return false;
        }
        self.closed_by_reader = true;
        self.head = 0;
        self.len = 0;
        true
    }

    /// Returns `false` if the writing end was already closed.
    fn close_writer(&mut self) -> bool {
        if self.closed_by_writer {
            return false;
        }
        self.closed_by_writer = true;
        true
    }
}

impl<T: Copy> Ring<T> {
    fn capacity(&self) -> usize {
        self.buf.len()
    }

    fn is_full(&self) -> bool {
        self.len == self.buf.len()
    }

    /// Copy as much of `src` as fits; returns the number copied.
    fn push(&mut self, src: &[T]) -> usize {
        let capacity = self.buf.len();
        let n = min(src.len(), capacity - self.len);
        let tail = (self.head + self.len) % capacity;
        let first = min(n, capacity - tail);
        self.buf[tail..tail + first].copy_from_slice(&src[..first]);
        self.buf[..n - first].copy_from_slice(&src[first..n]);
        self.len += n;
        n
    }

    /// Move up to `dst.len()` of the oldest elements into `dst`.
    fn pop(&mut self, dst: &mut [T]) -> usize {
        let capacity = self.buf.len();
        let n = min(dst.len(), self.len);
        let first = min(n, capacity - self.head);
        dst[..first].copy_from_slice(&self.buf[self.head..self.head + first]);
        dst[first..n].copy_from_slice(&self.buf[..n - first]);
        self.head = (self.head + n) % capacity;
        self.len -= n;
        n
    }

    fn check_writable(&self) -> Result<()> {
        if !self.connected {
            return Err(StreamError::NotConnected);
        }
        if self.closed_by_writer || self.closed_by_reader {
            return Err(StreamError::Closed);
        }
        if has_exited(&self.reader_thread) {
            return Err(StreamError::PeerGone("read end dead"));
        }
        Ok(())
    }

    fn check_readable(&self) -> Result<()> {
        if !self.connected {
            return Err(StreamError::NotConnected);
        }
        if self.closed_by_reader {
            return Err(StreamError::Closed);
        }
        if has_exited(&self.writer_thread) && !self.closed_by_writer && self.len == 0 {
            return Err(StreamError::PeerGone("write end dead"));
        }
        Ok(())
    }
}

struct Shared<T> {
    ring: Mutex<Ring<T>>,
    changed: Condvar,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Ring<T>> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep until woken or the liveness poll expires. An interrupt pending
    /// for `end` is consumed and reported with the count moved so far; the
    /// other end's interrupt is left alone.
    fn wait<'a>(
        &self,
        mut ring: MutexGuard<'a, Ring<T>>,
        end: End,
        transferred: usize,
    ) -> Result<MutexGuard<'a, Ring<T>>> {
        if !*ring.interrupt_flag(end) {
            ring = self
                .changed
                .wait_timeout(ring, LIVENESS_POLL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        let flag = ring.interrupt_flag(end);
        if *flag {
            *flag = false;
            return Err(StreamError::Interrupted { transferred });
        }
        Ok(ring)
    }

    fn close_reader(&self) {
        let mut ring = self.lock();
        if ring.close_reader() {
            tracing::debug!("pipe reader closed");
            self.changed.notify_all();
        }
    }

    fn close_writer(&self) {
        let mut ring = self.lock();
        if ring.close_writer() {
            tracing::debug!(buffered = ring.len, "pipe writer closed");
            self.changed.notify_all();
        }
    }
}

/// The reading end of a pipe. Owns the ring buffer.
///
/// Dropping the reader closes it.
pub struct PipeReader<T = u8> {
    shared: Arc<Shared<T>>,
}

/// The writing end of a pipe.
///
/// Dropping a connected writer closes it, so the reader sees end of stream
/// once it has drained the ring.
pub struct PipeWriter<T = u8> {
    sink: Option<Arc<Shared<T>>>,
}

/// Wakes a thread blocked on one end of a pipe.
///
/// The current or next blocking wait on that end fails with
/// [`StreamError::Interrupted`], carrying the number of elements that call
/// had already moved. Waits on the other end are not affected.
#[derive(Clone)]
pub struct Interrupter<T = u8> {
    shared: Arc<Shared<T>>,
    end: End,
}

/// Create a connected byte pipe with the default capacity.
pub fn pipe() -> (PipeWriter, PipeReader) {
    connected_pair(PipeReader::from_capacity(DEFAULT_PIPE_CAPACITY))
}

/// Create a connected character pipe with the default capacity.
pub fn char_pipe() -> (PipeWriter<char>, PipeReader<char>) {
    connected_pair(PipeReader::from_capacity(DEFAULT_PIPE_CAPACITY))
}

/// Create a connected pipe whose ring is sized by `config`.
pub fn pipe_with_config<T: Copy + Default>(
    config: &StreamConfig,
) -> Result<(PipeWriter<T>, PipeReader<T>)> {
    Ok(connected_pair(PipeReader::with_capacity(
        config.pipe_capacity,
    )?))
}

fn connected_pair<T>(reader: PipeReader<T>) -> (PipeWriter<T>, PipeReader<T>) {
    reader.shared.lock().connected = true;
    let writer = PipeWriter {
        sink: Some(Arc::clone(&reader.shared)),
    };
    (writer, reader)
}

impl<T: Copy + Default> PipeReader<T> {
    /// Create an unconnected reader with the default capacity.
    #[inline]
    pub fn new() -> Self {
        Self::from_capacity(DEFAULT_PIPE_CAPACITY)
    }

    /// Create an unconnected reader holding up to `capacity` elements,
    /// which must be positive.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(StreamError::InvalidArgument("pipe size <= 0"));
        }
        Ok(Self::from_capacity(capacity))
    }

    fn from_capacity(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                ring: Mutex::new(Ring {
                    buf: vec![T::default(); capacity].into_boxed_slice(),
                    head: 0,
                    len: 0,
                    connected: false,
                    closed_by_writer: false,
                    closed_by_reader: false,
                    reader_thread: None,
                    writer_thread: None,
                    reader_interrupted: false,
                    writer_interrupted: false,
                }),
                changed: Condvar::new(),
            }),
        }
    }

    /// Bind `writer` to this reader. See [`PipeWriter::connect`].
    #[inline]
    pub fn connect(&self, writer: &mut PipeWriter<T>) -> Result<()> {
        writer.connect(self)
    }

    /// Maximum number of buffered elements.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.lock().capacity()
    }

    /// A handle for interrupting a thread blocked reading this pipe.
    #[inline]
    pub fn interrupter(&self) -> Interrupter<T> {
        Interrupter {
            shared: Arc::clone(&self.shared),
            end: End::Reader,
        }
    }

    /// Wait until the ring holds data. Returns `None` once the writer has
    /// closed and the ring is drained.
    fn await_data(&self) -> Result<Option<MutexGuard<'_, Ring<T>>>> {
        let shared = &*self.shared;
        let mut ring = shared.lock();
        ring.check_readable()?;
        ring.reader_thread = current_thread_token();
        let mut trials = 2;
        while ring.len == 0 {
            if ring.closed_by_writer {
                return Ok(None);
            }
            if has_exited(&ring.writer_thread) {
                trials -= 1;
                if trials < 0 {
                    return Err(StreamError::PeerGone("pipe broken"));
                }
            }
            tracing::trace!("pipe reader waiting for data");
            shared.changed.notify_all();
            ring = shared.wait(ring, End::Reader, 0)?;
        }
        Ok(Some(ring))
    }

    /// Read the oldest element, blocking until one is available.
    ///
    /// Returns [`Next::EndOfStream`] once the writer has closed and every
    /// buffered element has been read.
    pub fn read(&mut self) -> Result<Next<T>> {
        let mut ring = match self.await_data()? {
            Some(ring) => ring,
            None => return Ok(Next::EndOfStream),
        };
        let mut one = [T::default()];
        ring.pop(&mut one);
        self.shared.changed.notify_all();
        Ok(Next::Data(one[0]))
    }

    /// Read up to `dst.len()` elements, blocking only until at least one is
    /// available.
    pub fn read_slice(&mut self, dst: &mut [T]) -> Result<Next<usize>> {
        if dst.is_empty() {
            return Ok(Next::Data(0));
        }
        let mut ring = match self.await_data()? {
            Some(ring) => ring,
            None => return Ok(Next::EndOfStream),
        };
        let n = ring.pop(dst);
        self.shared.changed.notify_all();
        Ok(Next::Data(n))
    }

    /// Number of elements that can be read without blocking.
    #[inline]
    pub fn available(&self) -> usize {
        self.shared.lock().len
    }

    /// Whether a read would return data without blocking.
    pub fn ready(&self) -> Result<bool> {
        let ring = self.shared.lock();
        ring.check_readable()?;
        Ok(ring.len > 0)
    }

    /// Close the reading end, discarding buffered data. A writer blocked on
    /// a full ring wakes and fails with [`StreamError::Closed`].
    pub fn close(&mut self) -> Result<()> {
        self.shared.close_reader();
        Ok(())
    }
}

impl<T: Copy + Default> PipeWriter<T> {
    /// Create an unconnected writer.
    #[inline]
    pub fn new() -> Self {
        Self { sink: None }
    }

    /// Returns `true` once bound to a reader.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.sink.is_some()
    }

    /// Bind this writer to `reader`.
    ///
    /// Fails with [`StreamError::AlreadyConnected`] if either end is already
    /// bound. A pipe end is connected at most once.
    pub fn connect(&mut self, reader: &PipeReader<T>) -> Result<()> {
        let mut ring = reader.shared.lock();
        if self.sink.is_some() || ring.connected {
            return Err(StreamError::AlreadyConnected);
        }
        ring.connected = true;
        ring.head = 0;
        ring.len = 0;
        tracing::debug!(capacity = ring.capacity(), "pipe connected");
        drop(ring);
        self.sink = Some(Arc::clone(&reader.shared));
        Ok(())
    }

    fn shared(&self) -> Result<&Shared<T>> {
        self.sink.as_deref().ok_or(StreamError::NotConnected)
    }

    /// A handle for interrupting a thread blocked writing to this pipe.
    ///
    /// Fails with [`StreamError::NotConnected`] before `connect`.
    pub fn interrupter(&self) -> Result<Interrupter<T>> {
        let shared = self.sink.as_ref().ok_or(StreamError::NotConnected)?;
        Ok(Interrupter {
            shared: Arc::clone(shared),
            end: End::Writer,
        })
    }

    /// Write one element, blocking while the ring is full.
    #[inline]
    pub fn write(&mut self, elem: T) -> Result<()> {
        self.write_slice(&[elem])
    }

    /// Write every element of `src`, blocking whenever the ring is full.
    ///
    /// Not atomic: a reader may observe a prefix before the rest is
    /// written. If interrupted, the error carries how many elements were
    /// written.
    pub fn write_slice(&mut self, src: &[T]) -> Result<()> {
        let shared = self.shared()?;
        if src.is_empty() {
            return Ok(());
        }
        let mut ring = shared.lock();
        ring.writer_thread = current_thread_token();
        let mut written = 0;
        while written < src.len() {
            ring.check_writable()?;
            if ring.is_full() {
                tracing::trace!(written, "pipe writer waiting for space");
                shared.changed.notify_all();
                ring = shared.wait(ring, End::Writer, written)?;
                continue;
            }
            written += ring.push(&src[written..]);
            shared.changed.notify_all();
        }
        Ok(())
    }

    /// Wake a blocked reader. Buffered data is untouched; a no-op when
    /// unconnected.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(shared) = &self.sink {
            let _ring = shared.lock();
            shared.changed.notify_all();
        }
        Ok(())
    }

    /// Close the writing end. The reader sees end of stream after draining
    /// what was written. Closing again has no effect.
    pub fn close(&mut self) -> Result<()> {
        if let Some(shared) = &self.sink {
            shared.close_writer();
        }
        Ok(())
    }
}

impl<T: Copy> Interrupter<T> {
    /// Interrupt the current, or else the next, blocking wait on this
    /// handle's end of the pipe.
    pub fn interrupt(&self) {
        let mut ring = self.shared.lock();
        *ring.interrupt_flag(self.end) = true;
        self.shared.changed.notify_all();
    }
}

impl<T: Copy + Default> Default for PipeReader<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Default> Default for PipeWriter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for PipeReader<T> {
    fn drop(&mut self) {
        self.shared.close_reader();
    }
}

impl<T> Drop for PipeWriter<T> {
    fn drop(&mut self) {
        if let Some(shared) = &self.sink {
            shared.close_writer();
        }
    }
}

impl<T> fmt::Debug for PipeReader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ring = self.shared.lock();
        f.debug_struct("PipeReader")
            .field("capacity", &ring.buf.len())
            .field("buffered", &ring.len)
            .field("connected", &ring.connected)
            .field("closed_by_writer", &ring.closed_by_writer)
            .field("closed_by_reader", &ring.closed_by_reader)
            .finish()
    }
}

impl<T> fmt::Debug for PipeWriter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipeWriter")
            .field("connected", &self.sink.is_some())
            .finish()
    }
}

impl ByteSink for PipeWriter<u8> {
    #[inline]
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write(byte)
    }

    #[inline]
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.write_slice(buf)
    }

    #[inline]
    fn flush(&mut self) -> Result<()> {
        PipeWriter::flush(self)
    }

    #[inline]
    fn close(&mut self) -> Result<()> {
        PipeWriter::close(self)
    }
}

impl ByteSource for PipeReader<u8> {
    #[inline]
    fn read_byte(&mut self) -> Result<Next<u8>> {
        self.read()
    }

    #[inline]
    fn read_into(&mut self, buf: &mut [u8]) -> Result<Next<usize>> {
        self.read_slice(buf)
    }

    #[inline]
    fn available(&mut self) -> Result<usize> {
        Ok(PipeReader::available(self))
    }

    #[inline]
    fn close(&mut self) -> Result<()> {
        PipeReader::close(self)
    }
}
