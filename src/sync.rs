use crate::{ByteSink, ByteSource, Next, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

/// A cloneable handle to a sink or source shared between threads.
///
/// Every operation holds the lock for its whole duration, so concurrent
/// writes through different handles never interleave within one call.
#[derive(Debug, Default)]
pub struct Synchronized<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> Clone for Synchronized<S> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> Synchronized<S> {
    /// Share `inner`.
    #[inline]
    pub fn new(inner: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Lock the stream for a sequence of calls that must not be interleaved
    /// with other handles.
    ///
    /// A panic in another holder does not poison the stream; its state is
    /// whatever the panicking call left behind.
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, S> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Like [`lock`](Self::lock), but returns `None` instead of blocking
    /// when another handle holds the lock.
    #[inline]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, S>> {
        match self.inner.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }
}

impl<S: ByteSink> ByteSink for Synchronized<S> {
    #[inline]
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.lock().write_byte(byte)
    }

    #[inline]
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.lock().write_bytes(buf)
    }

    #[inline]
    fn flush(&mut self) -> Result<()> {
        self.lock().flush()
    }

    #[inline]
    fn close(&mut self) -> Result<()> {
        self.lock().close()
    }
}

impl<S: ByteSource> ByteSource for Synchronized<S> {
    #[inline]
    fn read_byte(&mut self) -> Result<Next<u8>> {
        self.lock().read_byte()
    }

    #[inline]
    fn read_into(&mut self, buf: &mut [u8]) -> Result<Next<usize>> {
        self.lock().read_into(buf)
    }

    #[inline]
    fn skip(&mut self, n: u64) -> Result<u64> {
        self.lock().skip(n)
    }

    #[inline]
    fn available(&mut self) -> Result<usize> {
        self.lock().available()
    }

    #[inline]
    fn close(&mut self) -> Result<()> {
        self.lock().close()
    }
}
