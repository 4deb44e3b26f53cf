use std::io;

/// Errors reported by sinks, sources, pipes, and the typed codec.
///
/// End of stream is not an error; sources report it with
/// [`Next::EndOfStream`](crate::Next::EndOfStream). [`StreamError::EndOfData`]
/// is only raised where a partial value cannot be represented, such as a
/// fixed-width read.
#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    /// Underlying OS or adapter failure.
    #[error("io: {0}")]
    Io(#[from] io::Error),

    /// A constructor or operation argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// `offset..offset + len` does not fit in a buffer of length `size`.
    #[error("range {offset}+{len} out of bounds for length {size}")]
    OutOfBounds {
        /// Requested start of the range.
        offset: usize,
        /// Requested length of the range.
        len: usize,
        /// Length of the buffer the range was applied to.
        size: usize,
    },

    /// Operation on a closed stream or pipe.
    #[error("stream closed")]
    Closed,

    /// The source ran out before a complete value could be read.
    #[error("end of data")]
    EndOfData,

    /// Input bytes are not valid modified UTF-8.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// A string's encoding does not fit in a 16-bit length prefix.
    #[error("encoded string too long: {0} bytes")]
    StringTooLong(usize),

    /// Pipe operation before `connect`.
    #[error("pipe not connected")]
    NotConnected,

    /// `connect` on a pipe end that is already bound.
    #[error("already connected")]
    AlreadyConnected,

    /// The thread on the other end of a pipe is known to have exited.
    #[error("{0}")]
    PeerGone(&'static str),

    /// A blocking wait was interrupted after `transferred` elements moved.
    #[error("interrupted after {transferred} elements")]
    Interrupted {
        /// Elements transferred before the interrupt was observed.
        transferred: usize,
    },

    /// `reset` without a live mark.
    #[error("resetting to invalid mark")]
    InvalidMark,
}

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, StreamError>;

#[cfg(not(windows))]
impl From<rustix::io::Errno> for StreamError {
    fn from(errno: rustix::io::Errno) -> Self {
        StreamError::Io(errno.into())
    }
}

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        let kind = match err {
            StreamError::Io(inner) => return inner,
            StreamError::InvalidArgument(_) | StreamError::OutOfBounds { .. } => {
                io::ErrorKind::InvalidInput
            }
            StreamError::EndOfData => io::ErrorKind::UnexpectedEof,
            StreamError::Malformed(_) | StreamError::StringTooLong(_) => {
                io::ErrorKind::InvalidData
            }
            StreamError::NotConnected => io::ErrorKind::NotConnected,
            StreamError::AlreadyConnected => io::ErrorKind::AlreadyExists,
            StreamError::PeerGone(_) => io::ErrorKind::BrokenPipe,
            StreamError::Interrupted { .. } => io::ErrorKind::Interrupted,
            StreamError::Closed | StreamError::InvalidMark => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
