//! Composable byte stream filters
//!
//! For a starting point, see [`ByteSink`] and [`ByteSource`] for output and
//! input. [`BufferedSink`] and [`BufferedSource`] add buffering to any of
//! them, [`DataSink`] and [`DataSource`] layer a typed big-endian codec on
//! top, and [`pipe`] connects a writing thread to a reading thread.

#![deny(missing_docs)]

mod bounds;
mod buffered;
mod config;
mod data;
mod error;
#[cfg(not(windows))]
mod fd;
mod memory;
pub mod mutf8;
mod pipe;
mod stream;
mod streamer;
mod sync;

/// Sinks and sources over OS file descriptors.
#[cfg(not(windows))]
pub mod filelike {
    pub use crate::fd::{preferred_buffer_capacity, FdSink, FdSource};
}

pub use bounds::check_range;
pub use buffered::{BufferedSink, BufferedSource};
pub use config::{
    StreamConfig, StreamConfigBuilder, DEFAULT_BUFFER_CAPACITY, DEFAULT_PIPE_CAPACITY,
};
pub use data::{DataSink, DataSource};
pub use error::{Result, StreamError};
#[cfg(not(windows))]
pub use fd::{stderr, stdin, stdout, FdSink, FdSource};
pub use memory::{ByteArraySink, ByteArraySource};
pub use pipe::{char_pipe, pipe, pipe_with_config, Interrupter, PipeReader, PipeWriter};
pub use stream::{ByteSink, ByteSource, Next};
pub use streamer::{IoReader, IoWriter, ReadSource, WriteSink};
pub use sync::Synchronized;
