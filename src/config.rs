use crate::{Result, StreamError};

/// Default capacity of [`BufferedSink`](crate::BufferedSink) and
/// [`BufferedSource`](crate::BufferedSource) buffers.
pub const DEFAULT_BUFFER_CAPACITY: usize = 8192;

/// Default number of elements a pipe can hold before writers block.
pub const DEFAULT_PIPE_CAPACITY: usize = 1024;

/// Sizing parameters for buffered decorators and pipes.
/// Build with `StreamConfig::builder().foo(...).build()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamConfig {
    /// Capacity of a buffered sink or source, in bytes.
    pub buffer_capacity: usize,

    /// Capacity of a pipe's ring buffer, in elements.
    pub pipe_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
        }
    }
}

impl StreamConfig {
    /// Start building a config.
    ///
    /// Defaults:
    /// - buffer_capacity = 8 KiB
    /// - pipe_capacity   = 1024
    pub fn builder() -> StreamConfigBuilder {
        StreamConfigBuilder {
            config: StreamConfig::default(),
        }
    }
}

/// Fluent builder for [`StreamConfig`].
#[derive(Clone, Debug)]
pub struct StreamConfigBuilder {
    config: StreamConfig,
}

impl StreamConfigBuilder {
    /// Set the buffered decorator capacity.
    pub fn buffer_capacity(mut self, bytes: usize) -> Self {
        self.config.buffer_capacity = bytes;
        self
    }

    /// Set the pipe ring capacity.
    pub fn pipe_capacity(mut self, elems: usize) -> Self {
        self.config.pipe_capacity = elems;
        self
    }

    /// Validate and return the config. Both capacities must be positive.
    pub fn build(self) -> Result<StreamConfig> {
        if self.config.buffer_capacity == 0 {
            return Err(StreamError::InvalidArgument("buffer size <= 0"));
        }
        if self.config.pipe_capacity == 0 {
            return Err(StreamError::InvalidArgument("pipe size <= 0"));
        }
        Ok(self.config)
    }
}
