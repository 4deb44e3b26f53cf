use io_filters::{
    check_range, BufferedSink, BufferedSource, ByteArraySink, ByteArraySource, ByteSink,
    ByteSource, IoReader, IoWriter, Next, ReadSource, Result, StreamConfig, StreamError,
    Synchronized, WriteSink,
};
use proptest::prelude::*;
use std::{
    io::{Read, Write},
    thread,
};

/// A sink that records every call it receives.
#[derive(Debug, Default)]
struct RecordingSink {
    calls: Vec<Vec<u8>>,
    flushes: usize,
    closes: usize,
    fail_writes: bool,
}

impl RecordingSink {
    fn bytes(&self) -> Vec<u8> {
        self.calls.concat()
    }
}

impl ByteSink for RecordingSink {
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        if self.fail_writes {
            return Err(std::io::Error::from(std::io::ErrorKind::Other).into());
        }
        self.calls.push(buf.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closes += 1;
        Ok(())
    }
}

#[test]
fn test_check_range() {
    assert_eq!(check_range(10, 2, 3).unwrap(), 2..5);
    assert_eq!(check_range(10, 10, 0).unwrap(), 10..10);
    assert_eq!(check_range(0, 0, 0).unwrap(), 0..0);
    assert!(matches!(
        check_range(10, 8, 3),
        Err(StreamError::OutOfBounds {
            offset: 8,
            len: 3,
            size: 10
        })
    ));
    assert!(check_range(10, usize::MAX, 2).is_err());
}

#[test]
fn test_write_past_capacity_goes_direct() -> anyhow::Result<()> {
    let mut sink = BufferedSink::with_capacity(RecordingSink::default(), 4)?;
    sink.write_range(&[1, 2, 3, 4, 5], 0, 5)?;
    assert_eq!(sink.get_ref().calls, vec![vec![1, 2, 3, 4, 5]]);
    assert_eq!(sink.buffered_len(), 0);
    Ok(())
}

#[test]
fn test_write_exactly_capacity() -> anyhow::Result<()> {
    let mut sink = BufferedSink::with_capacity(RecordingSink::default(), 4)?;
    sink.write_bytes(&[9, 8, 7, 6])?;
    assert_eq!(sink.get_ref().calls, vec![vec![9, 8, 7, 6]]);
    assert_eq!(sink.buffered_len(), 0);
    Ok(())
}

#[test]
fn test_small_writes_coalesce() -> anyhow::Result<()> {
    let mut sink = BufferedSink::with_capacity(RecordingSink::default(), 4)?;
    sink.write_byte(1)?;
    sink.write_bytes(&[2, 3])?;
    assert!(sink.get_ref().calls.is_empty());
    assert_eq!(sink.buffered_len(), 3);

    // Doesn't fit next to the pending bytes, so they go out first.
    sink.write_bytes(&[4, 5])?;
    assert_eq!(sink.get_ref().calls, vec![vec![1, 2, 3]]);
    assert_eq!(sink.buffered_len(), 2);

    sink.flush()?;
    assert_eq!(sink.get_ref().calls, vec![vec![1, 2, 3], vec![4, 5]]);
    assert_eq!(sink.get_ref().flushes, 1);
    assert_eq!(sink.buffered_len(), 0);
    Ok(())
}

#[test]
fn test_large_write_flushes_pending_first() -> anyhow::Result<()> {
    let mut sink = BufferedSink::with_capacity(RecordingSink::default(), 4)?;
    sink.write_bytes(&[1, 2])?;
    sink.write_bytes(&[3, 4, 5, 6, 7, 8])?;
    assert_eq!(
        sink.get_ref().calls,
        vec![vec![1, 2], vec![3, 4, 5, 6, 7, 8]]
    );
    Ok(())
}

#[test]
fn test_bad_range_has_no_effect() -> anyhow::Result<()> {
    let mut sink = BufferedSink::with_capacity(RecordingSink::default(), 4)?;
    sink.write_byte(1)?;
    let err = sink.write_range(&[1, 2, 3], 2, 2).unwrap_err();
    assert!(matches!(err, StreamError::OutOfBounds { .. }));
    assert_eq!(sink.buffered_len(), 1);
    assert!(sink.get_ref().calls.is_empty());
    Ok(())
}

#[test]
fn test_zero_capacity() {
    assert!(matches!(
        BufferedSink::with_capacity(RecordingSink::default(), 0),
        Err(StreamError::InvalidArgument(_))
    ));
    assert!(matches!(
        BufferedSource::with_capacity(&b""[..], 0),
        Err(StreamError::InvalidArgument(_))
    ));
    assert!(StreamConfig::builder().buffer_capacity(0).build().is_err());
    assert!(StreamConfig::builder().pipe_capacity(0).build().is_err());
}

#[test]
fn test_config() -> anyhow::Result<()> {
    let config = StreamConfig::default();
    assert_eq!(config.buffer_capacity, 8192);
    assert_eq!(config.pipe_capacity, 1024);

    let config = StreamConfig::builder().buffer_capacity(16).build()?;
    let sink = BufferedSink::with_config(RecordingSink::default(), &config)?;
    assert_eq!(sink.capacity(), 16);
    assert_eq!(BufferedSink::new(Vec::new()).capacity(), 8192);
    Ok(())
}

#[test]
fn test_close() -> anyhow::Result<()> {
    let mut sink = BufferedSink::with_capacity(RecordingSink::default(), 8)?;
    sink.write_bytes(b"abc")?;
    sink.close()?;
    assert!(sink.is_closed());
    assert_eq!(sink.get_ref().bytes(), b"abc");
    assert_eq!(sink.get_ref().closes, 1);

    // A second close is a no-op.
    sink.close()?;
    assert_eq!(sink.get_ref().closes, 1);

    assert!(matches!(sink.write_byte(1), Err(StreamError::Closed)));
    assert!(matches!(sink.write_bytes(b"x"), Err(StreamError::Closed)));
    assert!(matches!(sink.flush(), Err(StreamError::Closed)));
    Ok(())
}

#[test]
fn test_close_after_failed_flush_still_closes_target() -> anyhow::Result<()> {
    let mut sink = BufferedSink::with_capacity(RecordingSink::default(), 8)?;
    sink.write_bytes(b"abc")?;
    sink.get_mut().fail_writes = true;
    assert!(matches!(sink.close(), Err(StreamError::Io(_))));
    assert_eq!(sink.get_ref().closes, 1);
    assert!(sink.is_closed());
    Ok(())
}

#[test]
fn test_drop_flushes() {
    let mut out = Vec::new();
    {
        let mut sink = BufferedSink::new(&mut out);
        sink.write_bytes(b"pending").unwrap();
    }
    assert_eq!(out, b"pending");
}

proptest! {
    #[test]
    fn prop_buffered_sink_preserves_bytes(
        capacity in 1_usize..64,
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..150), 0..40),
    ) {
        let mut sink = BufferedSink::with_capacity(RecordingSink::default(), capacity).unwrap();
        for chunk in &chunks {
            sink.write_bytes(chunk).unwrap();
            prop_assert!(sink.buffered_len() <= capacity);
        }
        sink.flush().unwrap();
        prop_assert_eq!(sink.get_ref().bytes(), chunks.concat());
        // Empty writes are never forwarded.
        for call in &sink.get_ref().calls {
            prop_assert!(!call.is_empty());
        }
    }

    #[test]
    fn prop_buffered_source_preserves_bytes(
        capacity in 1_usize..32,
        data in prop::collection::vec(any::<u8>(), 0..500),
        reads in prop::collection::vec(1_usize..80, 1..50),
    ) {
        let mut source = BufferedSource::with_capacity(&data[..], capacity).unwrap();
        let mut out = Vec::new();
        let mut reads = reads.into_iter().cycle();
        loop {
            let mut buf = vec![0_u8; reads.next().unwrap()];
            match source.read_into(&mut buf).unwrap() {
                Next::Data(n) => out.extend_from_slice(&buf[..n]),
                Next::EndOfStream => break,
            }
        }
        prop_assert_eq!(out, data);
    }
}

#[test]
fn test_buffered_source_mark_reset() -> anyhow::Result<()> {
    let data: Vec<u8> = (0..100).collect();
    let mut source = BufferedSource::with_capacity(&data[..], 8)?;
    assert_eq!(source.read_byte()?, Next::Data(0));

    source.mark(32);
    let mut buf = [0_u8; 20];
    let mut got = 0;
    while got < buf.len() {
        got += source.read_into(&mut buf[got..])?.data().unwrap_or(0);
    }
    assert_eq!(buf.to_vec(), (1..21).collect::<Vec<u8>>());

    source.reset()?;
    assert_eq!(source.read_byte()?, Next::Data(1));
    Ok(())
}

#[test]
fn test_buffered_source_mark_expires() -> anyhow::Result<()> {
    let data: Vec<u8> = (0..100).collect();
    let mut source = BufferedSource::with_capacity(&data[..], 4)?;
    assert!(matches!(source.reset(), Err(StreamError::InvalidMark)));

    source.mark(2);
    for _ in 0..10 {
        source.read_byte()?;
    }
    assert!(matches!(source.reset(), Err(StreamError::InvalidMark)));
    Ok(())
}

#[test]
fn test_buffered_source_skip_and_available() -> anyhow::Result<()> {
    let data: Vec<u8> = (0..50).collect();
    let mut source = BufferedSource::with_capacity(&data[..], 8)?;
    assert_eq!(source.read_byte()?, Next::Data(0));
    assert_eq!(source.buffered_len(), 7);
    assert_eq!(source.available()?, 49);

    // Skips only what is buffered.
    assert_eq!(source.skip(20)?, 7);
    // Empty buffer, no mark: the source skips directly.
    assert_eq!(source.skip(20)?, 20);
    assert_eq!(source.read_byte()?, Next::Data(28));
    assert_eq!(source.skip(1000)?, 7);
    assert_eq!(source.skip(1000)?, 14);
    assert_eq!(source.read_byte()?, Next::EndOfStream);

    source.close()?;
    assert!(matches!(source.read_byte(), Err(StreamError::Closed)));
    source.close()?;
    Ok(())
}

#[test]
fn test_byte_array_sink() -> anyhow::Result<()> {
    let mut sink = ByteArraySink::new();
    assert!(sink.is_empty());
    sink.write_bytes(b"hello")?;
    sink.write_byte(b' ')?;
    sink.write_range(b"xworldx", 1, 5)?;
    assert_eq!(sink.len(), 11);
    assert_eq!(sink.to_string_lossy(), "hello world");

    let mut copy = Vec::new();
    sink.write_to(&mut copy)?;
    assert_eq!(copy, b"hello world");

    sink.close()?;
    sink.write_byte(b'!')?;
    assert_eq!(sink.as_slice(), b"hello world!");

    sink.reset();
    assert!(sink.is_empty());
    Ok(())
}

#[test]
fn test_byte_array_source() -> anyhow::Result<()> {
    let mut source = ByteArraySource::with_range(b"0123456789".to_vec(), 2, 5)?;
    assert_eq!(source.available()?, 5);
    assert_eq!(source.read_byte()?, Next::Data(b'2'));
    source.mark();
    let mut buf = [0_u8; 8];
    assert_eq!(source.read_into(&mut buf)?, Next::Data(4));
    assert_eq!(&buf[..4], b"3456");
    assert_eq!(source.read_into(&mut buf)?, Next::EndOfStream);
    assert_eq!(source.read_into(&mut buf[..0])?, Next::Data(0));

    source.reset();
    assert_eq!(source.remaining(), b"3456");
    assert_eq!(source.skip(10)?, 4);
    assert_eq!(source.skip(10)?, 0);

    assert!(ByteArraySource::with_range(&b"abc"[..], 2, 2).is_err());
    Ok(())
}

#[test]
fn test_read_range() -> anyhow::Result<()> {
    let mut source = ByteArraySource::new(b"abcdef");
    let mut buf = [0_u8; 6];
    assert_eq!(source.read_range(&mut buf, 2, 3)?, Next::Data(3));
    assert_eq!(&buf, b"\0\0abc\0");
    assert!(matches!(
        source.read_range(&mut buf, 5, 2),
        Err(StreamError::OutOfBounds { .. })
    ));
    Ok(())
}

#[test]
fn test_io_adapters() -> anyhow::Result<()> {
    let mut writer = IoWriter::new(BufferedSink::with_capacity(ByteArraySink::new(), 4)?);
    write!(writer, "Hello, {}!", "world")?;
    writer.flush()?;
    let sink = writer.into_inner();
    assert_eq!(sink.get_ref().as_slice(), b"Hello, world!");

    let mut reader = IoReader::new(BufferedSource::new(ByteArraySource::new(b"streamed")));
    let mut s = String::new();
    reader.read_to_string(&mut s)?;
    assert_eq!(s, "streamed");

    let mut sink = WriteSink::new(Vec::new());
    sink.write_bytes(b"abc")?;
    sink.flush()?;
    assert_eq!(sink.into_inner(), b"abc");

    let mut source = ReadSource::new(std::io::Cursor::new(b"xyz".to_vec()));
    assert_eq!(source.read_byte()?, Next::Data(b'x'));
    assert_eq!(source.skip(5)?, 2);
    assert_eq!(source.read_byte()?, Next::EndOfStream);
    Ok(())
}

#[test]
fn test_error_kinds() {
    use std::io::ErrorKind;
    let kind = |err: StreamError| std::io::Error::from(err).kind();
    assert_eq!(kind(StreamError::EndOfData), ErrorKind::UnexpectedEof);
    assert_eq!(kind(StreamError::Malformed("x".into())), ErrorKind::InvalidData);
    assert_eq!(kind(StreamError::NotConnected), ErrorKind::NotConnected);
    assert_eq!(kind(StreamError::PeerGone("read end dead")), ErrorKind::BrokenPipe);
    assert_eq!(
        kind(StreamError::Io(ErrorKind::WouldBlock.into())),
        ErrorKind::WouldBlock
    );
}

#[test]
fn test_synchronized_writes_do_not_interleave() -> anyhow::Result<()> {
    let shared = Synchronized::new(ByteArraySink::new());
    let handles: Vec<_> = (0..4_u8)
        .map(|id| {
            let mut sink = shared.clone();
            thread::spawn(move || -> Result<()> {
                for _ in 0..100 {
                    sink.write_bytes(&[id; 16])?;
                }
                Ok(())
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap()?;
    }

    let sink = shared.lock();
    assert_eq!(sink.len(), 4 * 100 * 16);
    for record in sink.as_slice().chunks(16) {
        assert!(record.iter().all(|b| *b == record[0]));
    }
    Ok(())
}
