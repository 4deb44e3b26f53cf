#![cfg(not(windows))]

use cap_std::ambient_authority;
use cap_tempfile::TempDir;
use io_filters::{
    filelike::preferred_buffer_capacity, BufferedSink, BufferedSource, ByteSink, ByteSource,
    DataSink, DataSource, FdSink, FdSource, Next, StreamError,
};
use std::io::{Read, SeekFrom, Write};

fn tmpdir() -> TempDir {
    TempDir::new(ambient_authority())
        .expect("expected to be able to create a temporary directory")
}

#[test]
fn test_buffered_file_round_trip() -> anyhow::Result<()> {
    let dir = tmpdir();
    let file = dir.create("data.bin")?.into_std();
    let capacity = preferred_buffer_capacity(&file);
    assert!(capacity > 0);

    let mut out = DataSink::new(BufferedSink::with_capacity(FdSink::file(file), capacity)?);
    out.write_i32(42)?;
    out.write_utf("Hello, world!")?;
    out.write_f64(-0.5)?;
    out.close()?;

    let mut raw = Vec::new();
    dir.open("data.bin")?.read_to_end(&mut raw)?;
    assert_eq!(raw.len(), 4 + 2 + 13 + 8);

    let mut input = DataSource::new(BufferedSource::new(FdSource::file(
        dir.open("data.bin")?.into_std(),
    )));
    assert_eq!(input.read_i32()?, 42);
    assert_eq!(input.read_utf()?, "Hello, world!");
    assert_eq!(input.read_f64()?, -0.5);
    assert_eq!(input.read_byte()?, Next::EndOfStream);
    Ok(())
}

#[test]
fn test_source_skip_and_seek() -> anyhow::Result<()> {
    let dir = tmpdir();
    let mut file = dir.create("digits.txt")?;
    write!(file, "0123456789")?;

    let mut source = FdSource::file(dir.open("digits.txt")?.into_std());
    assert!(!source.is_terminal());
    assert_eq!(source.available()?, 10);
    assert_eq!(source.skip(4)?, 4);
    assert_eq!(source.position()?, 4);
    assert_eq!(source.read_byte()?, Next::Data(b'4'));

    // Skipping stops at the end of a regular file.
    assert_eq!(source.skip(100)?, 5);
    assert_eq!(source.skip(100)?, 0);
    assert_eq!(source.read_byte()?, Next::EndOfStream);

    source.seek(SeekFrom::Start(8))?;
    let mut buf = [0_u8; 8];
    assert_eq!(source.read_into(&mut buf)?, Next::Data(2));
    assert_eq!(&buf[..2], b"89");

    source.close()?;
    source.close()?;
    assert!(matches!(source.read_byte(), Err(StreamError::Closed)));
    Ok(())
}

#[test]
fn test_sink_position_and_sync() -> anyhow::Result<()> {
    let dir = tmpdir();
    let mut sink = FdSink::file(dir.create("out.txt")?.into_std());
    sink.write_bytes(b"abcdef")?;
    assert_eq!(sink.position()?, 6);
    sink.seek(SeekFrom::Start(2))?;
    sink.write_byte(b'X')?;
    sink.sync()?;
    sink.close()?;
    assert!(matches!(sink.write_byte(b'!'), Err(StreamError::Closed)));

    let mut s = String::new();
    dir.open("out.txt")?.read_to_string(&mut s)?;
    assert_eq!(s, "abXdef");
    Ok(())
}

#[test]
fn test_standard_streams() -> anyhow::Result<()> {
    let mut err = io_filters::stderr();
    err.write_bytes(b"")?;
    err.flush()?;

    let mut out = io_filters::stdout();
    {
        let mut locked = out.lock();
        locked.write_bytes(b"")?;
    }
    out.flush()?;
    Ok(())
}

#[test]
fn test_stdout_is_shared() {
    let out = io_filters::stdout();
    let _guard = out.lock();
    // Every call hands out the same locked instance.
    assert!(io_filters::stdout().try_lock().is_none());
}
