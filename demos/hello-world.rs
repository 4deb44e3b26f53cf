use io_filters::{pipe, BufferedSink, ByteSink, ByteSource, DataSink, DataSource, Next};
use std::thread;

fn main() -> anyhow::Result<()> {
    let (writer, reader) = pipe();

    // Encode a few greetings on one thread...
    let producer = thread::spawn(move || -> io_filters::Result<()> {
        let mut out = DataSink::new(BufferedSink::new(writer));
        for name in ["world", "pipe", "wörld"] {
            out.write_utf(&format!("Hello, {}!\n", name))?;
        }
        out.close()
    });

    // ...and decode them on this one, copying the text to stdout.
    let mut input = DataSource::new(reader);
    let mut stdout = BufferedSink::new(io_filters::stdout());
    loop {
        match input.read_utf() {
            Ok(line) => stdout.write_bytes(line.as_bytes())?,
            Err(io_filters::StreamError::EndOfData) => break,
            Err(err) => return Err(err.into()),
        }
    }
    stdout.flush()?;
    producer.join().expect("producer panicked")?;
    assert_eq!(input.read_byte()?, Next::EndOfStream);
    Ok(())
}
