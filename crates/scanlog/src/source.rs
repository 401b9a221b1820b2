//! Line-oriented byte streams.
//!
//! The logger reads newline-terminated lines through the [`LineSource`]
//! trait. [`StreamLineSource`] implements it over any [`Read`], which is a
//! serial port in production and an in-memory reader in tests.

use std::io::{BufRead, BufReader, ErrorKind, Read};

use serialport::SerialPort;
use tracing::{debug, trace};

use crate::config::SerialConfig;
use crate::error::{Error, Result};

/// What a single read produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadEvent {
    /// A complete line, newline stripped, not yet decoded.
    Line(Vec<u8>),
    /// The read timeout elapsed before a full line arrived.
    Timeout,
}

/// A source of raw lines.
pub trait LineSource {
    /// Identifier of the underlying stream, for diagnostics.
    fn name(&self) -> &str;

    /// Read one line, waiting at most the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disconnected`] when the stream reports anything other
    /// than a timeout, including end of stream.
    fn read_line(&mut self) -> Result<ReadEvent>;
}

/// A [`LineSource`] over any byte reader.
///
/// Bytes of a line that is cut off by a timeout are kept and joined with the
/// rest of the line on the next read.
#[derive(Debug)]
pub struct StreamLineSource<R> {
    name: String,
    reader: BufReader<R>,
    pending: Vec<u8>,
}

/// The production source: a serial port.
pub type SerialLineSource = StreamLineSource<Box<dyn SerialPort>>;

impl<R: Read> StreamLineSource<R> {
    /// Wrap a reader.
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader: BufReader::new(reader),
            pending: Vec::new(),
        }
    }

    /// Take the buffered line, dropping the terminator (`\n` or `\r\n`).
    fn take_line(&mut self) -> Vec<u8> {
        let mut line = std::mem::take(&mut self.pending);
        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }
        line
    }
}

impl<R: Read> LineSource for StreamLineSource<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_line(&mut self) -> Result<ReadEvent> {
        match self.reader.read_until(b'\n', &mut self.pending) {
            Ok(0) if self.pending.is_empty() => Err(Error::disconnected(
                &self.name,
                std::io::Error::new(ErrorKind::UnexpectedEof, "end of stream"),
            )),
            Ok(n) => {
                trace!("Read {} bytes from {}", n, self.name);
                Ok(ReadEvent::Line(self.take_line()))
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                Ok(ReadEvent::Timeout)
            }
            Err(e) => Err(Error::disconnected(&self.name, e)),
        }
    }
}

/// Open the configured serial port.
///
/// # Errors
///
/// Returns [`Error::PortOpen`] if the port cannot be opened.
pub fn open_serial(config: &SerialConfig) -> Result<SerialLineSource> {
    debug!(
        "Opening {} at {} baud (timeout {:?})",
        config.port,
        config.baud_rate,
        config.timeout()
    );
    let port = serialport::new(&config.port, config.baud_rate)
        .timeout(config.timeout())
        .data_bits(serialport::DataBits::Eight)
        .stop_bits(serialport::StopBits::One)
        .parity(serialport::Parity::None)
        .flow_control(serialport::FlowControl::None)
        .open()
        .map_err(|source| Error::PortOpen {
            port: config.port.clone(),
            source,
        })?;

    Ok(StreamLineSource::new(config.port.clone(), port))
}
