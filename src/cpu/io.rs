//! Console seen by the memory-mapped I/O ports.
//!
//! The memory router decides *what* to print (`IN => ..`, `OUT <= ..`); a
//! [`Console`] only moves raw values and lines in and out of the process.
//! Lines are bytes, not text: character output carries the raw low byte.

use crate::scan::Scanner;
use std::io::{self, BufRead, Write};

/// Input and output channel of a running machine.
pub trait Console {
    /// Block for one non-whitespace character. `None` at end of input.
    fn read_char(&mut self) -> io::Result<Option<u8>>;

    /// Block for one signed decimal integer. `None` if the input is
    /// malformed or exhausted.
    fn read_int(&mut self) -> io::Result<Option<i32>>;

    /// Emit one line of output; the newline is appended here.
    fn write_line(&mut self, line: &[u8]) -> io::Result<()>;
}

/// A [`Console`] reading tokens from a [`Scanner`] and writing lines to any
/// [`Write`] sink.
pub struct StreamConsole<R, W> {
    input: Scanner<R>,
    output: W,
}

impl<R: BufRead, W: Write> StreamConsole<R, W> {
    /// Build a console over an already-positioned scanner.
    pub fn new(input: Scanner<R>, output: W) -> Self {
        Self { input, output }
    }

    /// Build a console over a fresh reader.
    pub fn from_reader(reader: R, output: W) -> Self {
        Self::new(Scanner::new(reader), output)
    }

    /// Flush and give back the output sink.
    pub fn into_output(mut self) -> io::Result<W> {
        self.output.flush()?;
        Ok(self.output)
    }
}

impl<R: BufRead, W: Write> Console for StreamConsole<R, W> {
    fn read_char(&mut self) -> io::Result<Option<u8>> {
        // Pending output must be visible before blocking on input.
        self.output.flush()?;
        self.input.next_char()
    }

    fn read_int(&mut self) -> io::Result<Option<i32>> {
        self.output.flush()?;
        self.input.next_decimal()
    }

    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        self.output.write_all(line)?;
        self.output.write_all(b"\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_stream_console() {
        let mut console = StreamConsole::from_reader(Cursor::new("q 12 junk"), Vec::new());
        assert_eq!(console.read_char().unwrap(), Some(b'q'));
        assert_eq!(console.read_int().unwrap(), Some(12));
        assert_eq!(console.read_int().unwrap(), None);
        console.write_line(b"hello").unwrap();
        console.write_line(&[0xE9]).unwrap();
        let out = console.into_output().unwrap();
        assert_eq!(out, b"hello\n\xE9\n");
    }
}
