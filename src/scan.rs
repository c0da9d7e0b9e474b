//! Whitespace-separated token scanner.
//!
//! The simulator reads its whole input from one stream: first the program
//! image, then whatever the running program asks for through the input
//! ports. [`Scanner`] hands out numbers and characters from that stream one
//! at a time so both consumers can share it.
//!
//! A token that fails to parse is left in the stream, like `scanf` does.

use std::io::{self, BufRead};

/// A byte-level token reader over a buffered input stream.
pub struct Scanner<R> {
    reader: R,
}

impl<R: BufRead> Scanner<R> {
    /// Wrap a buffered reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    fn peek(&mut self) -> io::Result<Option<u8>> {
        let buf = self.reader.fill_buf()?;
        Ok(buf.first().copied())
    }

    fn bump(&mut self) {
        self.reader.consume(1);
    }

    fn skip_whitespace(&mut self) -> io::Result<()> {
        while let Some(b) = self.peek()? {
            if !b.is_ascii_whitespace() {
                break;
            }
            self.bump();
        }
        Ok(())
    }

    /// Read the next non-whitespace byte.
    ///
    /// Returns `None` at end of input.
    pub fn next_char(&mut self) -> io::Result<Option<u8>> {
        self.skip_whitespace()?;
        let b = self.peek()?;
        if b.is_some() {
            self.bump();
        }
        Ok(b)
    }

    /// Read a signed decimal integer.
    ///
    /// Returns `None` at end of input or when the next token does not start
    /// with a digit. Values outside the `i32` range wrap.
    pub fn next_decimal(&mut self) -> io::Result<Option<i32>> {
        self.skip_whitespace()?;

        let negative = match self.peek()? {
            Some(b'-') => {
                self.bump();
                true
            }
            Some(b'+') => {
                self.bump();
                false
            }
            _ => false,
        };

        let mut value: i32 = 0;
        let mut digits = 0;
        while let Some(b) = self.peek()? {
            if !b.is_ascii_digit() {
                break;
            }
            value = value.wrapping_mul(10).wrapping_add(i32::from(b - b'0'));
            digits += 1;
            self.bump();
        }

        if digits == 0 {
            return Ok(None);
        }
        Ok(Some(if negative { value.wrapping_neg() } else { value }))
    }

    /// Read an unsigned hexadecimal number, with or without a `0x` prefix.
    ///
    /// Returns `None` at end of input or when no hex digit follows.
    pub fn next_hex(&mut self) -> io::Result<Option<u32>> {
        self.skip_whitespace()?;

        let mut value: u32 = 0;
        let mut digits = 0;

        // A leading zero may be the start of a `0x` prefix.
        if self.peek()? == Some(b'0') {
            self.bump();
            digits += 1;
            if matches!(self.peek()?, Some(b'x' | b'X')) {
                self.bump();
                digits = 0;
            }
        }

        while let Some(b) = self.peek()? {
            let Some(nibble) = (b as char).to_digit(16) else {
                break;
            };
            value = value.wrapping_shl(4) | nibble;
            digits += 1;
            self.bump();
        }

        if digits == 0 {
            return Ok(None);
        }
        Ok(Some(value))
    }
}
