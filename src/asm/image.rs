//! Program image format for Risc-O programs.
//!
//! An image is a whitespace-separated text stream:
//! - a decimal breakpoint count
//! - that many hexadecimal breakpoint addresses
//! - hexadecimal `address value` pairs, terminated by the pair `0 0`
//!
//! Anything after the terminator belongs to the running program's input.

use crate::cpu::{Breakpoints, Cpu, Memory};
use crate::scan::Scanner;
use crate::word::Word;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

/// A loaded program image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramImage {
    /// Breakpoint addresses as read, out-of-range ones included.
    pub breakpoints: Vec<u32>,
    /// `(address, value)` pairs in input order.
    pub words: Vec<(u32, Word)>,
}

impl ProgramImage {
    /// Create a new empty image.
    pub fn new() -> Self {
        Self::default()
    }

    /// An image holding `program` at consecutive addresses from 0.
    pub fn from_words(program: &[Word]) -> Self {
        Self {
            breakpoints: Vec::new(),
            words: program
                .iter()
                .enumerate()
                .map(|(addr, &value)| (addr as u32, value))
                .collect(),
        }
    }

    /// Read an image from the front of `scanner`, leaving the rest of the
    /// stream in place.
    ///
    /// A malformed breakpoint address counts as address 0 and stops further
    /// parsing of breakpoints; the pair list ends at `0 0` or at the first
    /// pair that is missing or malformed.
    pub fn read<R: BufRead>(scanner: &mut Scanner<R>) -> Result<Self, ImageError> {
        let count = scanner
            .next_decimal()?
            .ok_or(ImageError::MissingBreakpointCount)?;

        let mut image = Self::new();
        for _ in 0..count.max(0) {
            match scanner.next_hex()? {
                Some(addr) => image.breakpoints.push(addr),
                None => {
                    // The bad token stays put, so every remaining read would
                    // fail the same way.
                    image.breakpoints.push(0);
                    break;
                }
            }
        }

        loop {
            let Some(addr) = scanner.next_hex()? else { break };
            let Some(value) = scanner.next_hex()? else { break };
            if addr == 0 && value == 0 {
                break;
            }
            image.words.push((addr, (value & 0xFFFF) as Word));
        }

        tracing::debug!(
            breakpoints = image.breakpoints.len(),
            words = image.words.len(),
            "program image read"
        );
        Ok(image)
    }

    /// Store every in-range word into the CPU's memory.
    pub fn apply(&self, cpu: &mut Cpu) {
        for &(addr, value) in &self.words {
            match u16::try_from(addr) {
                Ok(addr) if Memory::in_bounds(addr) => cpu.mem.poke(addr, value),
                _ => tracing::debug!(addr, "ignoring word outside memory"),
            }
        }
    }

    /// The breakpoint set; out-of-range addresses are dropped.
    pub fn breakpoint_set(&self) -> Breakpoints {
        self.breakpoints.iter().copied().collect()
    }

    /// Write the image in its text form, terminator included.
    pub fn write<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "{}", self.breakpoints.len())?;
        for addr in &self.breakpoints {
            writeln!(out, "{:04X}", addr)?;
        }
        for &(addr, value) in &self.words {
            // A zero word at address 0 would read back as the terminator;
            // memory starts zeroed, so leaving it out changes nothing.
            if addr == 0 && value == 0 {
                continue;
            }
            writeln!(out, "{:04X} {:04X}", addr, value)?;
        }
        writeln!(out, "0000 0000")
    }

    /// Get the number of words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Load an image file from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<ProgramImage, ImageError> {
    let file = std::fs::File::open(path.as_ref())?;
    ProgramImage::read(&mut Scanner::new(BufReader::new(file)))
}

/// Save an image file to disk.
pub fn save_image<P: AsRef<Path>>(path: P, image: &ProgramImage) -> Result<(), ImageError> {
    let file = std::fs::File::create(path.as_ref())?;
    let mut out = io::BufWriter::new(file);
    image.write(&mut out)?;
    out.flush()?;
    Ok(())
}

/// Errors that can occur while reading or writing an image.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("missing breakpoint count at start of image")]
    MissingBreakpointCount,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn scanner(input: &str) -> Scanner<Cursor<Vec<u8>>> {
        Scanner::new(Cursor::new(input.as_bytes().to_vec()))
    }

    #[test]
    fn test_read_image() {
        let mut s = scanner("2\n0001\n3000\n0000 4015\n0001 FFFF\n0 0\n5");
        let image = ProgramImage::read(&mut s).unwrap();

        assert_eq!(image.breakpoints, vec![1, 0x3000]);
        assert_eq!(image.words, vec![(0, 0x4015), (1, 0xFFFF)]);
        // The runtime input is still there
        assert_eq!(s.next_decimal().unwrap(), Some(5));
    }

    #[test]
    fn test_read_without_terminator() {
        let mut s = scanner("0 10 1");
        let image = ProgramImage::read(&mut s).unwrap();
        assert_eq!(image.words, vec![(0x10, 1)]);
    }

    #[test]
    fn test_missing_count() {
        let mut s = scanner("");
        assert!(matches!(
            ProgramImage::read(&mut s),
            Err(ImageError::MissingBreakpointCount)
        ));
    }

    #[test]
    fn test_malformed_breakpoint_reads_as_zero() {
        let mut s = scanner("3 10 zz");
        let image = ProgramImage::read(&mut s).unwrap();
        assert_eq!(image.breakpoints, vec![0x10, 0]);
        assert!(image.is_empty());
    }

    #[test]
    fn test_value_masked_to_word() {
        let mut s = scanner("0 5 12345 0 0");
        let image = ProgramImage::read(&mut s).unwrap();
        assert_eq!(image.words, vec![(5, 0x2345)]);
    }

    #[test]
    fn test_apply_and_breakpoints() {
        let image = ProgramImage {
            breakpoints: vec![1, 0x2000, 0x1FFF],
            words: vec![(0, 0x1234), (0x2000, 7), (0x1_0000, 9), (0x1FFF, 5)],
        };
        let mut cpu = Cpu::new();
        image.apply(&mut cpu);

        assert_eq!(cpu.mem.peek(0), Some(0x1234));
        assert_eq!(cpu.mem.peek(0x1FFF), Some(5));
        assert_eq!(cpu.mem.accessed().count(), 0);
        assert_eq!(image.breakpoint_set().iter().collect::<Vec<_>>(), vec![1, 0x1FFF]);
    }

    #[test]
    fn test_write_then_read() {
        let mut image = ProgramImage::from_words(&[0, 0x0014, 0xFFFF]);
        image.breakpoints.push(2);

        let mut out = Vec::new();
        image.write(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "1\n0002\n0001 0014\n0002 FFFF\n0000 0000\n");

        let back = ProgramImage::read(&mut scanner(&text)).unwrap();
        assert_eq!(back.breakpoints, vec![2]);
        assert_eq!(back.words, vec![(1, 0x0014), (2, 0xFFFF)]);
    }
}
