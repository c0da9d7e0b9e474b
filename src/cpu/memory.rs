//! Risc-O memory subsystem and I/O router.
//!
//! The Risc-O has 8192 sixteen-bit cells at addresses `0x0000..=0x1FFF`.
//! Four addresses far above that range are wired to the console instead of
//! memory; every other out-of-range address reads as zero and ignores writes.

use crate::cpu::io::Console;
use crate::word::Word;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// The number of memory cells in the Risc-O.
pub const MEMORY_SIZE: usize = 0x2000;

/// Read one character from the console.
pub const IO_CHAR_IN: u16 = 0xF000;
/// Write the low byte of a value as a character.
pub const IO_CHAR_OUT: u16 = 0xF001;
/// Read one signed decimal integer from the console.
pub const IO_INT_IN: u16 = 0xF002;
/// Write a value as a signed decimal integer.
pub const IO_INT_OUT: u16 = 0xF003;

/// A memory-mapped console port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoPort {
    CharIn,
    CharOut,
    IntIn,
    IntOut,
}

impl IoPort {
    /// The port mapped at `addr`, if any.
    pub fn from_addr(addr: u16) -> Option<Self> {
        match addr {
            IO_CHAR_IN => Some(IoPort::CharIn),
            IO_CHAR_OUT => Some(IoPort::CharOut),
            IO_INT_IN => Some(IoPort::IntIn),
            IO_INT_OUT => Some(IoPort::IntOut),
            _ => None,
        }
    }
}

/// Risc-O memory: 8192 sixteen-bit cells plus access tracking.
#[derive(Clone, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<Word>,
    /// Cells touched by a data read or write, reported in state dumps.
    accessed: Vec<bool>,
}

impl Memory {
    /// Create a new memory with all cells zeroed and nothing accessed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
            accessed: vec![false; MEMORY_SIZE],
        }
    }

    /// Whether `addr` names a physical cell.
    #[inline]
    pub fn in_bounds(addr: u16) -> bool {
        usize::from(addr) < MEMORY_SIZE
    }

    /// Read a cell without marking it accessed.
    ///
    /// Used for instruction fetch, the stack and state dumps. Out-of-range
    /// addresses yield `None`.
    #[inline]
    pub fn peek(&self, addr: u16) -> Option<Word> {
        self.cells.get(usize::from(addr)).copied()
    }

    /// Store into a cell without marking it accessed. Out-of-range addresses
    /// are ignored.
    #[inline]
    pub fn poke(&mut self, addr: u16, value: Word) {
        if let Some(cell) = self.cells.get_mut(usize::from(addr)) {
            *cell = value;
        }
    }

    /// Data read through the I/O router.
    ///
    /// Input ports block on the console and echo what they got; physical
    /// cells are marked accessed; everything else reads as zero.
    pub fn read<C: Console + ?Sized>(&mut self, addr: u16, console: &mut C) -> io::Result<Word> {
        match IoPort::from_addr(addr) {
            Some(IoPort::CharIn) => {
                // End of input yields zero without an echo.
                let Some(ch) = console.read_char()? else {
                    return Ok(0);
                };
                console.write_line(format!("IN => {}", ch).as_bytes())?;
                Ok(Word::from(ch))
            }
            Some(IoPort::IntIn) => {
                let value = console.read_int()?.unwrap_or(0);
                console.write_line(format!("IN => {}", value).as_bytes())?;
                Ok(value as Word)
            }
            _ => {
                let index = usize::from(addr);
                match self.cells.get(index) {
                    Some(&value) => {
                        self.accessed[index] = true;
                        Ok(value)
                    }
                    None => Ok(0),
                }
            }
        }
    }

    /// Data write through the I/O router.
    ///
    /// Output ports print to the console; physical cells are stored and
    /// marked accessed; everything else is dropped.
    pub fn write<C: Console + ?Sized>(
        &mut self,
        addr: u16,
        value: Word,
        console: &mut C,
    ) -> io::Result<()> {
        match IoPort::from_addr(addr) {
            Some(IoPort::CharOut) => {
                // The low byte goes out as is, with no text encoding.
                let mut line = b"OUT <= ".to_vec();
                line.push((value & 0xFF) as u8);
                console.write_line(&line)
            }
            Some(IoPort::IntOut) => {
                console.write_line(format!("OUT <= {}", value as i16).as_bytes())
            }
            _ => {
                let index = usize::from(addr);
                if index < MEMORY_SIZE {
                    self.cells[index] = value;
                    self.accessed[index] = true;
                }
                Ok(())
            }
        }
    }

    /// Whether a data access has touched `addr`.
    pub fn is_accessed(&self, addr: u16) -> bool {
        self.accessed.get(usize::from(addr)).copied().unwrap_or(false)
    }

    /// All accessed cells in ascending address order.
    pub fn accessed(&self) -> impl Iterator<Item = (u16, Word)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|&(addr, _)| self.accessed[addr])
            .map(|(addr, &value)| (addr as u16, value))
    }

    /// Clear all memory and the access record.
    pub fn clear(&mut self) {
        self.cells.fill(0);
        self.accessed.fill(false);
    }

    /// Load a program into memory starting at the given address.
    pub fn load_program(&mut self, start_addr: u16, program: &[Word]) -> Result<(), MemoryError> {
        let start = usize::from(start_addr);
        let available = MEMORY_SIZE.saturating_sub(start);
        if program.len() > available {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available,
            });
        }

        self.cells[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();
        let touched = self.accessed.iter().filter(|&&a| a).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("accessed_cells", &touched)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Program is too large to fit in memory.
    #[error("program size {size} exceeds available space {available}")]
    ProgramTooLarge { size: usize, available: usize },
}
