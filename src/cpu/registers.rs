//! Risc-O CPU registers.
//!
//! The Risc-O has 16 general registers of 16 bits each. Two of them carry a
//! convention:
//! - R14: stack pointer (SP), grows downward from one past the top of memory
//! - R15: program counter (PC)
//!
//! Beside the register file the CPU keeps a staged "next PC". Fetch stages
//! PC+1, a taken branch or a `POP R15` overwrites it, and the end of the
//! instruction commits it to R15.

use crate::cpu::memory::MEMORY_SIZE;
use crate::word::{Flags, Word};
use serde::{Deserialize, Serialize};

/// Number of general registers.
pub const REGISTER_COUNT: usize = 16;

/// Index of the stack pointer.
pub const SP: u8 = 14;

/// Index of the program counter.
pub const PC: u8 = 15;

/// SP value of an empty stack: one past the last memory cell.
pub const SP_RESET: Word = MEMORY_SIZE as Word;

/// The Risc-O register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// R0..R15.
    pub r: [Word; REGISTER_COUNT],

    /// Z and C status flags.
    pub flags: Flags,

    /// PC value to commit when the current instruction finishes.
    pub next_pc: Word,
}

impl Registers {
    /// Create a register file in its reset state: everything zero except SP.
    pub fn new() -> Self {
        let mut r = [0; REGISTER_COUNT];
        r[usize::from(SP)] = SP_RESET;
        Self {
            r,
            flags: Flags::default(),
            next_pc: 0,
        }
    }

    /// Reset all registers to their power-on values.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Read a register by index (low four bits used).
    #[inline]
    pub fn get(&self, index: u8) -> Word {
        self.r[usize::from(index & 0xF)]
    }

    /// Write a register by index (low four bits used).
    #[inline]
    pub fn set(&mut self, index: u8, value: Word) {
        self.r[usize::from(index & 0xF)] = value;
    }

    #[inline]
    pub fn pc(&self) -> Word {
        self.r[usize::from(PC)]
    }

    #[inline]
    pub fn sp(&self) -> Word {
        self.r[usize::from(SP)]
    }

    #[inline]
    pub fn set_sp(&mut self, value: Word) {
        self.r[usize::from(SP)] = value;
    }

    /// Fetch-time PC update: R15 becomes PC+1 and the same value is staged
    /// as the next PC. Returns the PC before the increment.
    pub fn advance_pc(&mut self) -> Word {
        let old = self.pc();
        let next = old.wrapping_add(1);
        self.r[usize::from(PC)] = next;
        self.next_pc = next;
        old
    }

    /// Override the staged PC for this instruction.
    #[inline]
    pub fn stage_jump(&mut self, target: Word) {
        self.next_pc = target;
    }

    /// Stage a PC-relative jump. The base is the already-advanced PC.
    pub fn stage_relative(&mut self, offset: i16) {
        self.next_pc = self.pc().wrapping_add_signed(offset);
    }

    /// End-of-instruction commit of the staged PC.
    #[inline]
    pub fn commit_pc(&mut self) {
        self.r[usize::from(PC)] = self.next_pc;
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
