//! 16-bit word primitives for the Risc-O.
//!
//! This module provides the pieces every other part of the machine is built on:
//! - [`Word`] - a 16-bit memory cell, register, or instruction
//! - [`Flags`] - the zero and carry status flags
//! - [`fields`] - operand field extraction with sign extension
//! - [`arith`] - wrapping arithmetic that reports its flags

pub mod arith;
pub mod fields;
mod flags;

pub use arith::{add, and, or, shift_left, shift_right, subtract};
pub use fields::{opcode, operand, sign_extend};
pub use flags::Flags;

/// A 16-bit machine word. All arithmetic on words wraps modulo 2^16.
pub type Word = u16;

/// The reserved all-ones instruction word that halts the machine.
pub const HALT_WORD: Word = 0xFFFF;
