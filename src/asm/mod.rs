//! Assembler, disassembler and program images for the Risc-O.
//!
//! This module provides:
//! - A two-pass assembler (source text → words)
//! - A disassembler (words → source text)
//! - The program image text format read by the simulator

pub mod assembler;
pub mod disasm;
pub mod image;

pub use assembler::{assemble, AssemblerError};
pub use disasm::{disassemble, disassemble_word};
pub use image::{load_image, save_image, ImageError, ProgramImage};
