//! # Risc-O Simulator
//!
//! An instruction-set simulator for the Risc-O, a 16-bit load/store
//! teaching architecture with sixteen registers, 8192 words of memory and
//! a memory-mapped text console.
//!
//! A program arrives as a text image (breakpoints, then `address value`
//! pairs); the simulator runs it to completion, dumping the machine state
//! at every breakpoint and once more on halt.

pub mod word;
pub mod scan;
pub mod cpu;
pub mod asm;

// Re-export commonly used types
pub use word::{Flags, Word, HALT_WORD};
pub use scan::Scanner;
pub use cpu::{
    Breakpoints, Console, Cpu, CpuError, CpuState, Exit, Instruction, Memory, Registers,
    RunConfig, RunSummary, StreamConsole,
};
pub use asm::{
    assemble, disassemble, disassemble_word, load_image, save_image, AssemblerError, ImageError,
    ProgramImage,
};
