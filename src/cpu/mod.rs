//! CPU emulation for the Risc-O.
//!
//! This module implements the complete Risc-O architecture:
//! - 8192 sixteen-bit memory cells, with four memory-mapped console ports
//! - 16 registers (R14 = SP, R15 = PC) and the Z/C flags
//! - 16-instruction load/store set plus the `0xFFFF` halt word
//! - a run loop that dumps the machine state at breakpoints and on halt

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;
pub mod debug;
pub mod io;

pub use memory::{Memory, MemoryError, MEMORY_SIZE};
pub use registers::Registers;
pub use decode::{Instruction, Condition, decode, encode};
pub use execute::{Cpu, CpuError, CpuState, Step};
pub use debug::{Breakpoints, Exit, RunConfig, RunSummary, StateDump};
pub use io::{Console, StreamConsole};
