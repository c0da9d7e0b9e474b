//! CPU execution engine for the Risc-O.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::cpu::decode::{self, Condition, Instruction};
use crate::cpu::io::Console;
use crate::cpu::memory::MemoryError;
use crate::cpu::registers::PC;
use crate::cpu::{Memory, Registers};
use crate::word::{arith, Flags, Word, HALT_WORD};
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU fetched the halt word.
    Halted,
    /// CPU tried to fetch from outside memory.
    Faulted,
}

/// Outcome of a single fetch-decode-execute cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// An instruction ran to completion.
    Executed(Instruction),
    /// The halt word was fetched.
    Halted,
}

/// The Risc-O CPU.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count (for profiling).
    pub cycles: u64,
    /// Last executed instruction (for debugging).
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a new CPU in its reset state.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            state: CpuState::Running,
            cycles: 0,
            last_instr: None,
        }
    }

    /// Reset the CPU to initial state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_instr = None;
    }

    /// Load a program into memory at address 0.
    pub fn load_program(&mut self, program: &[Word]) -> Result<(), MemoryError> {
        self.mem.load_program(0, program)
    }

    /// Execute a single instruction.
    ///
    /// Console I/O happens only if the instruction touches an I/O port.
    pub fn step<C: Console + ?Sized>(&mut self, console: &mut C) -> Result<Step, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        // Fetch. Code fetch does not count as a data access.
        let pc = self.regs.pc();
        let Some(word) = self.mem.peek(pc) else {
            self.state = CpuState::Faulted;
            tracing::warn!(pc = format_args!("{:#06x}", pc), "program counter out of bounds");
            return Err(CpuError::PcOutOfBounds(pc));
        };

        // Advance PC before execution (jumps override the staged value)
        self.regs.advance_pc();
        self.cycles += 1;

        if word == HALT_WORD {
            self.state = CpuState::Halted;
            self.regs.commit_pc();
            tracing::debug!(pc = format_args!("{:#06x}", pc), cycles = self.cycles, "halted");
            return Ok(Step::Halted);
        }

        // Decode
        let instr = decode::decode(word);
        tracing::trace!(
            pc = format_args!("{:#06x}", pc),
            word = format_args!("{:#06x}", word),
            ?instr,
            "execute"
        );

        // Execute
        self.execute(instr, console)?;

        // Commit
        self.regs.commit_pc();
        self.last_instr = Some(instr);

        Ok(Step::Executed(instr))
    }

    /// Execute a decoded instruction.
    fn execute<C: Console + ?Sized>(
        &mut self,
        instr: Instruction,
        console: &mut C,
    ) -> Result<(), CpuError> {
        match instr {
            // ==================== Control Flow ====================

            Instruction::Jmp { offset } => {
                self.regs.stage_relative(offset);
            }

            Instruction::Branch { cond, offset } => {
                if self.condition_holds(cond) {
                    self.regs.stage_relative(offset);
                }
            }

            // ==================== Data Transfer ====================

            Instruction::Ldr { rd, rm, imm } => {
                let addr = self.regs.get(rm).wrapping_add(Word::from(imm));
                let value = self.mem.read(addr, console)?;
                self.regs.set(rd, value);
            }

            Instruction::Str { rn, rm, imm } => {
                let addr = self.regs.get(rm).wrapping_add(Word::from(imm));
                self.mem.write(addr, self.regs.get(rn), console)?;
            }

            Instruction::Mov { rd, imm } => {
                self.regs.set(rd, imm as Word);
            }

            // ==================== Arithmetic & Logic ====================

            Instruction::Add { rd, rm, rn } => {
                self.alu(rd, arith::add(self.regs.get(rm), self.regs.get(rn)));
            }

            Instruction::Addi { rd, rm, imm } => {
                self.alu(rd, arith::add(self.regs.get(rm), Word::from(imm)));
            }

            Instruction::Sub { rd, rm, rn } => {
                self.alu(rd, arith::subtract(self.regs.get(rm), self.regs.get(rn)));
            }

            Instruction::Subi { rd, rm, imm } => {
                self.alu(rd, arith::subtract(self.regs.get(rm), Word::from(imm)));
            }

            Instruction::And { rd, rm, rn } => {
                self.alu(rd, arith::and(self.regs.get(rm), self.regs.get(rn)));
            }

            Instruction::Or { rd, rm, rn } => {
                self.alu(rd, arith::or(self.regs.get(rm), self.regs.get(rn)));
            }

            Instruction::Shr { rd, rm, imm } => {
                self.alu(rd, arith::shift_right(self.regs.get(rm), imm));
            }

            Instruction::Shl { rd, rm, imm } => {
                self.alu(rd, arith::shift_left(self.regs.get(rm), imm));
            }

            Instruction::Cmp { rm, rn } => {
                self.regs.flags = Flags::compare(self.regs.get(rm), self.regs.get(rn));
            }

            // ==================== Stack ====================

            Instruction::Push { rn } => {
                // SP moves first, so `PUSH R14` stores the decremented SP.
                let sp = self.regs.sp().wrapping_sub(1);
                self.regs.set_sp(sp);
                self.mem.poke(sp, self.regs.get(rn));
            }

            Instruction::Pop { rd } => {
                let sp = self.regs.sp();
                let value = self.mem.peek(sp).unwrap_or(0);
                self.regs.set_sp(sp.wrapping_add(1));

                // Popping into the PC redirects the next fetch.
                if rd == PC {
                    self.regs.stage_jump(value);
                } else {
                    self.regs.set(rd, value);
                }
            }
        }

        Ok(())
    }

    /// Store an ALU result and its flags.
    #[inline]
    fn alu(&mut self, rd: u8, (result, flags): (Word, Flags)) {
        self.regs.set(rd, result);
        self.regs.flags = flags;
    }

    /// Evaluate a branch condition against the current flags.
    pub fn condition_holds(&self, cond: Condition) -> bool {
        let Flags { zero, carry } = self.regs.flags;
        match cond {
            Condition::Eq => zero,
            Condition::Ne => !zero,
            Condition::Lt => !zero && carry,
            Condition::Ge => zero || !carry,
        }
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("mem", &self.mem)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("Program counter out of bounds: 0x{0:04X}!")]
    PcOutOfBounds(u16),

    #[error("console I/O failed: {0}")]
    Io(#[from] io::Error),
}
