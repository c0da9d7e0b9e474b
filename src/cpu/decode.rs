//! Instruction decoder for the Risc-O.
//!
//! The low nibble of a word selects one of sixteen opcodes. All sixteen are
//! assigned, so every word decodes to some instruction; the halt sentinel
//! `0xFFFF` is recognised by the execution loop before decoding.

use crate::word::fields::{self, place};
use serde::{Deserialize, Serialize};

/// Branch condition of a `Jcc` instruction, held in bits 15..14.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// Z = 1
    Eq,
    /// Z = 0
    Ne,
    /// Z = 0 and C = 1
    Lt,
    /// Z = 1 or C = 0
    Ge,
}

impl Condition {
    /// Decode from the two-bit condition code.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => Condition::Eq,
            1 => Condition::Ne,
            2 => Condition::Lt,
            _ => Condition::Ge,
        }
    }

    /// The two-bit condition code.
    pub fn bits(self) -> u8 {
        match self {
            Condition::Eq => 0,
            Condition::Ne => 1,
            Condition::Lt => 2,
            Condition::Ge => 3,
        }
    }

    /// Mnemonic suffix (`EQ`, `NE`, `LT`, `GE`).
    pub fn name(self) -> &'static str {
        match self {
            Condition::Eq => "EQ",
            Condition::Ne => "NE",
            Condition::Lt => "LT",
            Condition::Ge => "GE",
        }
    }
}

/// Decoded Risc-O instruction.
///
/// Register operands are 4-bit indices. Immediates keep the width of their
/// field; signed ones are already sign-extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    // ==================== Control Flow ====================

    /// Unconditional jump: PC := PC + offset
    Jmp { offset: i16 },

    /// Conditional jump: if cond then PC := PC + offset
    Branch { cond: Condition, offset: i16 },

    // ==================== Data Transfer ====================

    /// Load: rd := [rm + imm]
    Ldr { rd: u8, rm: u8, imm: u8 },

    /// Store: [rm + imm] := rn
    Str { rn: u8, rm: u8, imm: u8 },

    /// Move immediate: rd := imm
    Mov { rd: u8, imm: i16 },

    // ==================== Arithmetic & Logic ====================

    /// rd := rm + rn
    Add { rd: u8, rm: u8, rn: u8 },

    /// rd := rm + imm
    Addi { rd: u8, rm: u8, imm: u8 },

    /// rd := rm - rn
    Sub { rd: u8, rm: u8, rn: u8 },

    /// rd := rm - imm
    Subi { rd: u8, rm: u8, imm: u8 },

    /// rd := rm & rn
    And { rd: u8, rm: u8, rn: u8 },

    /// rd := rm | rn
    Or { rd: u8, rm: u8, rn: u8 },

    /// rd := rm >> imm
    Shr { rd: u8, rm: u8, imm: u8 },

    /// rd := rm << imm
    Shl { rd: u8, rm: u8, imm: u8 },

    /// Set flags from rm compared to rn
    Cmp { rm: u8, rn: u8 },

    // ==================== Stack ====================

    /// SP := SP - 1; [SP] := rn
    Push { rn: u8 },

    /// rd := [SP]; SP := SP + 1
    Pop { rd: u8 },
}

/// Opcode values (low nibble of the instruction word).
pub struct Opcode;

impl Opcode {
    pub const JMP: u8 = 0x0;
    pub const JCC: u8 = 0x1;
    pub const LDR: u8 = 0x2;
    pub const STR: u8 = 0x3;
    pub const MOV: u8 = 0x4;
    pub const ADD: u8 = 0x5;
    pub const ADDI: u8 = 0x6;
    pub const SUB: u8 = 0x7;
    pub const SUBI: u8 = 0x8;
    pub const AND: u8 = 0x9;
    pub const OR: u8 = 0xA;
    pub const SHR: u8 = 0xB;
    pub const SHL: u8 = 0xC;
    pub const CMP: u8 = 0xD;
    pub const PUSH: u8 = 0xE;
    pub const POP: u8 = 0xF;
}

/// Decode a 16-bit instruction word.
pub fn decode(word: u16) -> Instruction {
    let ibr = fields::operand(word);
    let rd = fields::rd(ibr);
    let rm = fields::rm(ibr);
    let rn = fields::rn(ibr);
    let imm = fields::imm4(ibr);

    match fields::opcode(word) {
        Opcode::JMP => Instruction::Jmp { offset: fields::offset12(ibr) },
        Opcode::JCC => Instruction::Branch {
            cond: Condition::from_bits(fields::condition(word)),
            offset: fields::offset10(ibr),
        },
        Opcode::LDR => Instruction::Ldr { rd, rm, imm },
        // STR keeps its immediate in the rd position.
        Opcode::STR => Instruction::Str { rn, rm, imm: rd },
        Opcode::MOV => Instruction::Mov { rd, imm: fields::simm8(ibr) },
        Opcode::ADD => Instruction::Add { rd, rm, rn },
        Opcode::ADDI => Instruction::Addi { rd, rm, imm },
        Opcode::SUB => Instruction::Sub { rd, rm, rn },
        Opcode::SUBI => Instruction::Subi { rd, rm, imm },
        Opcode::AND => Instruction::And { rd, rm, rn },
        Opcode::OR => Instruction::Or { rd, rm, rn },
        Opcode::SHR => Instruction::Shr { rd, rm, imm },
        Opcode::SHL => Instruction::Shl { rd, rm, imm },
        Opcode::CMP => Instruction::Cmp { rm, rn },
        Opcode::PUSH => Instruction::Push { rn },
        Opcode::POP => Instruction::Pop { rd },
        // The opcode is four bits wide and all sixteen values are taken.
        _ => unreachable!("opcode nibble out of range"),
    }
}

/// Encode an instruction back to a 16-bit word.
///
/// Fields the instruction does not use are left zero; immediates and
/// offsets are truncated to their field width.
pub fn encode(instr: &Instruction) -> u16 {
    let rrr = |op: u8, a: u8, b: u8, c: u8| {
        place(u16::from(a), 4, 12) | place(u16::from(b), 4, 8) | place(u16::from(c), 4, 4) | u16::from(op)
    };

    match *instr {
        Instruction::Jmp { offset } => place(offset as u16, 12, 4) | u16::from(Opcode::JMP),
        Instruction::Branch { cond, offset } => {
            place(u16::from(cond.bits()), 2, 14) | place(offset as u16, 10, 4) | u16::from(Opcode::JCC)
        }
        Instruction::Ldr { rd, rm, imm } => rrr(Opcode::LDR, rd, rm, imm),
        Instruction::Str { rn, rm, imm } => rrr(Opcode::STR, imm, rm, rn),
        Instruction::Mov { rd, imm } => {
            place(u16::from(rd), 4, 12) | place(imm as u16, 8, 4) | u16::from(Opcode::MOV)
        }
        Instruction::Add { rd, rm, rn } => rrr(Opcode::ADD, rd, rm, rn),
        Instruction::Addi { rd, rm, imm } => rrr(Opcode::ADDI, rd, rm, imm),
        Instruction::Sub { rd, rm, rn } => rrr(Opcode::SUB, rd, rm, rn),
        Instruction::Subi { rd, rm, imm } => rrr(Opcode::SUBI, rd, rm, imm),
        Instruction::And { rd, rm, rn } => rrr(Opcode::AND, rd, rm, rn),
        Instruction::Or { rd, rm, rn } => rrr(Opcode::OR, rd, rm, rn),
        Instruction::Shr { rd, rm, imm } => rrr(Opcode::SHR, rd, rm, imm),
        Instruction::Shl { rd, rm, imm } => rrr(Opcode::SHL, rd, rm, imm),
        Instruction::Cmp { rm, rn } => rrr(Opcode::CMP, 0, rm, rn),
        Instruction::Push { rn } => rrr(Opcode::PUSH, 0, 0, rn),
        Instruction::Pop { rd } => rrr(Opcode::POP, rd, 0, 0),
    }
}
