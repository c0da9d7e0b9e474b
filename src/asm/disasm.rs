//! Disassembler for Risc-O programs.
//!
//! Converts instruction words back to the assembler's syntax.

use crate::cpu::decode::{decode, Instruction};
use crate::word::{Word, HALT_WORD};
use std::fmt::Write as _;

/// Disassemble a single word to text.
///
/// Jump targets use the assembler's `.+n` / `.-n` form, relative to the
/// jump itself, so the text reassembles to the same word.
pub fn disassemble_word(word: Word) -> String {
    if word == HALT_WORD {
        return "HALT".to_string();
    }
    format_instruction(&decode(word))
}

/// Disassemble `(address, word)` pairs, one line per word.
///
/// Jumps get their absolute target as a trailing comment.
pub fn disassemble(words: &[(u32, Word)]) -> String {
    let mut output = String::new();

    for &(addr, word) in words {
        let _ = write!(output, "{:04X}: {:04X}  {}", addr, word, disassemble_word(word));
        if word != HALT_WORD {
            if let Some(offset) = branch_offset(&decode(word)) {
                let target = (addr as i64 + 1 + i64::from(offset)) & 0xFFFF;
                let _ = write!(output, "  ; -> {:04X}", target);
            }
        }
        output.push('\n');
    }

    output
}

fn branch_offset(instr: &Instruction) -> Option<i16> {
    match *instr {
        Instruction::Jmp { offset } | Instruction::Branch { offset, .. } => Some(offset),
        _ => None,
    }
}

/// The encoded offset counts from the next instruction; `.` is this one.
fn relative_target(offset: i16) -> String {
    let delta = i32::from(offset) + 1;
    if delta < 0 {
        format!(".-{}", -delta)
    } else {
        format!(".+{}", delta)
    }
}

/// Format a decoded instruction as assembly text.
fn format_instruction(instr: &Instruction) -> String {
    match *instr {
        // Control flow
        Instruction::Jmp { offset } => format!("JMP {}", relative_target(offset)),
        Instruction::Branch { cond, offset } => {
            format!("J{} {}", cond.name(), relative_target(offset))
        }

        // Data transfer
        Instruction::Ldr { rd, rm, imm } => format!("LDR R{}, [R{}, #{}]", rd, rm, imm),
        Instruction::Str { rn, rm, imm } => format!("STR R{}, [R{}, #{}]", rn, rm, imm),
        Instruction::Mov { rd, imm } => format!("MOV R{}, #{}", rd, imm),

        // ALU
        Instruction::Add { rd, rm, rn } => format!("ADD R{}, R{}, R{}", rd, rm, rn),
        Instruction::Sub { rd, rm, rn } => format!("SUB R{}, R{}, R{}", rd, rm, rn),
        Instruction::And { rd, rm, rn } => format!("AND R{}, R{}, R{}", rd, rm, rn),
        Instruction::Or { rd, rm, rn } => format!("OR R{}, R{}, R{}", rd, rm, rn),
        Instruction::Addi { rd, rm, imm } => format!("ADDI R{}, R{}, #{}", rd, rm, imm),
        Instruction::Subi { rd, rm, imm } => format!("SUBI R{}, R{}, #{}", rd, rm, imm),
        Instruction::Shl { rd, rm, imm } => format!("SHL R{}, R{}, #{}", rd, rm, imm),
        Instruction::Shr { rd, rm, imm } => format!("SHR R{}, R{}, #{}", rd, rm, imm),
        Instruction::Cmp { rm, rn } => format!("CMP R{}, R{}", rm, rn),

        // Stack
        Instruction::Push { rn } => format!("PUSH R{}", rn),
        Instruction::Pop { rd } => format!("POP R{}", rd),
    }
}
