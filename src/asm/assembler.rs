//! Two-pass assembler for Risc-O programs.
//!
//! Syntax:
//! ```text
//! ; Comment            (`//` works too)
//! loop: next:          ; Any number of labels may prefix a line
//!     MOV  R1, #10     ; rd := signed 8-bit immediate
//!     LDR  R2, [R1, #3]
//!     STR  R2, [R1, #4]
//!     ADD  R3, R1, R2
//!     ADDI R3, R3, #1  ; 4-bit unsigned immediate
//!     CMP  R1, R2
//!     JNE  loop        ; JEQ JNE JLT JGE (JGT is an alias of JGE)
//!     JMP  done
//!     JMP  .+2         ; `.` is this instruction's own address
//!     PUSH R3
//!     POP  PC          ; SP and PC name R14 and R15
//! done:
//!     HALT
//!     'A'              ; character data word
//!     .word 0x1234     ; data word (DAT also accepted)
//! ```
//!
//! Every non-empty line produces exactly one word, starting at address 0.
//! Branch targets are labels, absolute addresses, or `.`, `.+n`, `.-n`
//! relative to the branch itself; they are encoded relative to the address
//! of the following instruction.

use crate::cpu::decode::{encode, Condition, Instruction};
use crate::cpu::registers::{PC, SP};
use crate::cpu::MEMORY_SIZE;
use crate::word::{sign_extend, Word, HALT_WORD};
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code to a list of words loaded from address 0.
pub fn assemble(source: &str) -> Result<Vec<Word>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// One instruction or data line after labels and comments are stripped.
struct SourceLine<'a> {
    addr: u16,
    line_num: usize,
    text: &'a str,
}

/// The assembler state.
struct Assembler<'a> {
    /// Address of the next emitted word.
    current_addr: usize,
    /// Symbol table (label -> address).
    symbols: HashMap<&'a str, u16>,
    /// Lines that emit a word, in address order.
    lines: Vec<SourceLine<'a>>,
}

impl<'a> Assembler<'a> {
    fn new() -> Self {
        Self {
            current_addr: 0,
            symbols: HashMap::new(),
            lines: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &'a str) -> Result<Vec<Word>, AssemblerError> {
        // Pass 1: Collect labels and assign addresses
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: Encode with every label known
        self.lines.iter().map(|line| self.encode_line(line)).collect()
    }

    fn process_line(&mut self, line: &'a str, line_num: usize) -> Result<(), AssemblerError> {
        let mut rest = strip_comment(line).trim();

        // Peel off `label:` prefixes
        while let Some((label, after)) = split_label(rest) {
            if self.symbols.insert(label, self.current_addr as u16).is_some() {
                return Err(AssemblerError::DuplicateLabel {
                    line: line_num,
                    label: label.to_string(),
                });
            }
            rest = after.trim_start();
        }

        if rest.is_empty() {
            return Ok(());
        }

        if self.current_addr >= MEMORY_SIZE {
            return Err(AssemblerError::ProgramTooLarge { line: line_num });
        }
        self.lines.push(SourceLine {
            addr: self.current_addr as u16,
            line_num,
            text: rest,
        });
        self.current_addr += 1;
        Ok(())
    }

    fn encode_line(&self, line: &SourceLine<'a>) -> Result<Word, AssemblerError> {
        let line_num = line.line_num;

        // A bare character literal is a data word
        if line.text.starts_with('\'') {
            return Ok(parse_char(line.text, line_num)? as Word);
        }

        let (mnemonic, operand_text) = match line.text.split_once(char::is_whitespace) {
            Some((m, rest)) => (m, rest),
            None => (line.text, ""),
        };
        let ops: Vec<&str> = operand_text
            .split(|c: char| c == ',' || c == '[' || c == ']' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();
        let mnemonic = mnemonic.to_uppercase();

        let instr = match mnemonic.as_str() {
            // Directives
            "HALT" | "HLT" => {
                expect_operands(&ops, 0, line_num)?;
                return Ok(HALT_WORD);
            }

            ".WORD" | "DAT" => {
                expect_operands(&ops, 1, line_num)?;
                let value = self.parse_value(ops[0], line_num)?;
                check_range(value, -0x8000, 0xFFFF, line_num)?;
                return Ok(value as Word);
            }

            // Control flow
            "JMP" => {
                expect_operands(&ops, 1, line_num)?;
                Instruction::Jmp {
                    offset: self.branch_offset(ops[0], line, 12)?,
                }
            }

            "JEQ" | "JNE" | "JLT" | "JGT" | "JGE" => {
                expect_operands(&ops, 1, line_num)?;
                let cond = match mnemonic.as_str() {
                    "JEQ" => Condition::Eq,
                    "JNE" => Condition::Ne,
                    "JLT" => Condition::Lt,
                    _ => Condition::Ge,
                };
                Instruction::Branch {
                    cond,
                    offset: self.branch_offset(ops[0], line, 10)?,
                }
            }

            // Data transfer; the offset inside the brackets may be omitted
            "LDR" | "STR" => {
                if ops.len() != 2 && ops.len() != 3 {
                    return Err(operand_count_error(3, ops.len(), line_num));
                }
                let reg = parse_register(ops[0], line_num)?;
                let rm = parse_register(ops[1], line_num)?;
                let imm = match ops.get(2) {
                    Some(op) => self.parse_imm4(op, line_num)?,
                    None => 0,
                };
                if mnemonic == "LDR" {
                    Instruction::Ldr { rd: reg, rm, imm }
                } else {
                    Instruction::Str { rn: reg, rm, imm }
                }
            }

            "MOV" => {
                expect_operands(&ops, 2, line_num)?;
                let rd = parse_register(ops[0], line_num)?;
                let value = self.parse_value(ops[1], line_num)?;
                check_range(value, -128, 255, line_num)?;
                Instruction::Mov {
                    rd,
                    imm: sign_extend(value as u16 & 0xFF, 8),
                }
            }

            // Register-register ALU
            "ADD" | "SUB" | "AND" | "OR" => {
                expect_operands(&ops, 3, line_num)?;
                let rd = parse_register(ops[0], line_num)?;
                let rm = parse_register(ops[1], line_num)?;
                let rn = parse_register(ops[2], line_num)?;
                match mnemonic.as_str() {
                    "ADD" => Instruction::Add { rd, rm, rn },
                    "SUB" => Instruction::Sub { rd, rm, rn },
                    "AND" => Instruction::And { rd, rm, rn },
                    _ => Instruction::Or { rd, rm, rn },
                }
            }

            // Register-immediate ALU
            "ADDI" | "SUBI" | "SHL" | "SHR" => {
                expect_operands(&ops, 3, line_num)?;
                let rd = parse_register(ops[0], line_num)?;
                let rm = parse_register(ops[1], line_num)?;
                let imm = self.parse_imm4(ops[2], line_num)?;
                match mnemonic.as_str() {
                    "ADDI" => Instruction::Addi { rd, rm, imm },
                    "SUBI" => Instruction::Subi { rd, rm, imm },
                    "SHL" => Instruction::Shl { rd, rm, imm },
                    _ => Instruction::Shr { rd, rm, imm },
                }
            }

            "CMP" => {
                expect_operands(&ops, 2, line_num)?;
                Instruction::Cmp {
                    rm: parse_register(ops[0], line_num)?,
                    rn: parse_register(ops[1], line_num)?,
                }
            }

            // Stack
            "PUSH" => {
                expect_operands(&ops, 1, line_num)?;
                Instruction::Push { rn: parse_register(ops[0], line_num)? }
            }

            "POP" => {
                expect_operands(&ops, 1, line_num)?;
                Instruction::Pop { rd: parse_register(ops[0], line_num)? }
            }

            _ => {
                return Err(AssemblerError::UnknownMnemonic {
                    line: line_num,
                    mnemonic: mnemonic.to_string(),
                })
            }
        };

        Ok(encode(&instr))
    }

    /// PC-relative offset from the instruction after `line` to `target`.
    fn branch_offset(
        &self,
        target: &str,
        line: &SourceLine<'a>,
        width: u32,
    ) -> Result<i16, AssemblerError> {
        let here = i32::from(line.addr);
        let target = match target.strip_prefix('.') {
            Some(delta) => here + parse_delta(delta, line.line_num)?,
            None => self.parse_value(target, line.line_num)?,
        };
        let offset = target - (here + 1);
        let limit = 1 << (width - 1);
        check_range(offset, -limit, limit - 1, line.line_num)?;
        Ok(offset as i16)
    }

    fn parse_imm4(&self, operand: &str, line_num: usize) -> Result<u8, AssemblerError> {
        let value = self.parse_value(operand, line_num)?;
        check_range(value, 0, 15, line_num)?;
        Ok(value as u8)
    }

    /// Parse a numeric operand: label, character literal, or number.
    fn parse_value(&self, operand: &str, line_num: usize) -> Result<i32, AssemblerError> {
        let operand = operand.trim_start_matches('#');

        if let Some(&addr) = self.symbols.get(operand) {
            return Ok(i32::from(addr));
        }

        if operand.starts_with('\'') {
            return parse_char(operand, line_num);
        }

        let (negative, digits) = match operand.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, operand),
        };

        let parsed = if let Some(hex) = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
        {
            i32::from_str_radix(hex, 16).ok()
        } else if let Some(bin) = digits
            .strip_prefix("0b")
            .or_else(|| digits.strip_prefix("0B"))
        {
            i32::from_str_radix(bin, 2).ok()
        } else {
            digits.parse::<i32>().ok()
        };

        match parsed {
            Some(value) => Ok(if negative { -value } else { value }),
            None if is_identifier(operand) => Err(AssemblerError::UndefinedLabel {
                line: line_num,
                label: operand.to_string(),
            }),
            None => Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("invalid number: {}", operand),
            }),
        }
    }
}

/// Parse the `+n` / `-n` after a `.` target; empty means zero.
fn parse_delta(delta: &str, line_num: usize) -> Result<i32, AssemblerError> {
    let parsed = match delta.as_bytes().first() {
        None => Some(0),
        Some(b'+') => delta[1..].parse::<i32>().ok(),
        Some(b'-') => delta[1..].parse::<i32>().ok().map(|n| -n),
        Some(_) => None,
    };
    parsed.ok_or_else(|| AssemblerError::SyntaxError {
        line: line_num,
        message: format!("invalid relative target: .{}", delta),
    })
}

/// Remove a trailing `;` or `//` comment. Both may appear inside a
/// character literal.
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut in_quote = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_quote => i += 1,
            b'\'' => in_quote = !in_quote,
            b';' if !in_quote => return &line[..i],
            b'/' if !in_quote && bytes.get(i + 1) == Some(&b'/') => return &line[..i],
            _ => {}
        }
        i += 1;
    }
    line
}

/// Split `label: rest` when the line starts with an identifier and a colon.
fn split_label(line: &str) -> Option<(&str, &str)> {
    let (label, rest) = line.split_once(':')?;
    let label = label.trim_end();
    is_identifier(label).then_some((label, rest))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn parse_register(operand: &str, line_num: usize) -> Result<u8, AssemblerError> {
    let upper = operand.to_uppercase();
    let index = match upper.as_str() {
        "SP" => Some(SP),
        "PC" => Some(PC),
        _ => upper
            .strip_prefix('R')
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|&n| n < 16),
    };
    index.ok_or_else(|| AssemblerError::InvalidRegister {
        line: line_num,
        register: operand.to_string(),
    })
}

/// Parse `'c'`, with `\0`, `\n`, `\t`, `\\` and `\'` escapes.
fn parse_char(literal: &str, line_num: usize) -> Result<i32, AssemblerError> {
    let invalid = || AssemblerError::SyntaxError {
        line: line_num,
        message: format!("invalid character literal: {}", literal),
    };

    let inner = literal
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .ok_or_else(invalid)?;

    let mut chars = inner.chars();
    let ch = match (chars.next(), chars.next(), chars.next()) {
        (Some('\\'), Some(esc), None) => match esc {
            '0' => '\0',
            'n' => '\n',
            't' => '\t',
            '\\' => '\\',
            '\'' => '\'',
            _ => return Err(invalid()),
        },
        (Some(c), None, None) => c,
        _ => return Err(invalid()),
    };

    if !ch.is_ascii() {
        return Err(invalid());
    }
    Ok(ch as i32)
}

fn expect_operands(ops: &[&str], expected: usize, line_num: usize) -> Result<(), AssemblerError> {
    if ops.len() == expected {
        Ok(())
    } else {
        Err(operand_count_error(expected, ops.len(), line_num))
    }
}

fn operand_count_error(expected: usize, found: usize, line_num: usize) -> AssemblerError {
    AssemblerError::SyntaxError {
        line: line_num,
        message: format!("expected {} operands, found {}", expected, found),
    }
}

fn check_range(value: i32, min: i32, max: i32, line_num: usize) -> Result<(), AssemblerError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(AssemblerError::ValueOutOfRange { line: line_num, value })
    }
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("label defined twice on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("invalid register on line {line}: {register}")]
    InvalidRegister { line: usize, register: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i32 },

    #[error("program does not fit in memory (line {line})")]
    ProgramTooLarge { line: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_simple() {
        let source = r#"
            ; Simple test program
            MOV R1, #10
            MOV R2, #5
            ADD R3, R1, R2
            HALT
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result, vec![0x10A4, 0x2054, 0x3125, 0xFFFF]);
    }

    #[test]
    fn test_assemble_with_labels() {
        let source = r#"
        start:
            MOV R0, #3
        loop: SUBI R0, R0, #1
            JNE loop
            JMP end
            OR R1, R1, R1
        end: HALT
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result.len(), 6);
        // JNE loop: offset 1 - 3 = -2
        assert_eq!(result[2], 0x7FE1);
        // JMP end: offset 5 - 4 = 1
        assert_eq!(result[3], 0x0010);
    }

    #[test]
    fn test_multiple_labels_on_one_line() {
        let result = assemble("a: b: HALT\nJMP b // back").unwrap();
        assert_eq!(result, vec![0xFFFF, 0xFFE0]);
    }

    #[test]
    fn test_memory_operands() {
        let result = assemble("LDR R1, [R2, #3]\nSTR R1, [R2, #4]\nLDR R5, [SP]").unwrap();
        assert_eq!(result[0], 0x1232);
        // STR keeps its offset in the rd position
        assert_eq!(result[1], 0x4213);
        assert_eq!(result[2], 0x5E02);
    }

    #[test]
    fn test_stack_and_compare() {
        let result = assemble("PUSH R3\nPOP PC\nCMP R1, R2").unwrap();
        assert_eq!(result, vec![0x003E, 0xF00F, 0x012D]);
    }

    #[test]
    fn test_conditions() {
        let result = assemble("x: JEQ x\nJNE x\nJLT x\nJGT x\nJGE x").unwrap();
        let conds: Vec<u16> = result.iter().map(|w| w >> 14).collect();
        assert_eq!(conds, vec![0, 1, 2, 3, 3]);
    }

    #[test]
    fn test_assemble_data() {
        let source = r#"
            'A'
            '\0'
            .word 0x1234
            DAT -1
            MOV R0, 'z'
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result, vec![0x41, 0, 0x1234, 0xFFFF, 0x07A4]);
    }

    #[test]
    fn test_comment_chars_in_literals() {
        let source = "';'\n'/' // slash\nMOV R0, ';' ; semicolon\n'\\'' ; quote";
        assert_eq!(assemble(source).unwrap(), vec![0x3B, 0x2F, 0x03B4, 0x27]);
    }

    #[test]
    fn test_relative_targets() {
        // Same words as `x: JEQ x` and a JMP to the following word
        let result = assemble("JEQ .\nJMP .+1\nJNE .-2").unwrap();
        assert_eq!(result, vec![0x3FF1, 0x0000, 0x7FD1]);
        assert!(matches!(
            assemble("JMP .x"),
            Err(AssemblerError::SyntaxError { line: 1, .. })
        ));
    }

    #[test]
    fn test_negative_mov() {
        assert_eq!(assemble("MOV R2, #-1").unwrap(), vec![0x2FF4]);
    }

    #[test]
    fn test_unknown_mnemonic() {
        let err = assemble("NOP").unwrap_err();
        assert_eq!(
            err,
            AssemblerError::UnknownMnemonic { line: 1, mnemonic: "NOP".into() }
        );
    }

    #[test]
    fn test_undefined_label() {
        let err = assemble("\nJMP nowhere").unwrap_err();
        assert_eq!(
            err,
            AssemblerError::UndefinedLabel { line: 2, label: "nowhere".into() }
        );
    }

    #[test]
    fn test_duplicate_label() {
        assert!(matches!(
            assemble("a: HALT\na: HALT"),
            Err(AssemblerError::DuplicateLabel { line: 2, .. })
        ));
    }

    #[test]
    fn test_invalid_register() {
        assert!(matches!(
            assemble("ADD R1, R2, R16"),
            Err(AssemblerError::InvalidRegister { line: 1, .. })
        ));
    }

    #[test]
    fn test_immediate_out_of_range() {
        assert_eq!(
            assemble("ADDI R1, R1, #16").unwrap_err(),
            AssemblerError::ValueOutOfRange { line: 1, value: 16 }
        );
        assert!(assemble("MOV R1, #256").is_err());
    }

    #[test]
    fn test_operand_count() {
        assert!(matches!(
            assemble("ADD R1, R2"),
            Err(AssemblerError::SyntaxError { line: 1, .. })
        ));
    }
}
