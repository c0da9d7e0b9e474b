//! Instruction field extraction.
//!
//! An instruction word keeps its opcode in the low nibble. The remaining
//! twelve bits are handed to the executor in place (the operand field, with
//! the opcode bits zeroed), so every field below is read relative to the
//! in-word bit positions:
//!
//! ```text
//!  15      12 11       8 7        4 3        0
//! +----------+----------+----------+----------+
//! |    rd    |    rm    |    rn    |  opcode  |
//! +----------+----------+----------+----------+
//! ```
//!
//! Immediates start at bit 4 and are 4, 8, 10 or 12 bits wide.

/// Extract the 4-bit opcode.
#[inline]
pub const fn opcode(word: u16) -> u8 {
    (word & 0x000F) as u8
}

/// Extract the operand field: the word with its opcode bits cleared.
#[inline]
pub const fn operand(word: u16) -> u16 {
    word & 0xFFF0
}

/// Register field at bits 15..12.
#[inline]
pub const fn rd(ibr: u16) -> u8 {
    ((ibr >> 12) & 0xF) as u8
}

/// Register field at bits 11..8.
#[inline]
pub const fn rm(ibr: u16) -> u8 {
    ((ibr >> 8) & 0xF) as u8
}

/// Register field at bits 7..4.
#[inline]
pub const fn rn(ibr: u16) -> u8 {
    ((ibr >> 4) & 0xF) as u8
}

/// Unsigned 4-bit immediate at bits 7..4.
#[inline]
pub const fn imm4(ibr: u16) -> u8 {
    rn(ibr)
}

/// Signed 8-bit immediate at bits 11..4.
#[inline]
pub const fn simm8(ibr: u16) -> i16 {
    sign_extend((ibr >> 4) & 0x00FF, 8)
}

/// Signed 10-bit branch offset at bits 13..4.
#[inline]
pub const fn offset10(ibr: u16) -> i16 {
    sign_extend((ibr >> 4) & 0x03FF, 10)
}

/// Signed 12-bit jump offset at bits 15..4.
#[inline]
pub const fn offset12(ibr: u16) -> i16 {
    sign_extend((ibr >> 4) & 0x0FFF, 12)
}

/// Branch condition code at bits 15..14.
#[inline]
pub const fn condition(word: u16) -> u8 {
    ((word >> 14) & 0x3) as u8
}

/// Sign-extend the low `bits` bits of `raw` to a full `i16`.
///
/// `bits` must be in `1..=16`.
#[inline]
pub const fn sign_extend(raw: u16, bits: u32) -> i16 {
    let shift = 16 - bits;
    ((raw << shift) as i16) >> shift
}

/// Place a register index into the field at `shift`.
#[inline]
pub const fn place(value: u16, width: u32, shift: u32) -> u16 {
    (value & ((1 << width) - 1)) << shift
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_and_operand() {
        assert_eq!(opcode(0x1235), 0x5);
        assert_eq!(operand(0x1235), 0x1230);
        assert_eq!(opcode(0xFFFF), 0xF);
    }

    #[test]
    fn test_register_fields() {
        let ibr = operand(0xABC5);
        assert_eq!(rd(ibr), 0xA);
        assert_eq!(rm(ibr), 0xB);
        assert_eq!(rn(ibr), 0xC);
        assert_eq!(imm4(ibr), 0xC);
    }

    #[test]
    fn test_simm8() {
        assert_eq!(simm8(0x07F0), 127);
        assert_eq!(simm8(0x0800), -128);
        assert_eq!(simm8(0x0FF0), -1);
        // rd bits above the field are ignored
        assert_eq!(simm8(0xF050), 5);
    }

    #[test]
    fn test_offset10() {
        assert_eq!(offset10(0x1FF0), 511);
        assert_eq!(offset10(0x2000), -512);
        assert_eq!(offset10(0x3FF0), -1);
        // The condition bits are not part of the offset
        assert_eq!(offset10(0xC010), 1);
    }

    #[test]
    fn test_offset12() {
        assert_eq!(offset12(0x7FF0), 2047);
        assert_eq!(offset12(0x8000), -2048);
        assert_eq!(offset12(0xFFF0), -1);
    }

    #[test]
    fn test_condition() {
        assert_eq!(condition(0x0001), 0);
        assert_eq!(condition(0x4001), 1);
        assert_eq!(condition(0x8001), 2);
        assert_eq!(condition(0xC001), 3);
    }

    #[test]
    fn test_sign_extend_full_width() {
        assert_eq!(sign_extend(0xFFFF, 16), -1);
        assert_eq!(sign_extend(0x0008, 4), -8);
        assert_eq!(sign_extend(0x0007, 4), 7);
    }

    #[test]
    fn test_place() {
        assert_eq!(place(0xA, 4, 12), 0xA000);
        assert_eq!(place(0x1FF, 4, 4), 0x00F0);
    }
}
