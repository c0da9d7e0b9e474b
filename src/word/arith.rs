//! Arithmetic and logic on 16-bit words.
//!
//! Every operation returns the wrapped result together with the flags it
//! produces, so the executor only has to store both.

use crate::word::{Flags, Word};

/// Add two words. C is the carry out of bit 15.
pub fn add(a: Word, b: Word) -> (Word, Flags) {
    let (result, carry) = a.overflowing_add(b);
    (result, Flags::from_result(result, carry))
}

/// Subtract `b` from `a`. C is set on unsigned borrow (`a < b`).
pub fn subtract(a: Word, b: Word) -> (Word, Flags) {
    let (result, borrow) = a.overflowing_sub(b);
    (result, Flags::from_result(result, borrow))
}

/// Bitwise AND. C is always cleared.
pub fn and(a: Word, b: Word) -> (Word, Flags) {
    let result = a & b;
    (result, Flags::from_result(result, false))
}

/// Bitwise OR. C is always cleared.
pub fn or(a: Word, b: Word) -> (Word, Flags) {
    let result = a | b;
    (result, Flags::from_result(result, false))
}

/// Logical shift right by `count` (0..=15).
///
/// C receives the last bit shifted out; a zero count leaves the value alone
/// and clears C.
pub fn shift_right(value: Word, count: u8) -> (Word, Flags) {
    let count = u32::from(count & 0xF);
    if count == 0 {
        return (value, Flags::from_result(value, false));
    }
    let result = value >> count;
    let carry = (value >> (count - 1)) & 1 == 1;
    (result, Flags::from_result(result, carry))
}

/// Logical shift left by `count` (0..=15).
///
/// C is set when any bit shifted past bit 15 was a one.
pub fn shift_left(value: Word, count: u8) -> (Word, Flags) {
    let wide = u32::from(value) << u32::from(count & 0xF);
    let result = wide as Word;
    (result, Flags::from_result(result, wide > 0xFFFF))
}
