//! Status flags.
//!
//! Every arithmetic, logical, shift and compare instruction recomputes both
//! flags; nothing else touches them.

use serde::{Deserialize, Serialize};

/// The Risc-O status flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flags {
    /// Z: the last result was zero (or the compared values were equal).
    pub zero: bool,
    /// C: carry out of bit 15, unsigned borrow, or bits lost by a shift.
    pub carry: bool,
}

impl Flags {
    /// Flags for a result value with an explicit carry.
    #[inline]
    pub fn from_result(result: u16, carry: bool) -> Self {
        Self {
            zero: result == 0,
            carry,
        }
    }

    /// Flags produced by comparing `a` against `b` as unsigned values.
    pub fn compare(a: u16, b: u16) -> Self {
        Self {
            zero: a == b,
            carry: a < b,
        }
    }

    /// Z as the 0/1 digit used in state dumps.
    #[inline]
    pub fn z_bit(&self) -> u8 {
        u8::from(self.zero)
    }

    /// C as the 0/1 digit used in state dumps.
    #[inline]
    pub fn c_bit(&self) -> u8 {
        u8::from(self.carry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_result() {
        assert_eq!(Flags::from_result(0, false), Flags { zero: true, carry: false });
        assert_eq!(Flags::from_result(0, true), Flags { zero: true, carry: true });
        assert_eq!(Flags::from_result(7, false), Flags::default());
    }

    #[test]
    fn test_compare() {
        assert_eq!(Flags::compare(5, 5), Flags { zero: true, carry: false });
        assert_eq!(Flags::compare(1, 5), Flags { zero: false, carry: true });
        assert_eq!(Flags::compare(5, 1), Flags { zero: false, carry: false });
        // Unsigned: 0xFFFF is the largest value, not -1
        assert_eq!(Flags::compare(0xFFFF, 0), Flags { zero: false, carry: false });
    }

    #[test]
    fn test_dump_bits() {
        let flags = Flags { zero: true, carry: false };
        assert_eq!(flags.z_bit(), 1);
        assert_eq!(flags.c_bit(), 0);
    }
}
