use proptest::prelude::*;
use risco::cpu::{encode, Instruction};
use risco::word::{self, sign_extend, Flags};
use risco::{Cpu, StreamConsole, HALT_WORD};
use std::io::Cursor;

fn silent_console() -> StreamConsole<Cursor<Vec<u8>>, Vec<u8>> {
    StreamConsole::from_reader(Cursor::new(Vec::new()), Vec::new())
}

proptest! {
    #[test]
    fn add_wraps_and_sets_flags(a in any::<u16>(), b in any::<u16>()) {
        let (result, flags) = word::add(a, b);
        let wide = u32::from(a) + u32::from(b);
        prop_assert_eq!(u32::from(result), wide % 0x1_0000);
        prop_assert_eq!(flags.zero, result == 0);
        prop_assert_eq!(flags.carry, wide > 0xFFFF);
    }

    #[test]
    fn subtract_wraps_and_borrows(a in any::<u16>(), b in any::<u16>()) {
        let (result, flags) = word::subtract(a, b);
        prop_assert_eq!(result, a.wrapping_sub(b));
        prop_assert_eq!(flags.zero, a == b);
        prop_assert_eq!(flags.carry, a < b);
    }

    #[test]
    fn logic_never_carries(a in any::<u16>(), b in any::<u16>()) {
        let (and, and_flags) = word::and(a, b);
        let (or, or_flags) = word::or(a, b);
        prop_assert_eq!(and, a & b);
        prop_assert_eq!(or, a | b);
        prop_assert!(!and_flags.carry && !or_flags.carry);
        prop_assert_eq!(and_flags.zero, and == 0);
    }

    #[test]
    fn shift_right_by_zero_is_identity(value in any::<u16>()) {
        let (result, flags) = word::shift_right(value, 0);
        prop_assert_eq!(result, value);
        prop_assert!(!flags.carry);
        prop_assert_eq!(flags.zero, value == 0);
    }

    #[test]
    fn shift_right_carries_last_bit_out(value in any::<u16>(), count in 1u8..16) {
        let (result, flags) = word::shift_right(value, count);
        prop_assert_eq!(result, value >> count);
        prop_assert_eq!(flags.carry, (value >> (count - 1)) & 1 == 1);
    }

    #[test]
    fn shift_left_carries_on_overflow(value in any::<u16>(), count in 0u8..16) {
        let (result, flags) = word::shift_left(value, count);
        let wide = u32::from(value) << count;
        prop_assert_eq!(u32::from(result), wide & 0xFFFF);
        prop_assert_eq!(flags.carry, wide > 0xFFFF);
    }

    #[test]
    fn compare_matches_unsigned_order(a in any::<u16>(), b in any::<u16>()) {
        let flags = Flags::compare(a, b);
        prop_assert_eq!(flags.zero, a == b);
        prop_assert_eq!(flags.carry, a < b);
    }

    #[test]
    fn sign_extend_preserves_low_bits(bits in 1u32..16, raw in any::<u16>()) {
        let mask = (1u16 << bits) - 1;
        let raw = raw & mask;
        let value = sign_extend(raw, bits);
        let limit = 1i32 << (bits - 1);
        prop_assert!((-limit..limit).contains(&i32::from(value)));
        prop_assert_eq!(value as u16 & mask, raw);
    }

    #[test]
    fn push_pop_round_trip(sp in 0x0001u16..=0x2000, value in any::<u16>()) {
        // Place the code in whichever half of memory the push cannot reach
        let start: u16 = if sp > 0x1000 { 0 } else { 0x1800 };
        let mut cpu = Cpu::new();
        cpu.mem.poke(start, encode(&Instruction::Push { rn: 1 }));
        cpu.mem.poke(start + 1, encode(&Instruction::Pop { rd: 2 }));
        cpu.mem.poke(start + 2, HALT_WORD);
        cpu.regs.set(15, start);
        cpu.regs.set_sp(sp);
        cpu.regs.set(1, value);

        let mut console = silent_console();
        for _ in 0..3 {
            cpu.step(&mut console).unwrap();
        }

        prop_assert_eq!(cpu.regs.get(2), value);
        prop_assert_eq!(cpu.regs.sp(), sp);
        prop_assert!(cpu.is_halted());
        // Stack traffic never shows up as a data access
        prop_assert_eq!(cpu.mem.accessed().count(), 0);
    }

    #[test]
    fn jump_is_relative_to_next_instruction(start in 0u16..0x1000, offset in -2048i16..2048) {
        let mut cpu = Cpu::new();
        cpu.mem.poke(start, encode(&Instruction::Jmp { offset }));
        cpu.regs.set(15, start);

        let mut console = silent_console();
        cpu.step(&mut console).unwrap();

        prop_assert_eq!(cpu.regs.pc(), start.wrapping_add(1).wrapping_add_signed(offset));
    }
}
