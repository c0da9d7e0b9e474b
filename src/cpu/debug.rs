//! Run loop and debugger hook.
//!
//! [`Cpu::run`] drives the machine until it halts, runs off the end of
//! memory, or exhausts an optional cycle budget. After every instruction
//! whose address is a breakpoint, and once when the machine halts, the full
//! machine state is written to the console as a [`StateDump`].

use crate::cpu::execute::{Cpu, CpuError, CpuState};
use crate::cpu::io::Console;
use crate::cpu::memory::Memory;
use crate::cpu::registers::SP_RESET;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Set of instruction addresses that trigger a state dump.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoints {
    addrs: BTreeSet<u16>,
}

impl Breakpoints {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a breakpoint. Addresses outside memory can never be fetched and
    /// are ignored; returns whether the address was added.
    pub fn insert(&mut self, addr: u32) -> bool {
        match u16::try_from(addr) {
            Ok(addr) if Memory::in_bounds(addr) => self.addrs.insert(addr),
            _ => false,
        }
    }

    pub fn contains(&self, addr: u16) -> bool {
        self.addrs.contains(&addr)
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.addrs.iter().copied()
    }
}

impl FromIterator<u32> for Breakpoints {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut breakpoints = Self::new();
        for addr in iter {
            breakpoints.insert(addr);
        }
        breakpoints
    }
}

impl Extend<u32> for Breakpoints {
    fn extend<I: IntoIterator<Item = u32>>(&mut self, iter: I) {
        for addr in iter {
            self.insert(addr);
        }
    }
}

/// Options for [`Cpu::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfig {
    /// Stop after this many instructions. `None` runs until halt.
    pub max_cycles: Option<u64>,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The halt word was fetched; the final state has been dumped.
    Halted,
    /// A fetch was attempted at this address past the end of memory.
    OutOfBounds(u16),
    /// The cycle budget ran out before the program halted.
    CycleLimit,
}

/// Result of [`Cpu::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub exit: Exit,
    /// Instructions executed during this run, the halt word included.
    pub cycles: u64,
}

impl Cpu {
    /// Run until halt, PC overrun, or the configured cycle limit.
    ///
    /// A PC overrun prints its diagnostic line and ends the run without a
    /// state dump; it is reported through [`Exit::OutOfBounds`], not as an
    /// error.
    pub fn run<C: Console + ?Sized>(
        &mut self,
        breakpoints: &Breakpoints,
        config: &RunConfig,
        console: &mut C,
    ) -> Result<RunSummary, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        let start_cycles = self.cycles;
        let summary = |cpu: &Cpu, exit| RunSummary {
            exit,
            cycles: cpu.cycles - start_cycles,
        };

        while self.state == CpuState::Running {
            if let Some(limit) = config.max_cycles {
                if self.cycles - start_cycles >= limit {
                    tracing::info!(limit, "cycle limit reached");
                    return Ok(summary(self, Exit::CycleLimit));
                }
            }

            let pc = self.regs.pc();
            match self.step(console) {
                Ok(_) => {}
                Err(err @ CpuError::PcOutOfBounds(addr)) => {
                    console.write_line(err.to_string().as_bytes())?;
                    return Ok(summary(self, Exit::OutOfBounds(addr)));
                }
                Err(err) => return Err(err),
            }

            if breakpoints.contains(pc) {
                tracing::debug!(pc = format_args!("{:#06x}", pc), "breakpoint hit");
                self.write_state(console)?;
            } else if self.is_halted() {
                self.write_state(console)?;
            }
        }

        Ok(summary(self, Exit::Halted))
    }

    /// Write the full machine state to the console.
    pub fn write_state<C: Console + ?Sized>(&self, console: &mut C) -> Result<(), CpuError> {
        for line in self.state_dump().to_string().lines() {
            console.write_line(line.as_bytes())?;
        }
        Ok(())
    }

    /// A printable view of the machine state.
    pub fn state_dump(&self) -> StateDump<'_> {
        StateDump { cpu: self }
    }
}

/// Printable machine state, as emitted at breakpoints and on halt.
///
/// ```text
/// R0 = 0x0000
/// ...
/// R15 = 0x0001
/// Z = 0
/// C = 0
/// [0x1FFF] = 0x0042    <- stack, top of memory down to SP
/// [0x0010] = 0x0007    <- accessed cells, ascending
/// ```
pub struct StateDump<'a> {
    cpu: &'a Cpu,
}

impl fmt::Display for StateDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let regs = &self.cpu.regs;
        let mem = &self.cpu.mem;

        for (i, value) in regs.r.iter().enumerate() {
            writeln!(f, "R{} = 0x{:04X}", i, value)?;
        }
        writeln!(f, "Z = {}", regs.flags.z_bit())?;
        writeln!(f, "C = {}", regs.flags.c_bit())?;

        // The literal condition is "SP moved", not "something was pushed".
        let sp = regs.sp();
        if sp != SP_RESET {
            for addr in (sp..SP_RESET).rev() {
                if let Some(value) = mem.peek(addr) {
                    writeln!(f, "[0x{:04X}] = 0x{:04X}", addr, value)?;
                }
            }
        }

        for (addr, value) in mem.accessed() {
            writeln!(f, "[0x{:04X}] = 0x{:04X}", addr, value)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::{encode, Instruction};
    use crate::cpu::io::StreamConsole;
    use crate::cpu::registers::PC;
    use crate::word::HALT_WORD;
    use std::io::Cursor;

    fn run(program: &[u16], breakpoints: &[u32], config: &RunConfig) -> (Cpu, RunSummary, String) {
        let mut cpu = Cpu::new();
        cpu.load_program(program).unwrap();
        let mut io = StreamConsole::from_reader(Cursor::new(Vec::new()), Vec::new());
        let bps: Breakpoints = breakpoints.iter().copied().collect();

        let summary = cpu.run(&bps, config, &mut io).unwrap();
        let out = String::from_utf8(io.into_output().unwrap()).unwrap();
        (cpu, summary, out)
    }

    fn dump_count(out: &str) -> usize {
        out.lines().filter(|l| l.starts_with("R0 = ")).count()
    }

    #[test]
    fn test_breakpoints_ignore_out_of_range() {
        let mut bps = Breakpoints::new();
        assert!(bps.insert(0x1FFF));
        assert!(!bps.insert(0x2000));
        assert!(!bps.insert(0x1_0000));
        assert_eq!(bps.iter().collect::<Vec<_>>(), vec![0x1FFF]);
    }

    #[test]
    fn test_halt_only_program() {
        let (_, summary, out) = run(&[HALT_WORD], &[], &RunConfig::default());

        assert_eq!(summary, RunSummary { exit: Exit::Halted, cycles: 1 });
        let expected: String = (0..16)
            .map(|i| match i {
                14 => "R14 = 0x2000\n".to_string(),
                15 => "R15 = 0x0001\n".to_string(),
                _ => format!("R{} = 0x0000\n", i),
            })
            .chain(["Z = 0\n".to_string(), "C = 0\n".to_string()])
            .collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_breakpoint_dumps_after_instruction() {
        let program = [
            encode(&Instruction::Mov { rd: 1, imm: 7 }),
            encode(&Instruction::Mov { rd: 2, imm: 9 }),
            HALT_WORD,
        ];
        let (_, _, out) = run(&program, &[0], &RunConfig::default());

        assert_eq!(dump_count(&out), 2);
        let first: Vec<&str> = out.lines().take(18).collect();
        assert_eq!(first[1], "R1 = 0x0007");
        assert_eq!(first[2], "R2 = 0x0000");
        assert_eq!(first[15], "R15 = 0x0001");
    }

    #[test]
    fn test_breakpoint_on_halt_dumps_once() {
        let (_, _, out) = run(&[HALT_WORD], &[0], &RunConfig::default());
        assert_eq!(dump_count(&out), 1);
    }

    #[test]
    fn test_breakpoint_in_loop_dumps_each_pass() {
        let program = [
            encode(&Instruction::Mov { rd: 0, imm: 3 }),
            encode(&Instruction::Subi { rd: 0, rm: 0, imm: 1 }),
            encode(&Instruction::Branch {
                cond: crate::cpu::decode::Condition::Ne,
                offset: -2,
            }),
            HALT_WORD,
        ];
        let (_, _, out) = run(&program, &[1], &RunConfig::default());
        // Three passes through the breakpoint plus the final dump
        assert_eq!(dump_count(&out), 4);
    }

    #[test]
    fn test_stack_and_accessed_dump() {
        let program = [
            encode(&Instruction::Mov { rd: 1, imm: 0x42 }),
            encode(&Instruction::Push { rn: 1 }),
            encode(&Instruction::Mov { rd: 2, imm: 0x30 }),
            encode(&Instruction::Str { rn: 1, rm: 2, imm: 0 }),
            HALT_WORD,
        ];
        let (_, _, out) = run(&program, &[], &RunConfig::default());

        let tail: Vec<&str> = out.lines().skip(18).collect();
        assert_eq!(tail, vec!["[0x1FFF] = 0x0042", "[0x0030] = 0x0042"]);
    }

    #[test]
    fn test_stack_dump_skips_addresses_above_memory() {
        let mut cpu = Cpu::new();
        cpu.regs.set_sp(0x2005);
        let dump = cpu.state_dump().to_string();
        assert!(!dump.contains('['));
    }

    #[test]
    fn test_stack_dump_follows_sp_not_pushes() {
        let mut cpu = Cpu::new();
        cpu.regs.set_sp(0x1FFE);
        let dump = cpu.state_dump().to_string();
        assert!(dump.contains("[0x1FFF] = 0x0000\n[0x1FFE] = 0x0000\n"));
    }

    #[test]
    fn test_out_of_bounds_has_no_dump() {
        // JMP -2 from address 0 wraps the PC to 0xFFFF
        let program = [encode(&Instruction::Jmp { offset: -2 })];
        let (_, summary, out) = run(&program, &[0], &RunConfig::default());

        assert_eq!(summary, RunSummary { exit: Exit::OutOfBounds(0xFFFF), cycles: 1 });
        // Breakpoint at 0 dumped once; the overrun itself does not dump
        assert_eq!(dump_count(&out), 1);
        assert!(out.contains("R15 = 0xFFFF\n"));
        assert!(out.ends_with("Program counter out of bounds: 0xFFFF!\n"));
    }

    #[test]
    fn test_fetch_at_memory_size() {
        let mut cpu = Cpu::new();
        cpu.regs.set(PC, 0x2000);
        let mut io = StreamConsole::from_reader(Cursor::new(Vec::new()), Vec::new());

        let summary = cpu.run(&Breakpoints::new(), &RunConfig::default(), &mut io).unwrap();

        assert_eq!(summary, RunSummary { exit: Exit::OutOfBounds(0x2000), cycles: 0 });
        let out = String::from_utf8(io.into_output().unwrap()).unwrap();
        assert_eq!(out, "Program counter out of bounds: 0x2000!\n");
    }

    #[test]
    fn test_cycle_limit() {
        // JMP -1 forever: PC 0 -> 0
        let program = [encode(&Instruction::Jmp { offset: -1 })];
        let config = RunConfig { max_cycles: Some(10) };
        let (cpu, summary, out) = run(&program, &[], &config);

        assert_eq!(summary, RunSummary { exit: Exit::CycleLimit, cycles: 10 });
        assert!(cpu.is_running());
        assert_eq!(out, "");
    }
}
