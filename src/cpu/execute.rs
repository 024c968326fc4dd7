//! CPU execution engine.
//!
//! Implements the fetch-decode-execute cycle, the stack, and every
//! instruction behavior including the extended group.

use crate::cpu::alu;
use crate::cpu::decode::{self, DecodeError, ExtOp, InputMode, Instruction, OutputMode};
use crate::cpu::dump::StateDump;
use crate::cpu::io::{Console, StdConsole};
use crate::cpu::memory::{wrap, Memory, MemoryError};
use crate::cpu::registers::{Flags, Register, Registers};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is fetching and executing.
    Running,
    /// CPU has stopped; only a reset brings it back.
    Halted,
}

/// Why the CPU stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// A HALT instruction fetched from `addr`.
    Halted { addr: u32 },
    /// An undecodable word fetched from `addr`.
    Fault { addr: u32, error: DecodeError },
}

impl std::fmt::Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HaltReason::Halted { addr } => write!(f, "CPU Stopped at PC: 0x{:05X}", addr),
            HaltReason::Fault { addr, error } => write!(f, "{} at PC=0x{:05X}", error, addr),
        }
    }
}

/// The CPU: registers, memory and the console the I/O instructions use.
pub struct Cpu<C = StdConsole> {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Console behind STDOUT/STDIN.
    pub console: C,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count.
    pub cycles: u64,
    last_instr: Option<Instruction>,
    halt_reason: Option<HaltReason>,
}

impl Cpu<StdConsole> {
    /// Create a CPU wired to the process stdin and stdout.
    pub fn new() -> Result<Self, MemoryError> {
        Self::with_console(StdConsole::stdio())
    }
}

impl<C: Console> Cpu<C> {
    /// Create a CPU in the reset state using the given console.
    pub fn with_console(console: C) -> Result<Self, MemoryError> {
        Ok(Self {
            regs: Registers::new(),
            mem: Memory::new()?,
            console,
            state: CpuState::Running,
            cycles: 0,
            last_instr: None,
            halt_reason: None,
        })
    }

    /// Reset registers, memory and execution state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_instr = None;
        self.halt_reason = None;
        tracing::debug!("cpu reset");
    }

    /// Copy a program image into memory at `origin`.
    pub fn load_program(&mut self, origin: u32, program: &[u8]) {
        self.mem.load(origin, program);
        tracing::debug!(origin = wrap(origin), len = program.len(), "program loaded");
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed. An undecodable word
    /// halts the CPU and is reported as [`CpuError::Decode`].
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        // Fetch
        let addr = self.regs.advance_pc(2);
        let word = self.mem.read_word(addr);

        // Decode
        let instr = match decode::decode(word) {
            Ok(instr) => instr,
            Err(error) => {
                tracing::warn!("{} at PC=0x{:05X} (word 0x{:04X})", error, addr, word);
                self.halt(HaltReason::Fault { addr, error });
                return Err(CpuError::Decode { addr, source: error });
            }
        };
        tracing::trace!(pc = addr, word, ?instr, "execute");

        // Execute
        self.execute(addr, instr)?;

        self.cycles += 1;
        self.last_instr = Some(instr);

        Ok(instr)
    }

    /// Run until halt or error.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_cycles);

        while self.state == CpuState::Running && self.cycles < limit {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    fn halt(&mut self, reason: HaltReason) {
        self.state = CpuState::Halted;
        self.halt_reason = Some(reason);
    }

    /// Execute a decoded instruction fetched from `addr`.
    fn execute(&mut self, addr: u32, instr: Instruction) -> Result<(), CpuError> {
        match instr {
            Instruction::Halt => {
                tracing::info!("CPU Stopped at PC: 0x{:05X}", addr);
                self.halt(HaltReason::Halted { addr });
            }

            Instruction::Nop => {}

            Instruction::Mov { dst, src } => {
                let value = self.regs.get(src);
                self.regs.set_with_flags(dst, value);
            }

            Instruction::Movi { dst, imm } => {
                self.regs.set_with_flags(dst, decode::sign_extend_9(imm));
            }

            Instruction::Cmp { dst, src } => {
                let result = alu::sub(self.regs.get(dst), self.regs.get(src));
                self.regs.flags.set(Flags::CARRY, result.carry);
                self.regs.flags.update_zero_sign(result.value);
            }

            Instruction::Jmp { target } => self.jump_to(target),

            Instruction::Jz { target } => {
                if self.regs.flags.zero() {
                    self.jump_to(target);
                }
            }

            Instruction::Jnz { target } => {
                if !self.regs.flags.zero() {
                    self.jump_to(target);
                }
            }

            Instruction::Push { src } => {
                let value = self.regs.get(src);
                self.push_word(value);
            }

            Instruction::Pop { dst } => {
                let value = self.pop_word();
                self.regs.set_with_flags(dst, value);
            }

            Instruction::Call { target } => {
                let ret = self.regs.pc;
                self.push_word(ret as u16);
                self.push_word(((ret >> 16) & 0xF) as u16);
                self.jump_to(target);
            }

            Instruction::Stdout { mode, reg } => self.stdout(mode, reg)?,

            Instruction::Stdin { mode, reg } => self.stdin(mode, reg)?,

            Instruction::Ext { op, reg1, reg2 } => self.execute_ext(op, reg1, reg2),
        }

        Ok(())
    }

    /// Extended group. Operands always come from bits 6-8 (`reg1`) and 3-5 (`reg2`).
    fn execute_ext(&mut self, op: ExtOp, reg1: Register, reg2: Register) {
        let a = self.regs.get(reg1);
        let b = self.regs.get(reg2);

        match op {
            ExtOp::Ret => {
                let high = (self.pop_word() & 0xF) as u32;
                let low = self.pop_word() as u32;
                self.regs.jump((high << 16) | low);
            }

            ExtOp::Load => {
                let value = self.mem.read_word(b as u32);
                self.regs.set_with_flags(reg1, value);
            }

            ExtOp::Store => self.mem.write_word(a as u32, b),

            ExtOp::Add | ExtOp::Sub => {
                let result = if op == ExtOp::Add { alu::add(a, b) } else { alu::sub(a, b) };
                self.regs.flags.set(Flags::CARRY, result.carry);
                self.regs.flags.set(Flags::OVERFLOW, result.overflow);
                self.regs.set_with_flags(reg1, result.value);
            }

            ExtOp::And => self.regs.set_with_flags(reg1, a & b),
            ExtOp::Or => self.regs.set_with_flags(reg1, a | b),
            ExtOp::Xor => self.regs.set_with_flags(reg1, a ^ b),
        }
    }

    fn stdout(&mut self, mode: OutputMode, reg: Register) -> Result<(), CpuError> {
        let value = self.regs.get(reg);

        let bytes = match mode {
            OutputMode::InlineString => {
                let text = self.mem.read_cstring(self.regs.pc);
                self.regs.advance_pc(text.len() as u32 + 1);
                if self.regs.pc & 1 != 0 {
                    self.regs.advance_pc(1);
                }
                text
            }
            OutputMode::Number => (value as i16).to_string().into_bytes(),
            OutputMode::StringAt => self.mem.read_cstring(value as u32),
            OutputMode::Char => vec![value as u8],
            OutputMode::Reserved(_) => return Ok(()),
        };

        self.console.write(&bytes).map_err(CpuError::io)
    }

    fn stdin(&mut self, mode: InputMode, reg: Register) -> Result<(), CpuError> {
        match mode {
            InputMode::Line => {
                let buffer = self.regs.get(reg) as u32;
                if let Some(line) = self.console.read_line().map_err(CpuError::io)? {
                    self.mem.write_cstring(buffer, &line);
                }
            }
            InputMode::Number => match self.console.read_number().map_err(CpuError::io)? {
                Some(value) => self.regs.set_with_flags(reg, value as u16),
                None => tracing::debug!("malformed numeric input ignored"),
            },
        }
        Ok(())
    }

    fn jump_to(&mut self, target: Register) {
        let addr = self.regs.get(target) as u32;
        self.regs.jump(addr);
    }

    /// Push a word: SP moves down by two, then the word is written.
    pub fn push_word(&mut self, value: u16) {
        self.regs.sp = wrap(self.regs.sp.wrapping_sub(2));
        self.mem.write_word(self.regs.sp, value);
    }

    /// Pop a word: read at SP, then SP moves up by two.
    pub fn pop_word(&mut self) -> u16 {
        let value = self.mem.read_word(self.regs.sp);
        self.regs.sp = wrap(self.regs.sp.wrapping_add(2));
        value
    }

    /// Snapshot of PC, SP, flags and registers.
    pub fn dump(&self) -> StateDump {
        StateDump::capture(&self.regs, self.is_halted(), self.cycles)
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Why the CPU stopped, if it has.
    pub fn halt_reason(&self) -> Option<HaltReason> {
        self.halt_reason
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

impl<C> std::fmt::Debug for Cpu<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("{source} at PC=0x{addr:05X}")]
    Decode { addr: u32, source: DecodeError },

    #[error("console I/O error: {0}")]
    Io(String),
}

impl CpuError {
    fn io(err: std::io::Error) -> Self {
        CpuError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::encode;
    use crate::cpu::io::BufferConsole;
    use crate::cpu::registers::Register::*;

    fn make_cpu(input: &str) -> Cpu<BufferConsole> {
        Cpu::with_console(BufferConsole::with_input(input)).unwrap()
    }

    fn load(cpu: &mut Cpu<BufferConsole>, origin: u32, instructions: &[Instruction]) {
        for (i, instr) in instructions.iter().enumerate() {
            cpu.mem.write_word(origin + 2 * i as u32, encode(instr));
        }
    }

    fn movi(dst: Register, imm: i16) -> Instruction {
        Instruction::Movi { dst, imm: imm as u16 & 0x1FF }
    }

    fn ext(op: ExtOp, reg1: Register, reg2: Register) -> Instruction {
        Instruction::Ext { op, reg1, reg2 }
    }

    #[test]
    fn test_cpu_halt() {
        let mut cpu = make_cpu("");
        load(&mut cpu, 0, &[Instruction::Halt]);

        let executed = cpu.run().unwrap();

        assert_eq!(executed, 1);
        assert!(cpu.is_halted());
        assert_eq!(cpu.halt_reason(), Some(HaltReason::Halted { addr: 0 }));
        assert_eq!(cpu.step(), Err(CpuError::NotRunning(CpuState::Halted)));
    }

    #[test]
    fn test_cpu_nop_then_halt() {
        let mut cpu = make_cpu("");
        load(&mut cpu, 0, &[Instruction::Nop, Instruction::Nop, Instruction::Halt]);

        assert_eq!(cpu.run().unwrap(), 3);
        assert_eq!(cpu.regs.pc, 6);
        assert_eq!(cpu.regs.flags.bits(), 0);
    }

    #[test]
    fn test_movi_sign_extension() {
        let mut cpu = make_cpu("");
        load(
            &mut cpu,
            0,
            &[
                Instruction::Movi { dst: R0, imm: 0x1FF },
                Instruction::Movi { dst: R1, imm: 0x0FF },
                Instruction::Halt,
            ],
        );

        cpu.step().unwrap();
        assert_eq!(cpu.regs.get(R0), 0xFFFF);
        assert!(cpu.regs.flags.sign());

        cpu.step().unwrap();
        assert_eq!(cpu.regs.get(R1), 0x00FF);
        assert!(!cpu.regs.flags.sign());
        assert!(!cpu.regs.flags.zero());
    }

    #[test]
    fn test_add_end_to_end() {
        let mut cpu = make_cpu("");
        load(
            &mut cpu,
            0,
            &[movi(R0, 5), movi(R1, 10), ext(ExtOp::Add, R0, R1), Instruction::Halt],
        );

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(R0), 15);
        assert!(!cpu.regs.flags.zero());
        assert!(!cpu.regs.flags.sign());
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_add_signed_overflow() {
        let mut cpu = make_cpu("");
        cpu.regs.set(R2, 0x7FFF);
        cpu.regs.set(R3, 0x7FFF);
        load(&mut cpu, 0, &[ext(ExtOp::Add, R2, R3), Instruction::Halt]);

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(R2), 0xFFFE);
        assert!(cpu.regs.flags.overflow());
        // The unsigned sum 0xFFFE fits in 16 bits.
        assert!(!cpu.regs.flags.carry());
        assert!(cpu.regs.flags.sign());
    }

    #[test]
    fn test_sub_borrow() {
        let mut cpu = make_cpu("");
        load(
            &mut cpu,
            0,
            &[movi(R4, 5), movi(R5, 10), ext(ExtOp::Sub, R4, R5), Instruction::Halt],
        );

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(R4), 0xFFFB);
        assert!(cpu.regs.flags.carry());
        assert!(!cpu.regs.flags.overflow());
        assert!(cpu.regs.flags.sign());
        assert_eq!(cpu.regs.get(R5), 10);
    }

    #[test]
    fn test_counted_loop() {
        let mut cpu = make_cpu("");
        load(
            &mut cpu,
            0,
            &[
                movi(R0, 5),                // 0: counter
                movi(R1, 1),                // 2: step
                movi(R2, 8),                // 4: loop address
                movi(R3, 0),                // 6: iterations
                ext(ExtOp::Add, R3, R1),    // 8: loop
                ext(ExtOp::Sub, R0, R1),    // 10
                Instruction::Jnz { target: R2 }, // 12
                Instruction::Halt,          // 14
            ],
        );

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(R0), 0);
        assert_eq!(cpu.regs.get(R3), 5);
        assert!(cpu.regs.flags.zero());
        assert_eq!(cpu.halt_reason(), Some(HaltReason::Halted { addr: 14 }));
    }

    #[test]
    fn test_cmp_sets_flags_without_storing() {
        let mut cpu = make_cpu("");
        load(
            &mut cpu,
            0,
            &[
                movi(R0, 3),
                movi(R1, 7),
                Instruction::Cmp { dst: R0, src: R1 },
                Instruction::Halt,
            ],
        );
        cpu.run().unwrap();
        assert_eq!(cpu.regs.get(R0), 3);
        assert!(cpu.regs.flags.carry());
        assert!(cpu.regs.flags.sign());
        assert!(!cpu.regs.flags.zero());

        let mut cpu = make_cpu("");
        load(
            &mut cpu,
            0,
            &[movi(R0, 9), movi(R1, 9), Instruction::Cmp { dst: R0, src: R1 }, Instruction::Halt],
        );
        cpu.run().unwrap();
        assert!(cpu.regs.flags.zero());
        assert!(!cpu.regs.flags.carry());
    }

    #[test]
    fn test_conditional_jumps() {
        let mut cpu = make_cpu("");
        load(
            &mut cpu,
            0,
            &[
                movi(R7, 10),                  // 0
                movi(R0, 0),                   // 2: sets Z
                Instruction::Jz { target: R7 }, // 4: taken
                movi(R1, 1),                   // 6: skipped
                Instruction::Halt,             // 8: skipped
                Instruction::Jnz { target: R7 }, // 10: not taken (Z still set)
                movi(R2, 2),                   // 12
                Instruction::Halt,             // 14
            ],
        );

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(R1), 0);
        assert_eq!(cpu.regs.get(R2), 2);
        assert_eq!(cpu.cycles, 6);
    }

    #[test]
    fn test_jmp() {
        let mut cpu = make_cpu("");
        cpu.regs.set(R3, 0x40);
        load(&mut cpu, 0, &[Instruction::Jmp { target: R3 }]);
        load(&mut cpu, 0x40, &[Instruction::Halt]);

        assert_eq!(cpu.run().unwrap(), 2);
        assert_eq!(cpu.halt_reason(), Some(HaltReason::Halted { addr: 0x40 }));
    }

    #[test]
    fn test_push_pop_roundtrip() {
        let mut cpu = make_cpu("");
        cpu.regs.set(R1, 0x8123);
        load(
            &mut cpu,
            0,
            &[Instruction::Push { src: R1 }, Instruction::Pop { dst: R6 }, Instruction::Halt],
        );

        cpu.step().unwrap();
        assert_eq!(cpu.regs.sp, 0xF_FFFC);
        assert_eq!(cpu.mem.read_word(0xF_FFFC), 0x8123);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.get(R6), 0x8123);
        assert_eq!(cpu.regs.sp, 0xF_FFFE);
        assert!(cpu.regs.flags.sign());
    }

    #[test]
    fn test_stack_wraps_at_bottom() {
        let mut cpu = make_cpu("");
        cpu.regs.sp = 0;
        cpu.push_word(0xABCD);
        assert_eq!(cpu.regs.sp, 0xF_FFFE);
        assert_eq!(cpu.pop_word(), 0xABCD);
        assert_eq!(cpu.regs.sp, 0);
    }

    #[test]
    fn test_call_ret() {
        let mut cpu = make_cpu("");
        cpu.regs.set(R1, 0x100);
        load(&mut cpu, 0, &[Instruction::Call { target: R1 }, Instruction::Halt]);
        load(&mut cpu, 0x100, &[movi(R0, 42), ext(ExtOp::Ret, R0, R0)]);

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(R0), 42);
        assert_eq!(cpu.regs.sp, 0xF_FFFE);
        assert_eq!(cpu.halt_reason(), Some(HaltReason::Halted { addr: 2 }));
    }

    #[test]
    fn test_call_ret_high_address() {
        let mut cpu = make_cpu("");
        cpu.regs.pc = 0xF_FFF0;
        cpu.regs.set(R1, 0x200);
        load(&mut cpu, 0xF_FFF0, &[Instruction::Call { target: R1 }]);
        load(&mut cpu, 0x200, &[ext(ExtOp::Ret, R0, R0)]);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x200);
        // Low word pushed first, then the high nibble.
        assert_eq!(cpu.mem.read_word(cpu.regs.sp), 0xF);
        assert_eq!(cpu.mem.read_word(cpu.regs.sp + 2), 0xFFF2);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0xF_FFF2);
        assert_eq!(cpu.regs.sp, 0xF_FFFE);
    }

    #[test]
    fn test_call_at_top_returns_to_zero() {
        let mut cpu = make_cpu("");
        cpu.regs.pc = 0xF_FFFE;
        cpu.regs.set(R1, 0x200);
        load(&mut cpu, 0xF_FFFE, &[Instruction::Call { target: R1 }]);
        load(&mut cpu, 0x200, &[ext(ExtOp::Ret, R0, R0)]);

        cpu.step().unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0);
    }

    #[test]
    fn test_load_store() {
        let mut cpu = make_cpu("");
        cpu.regs.set(R0, 0x3000);
        cpu.regs.set(R1, 0x8765);
        load(
            &mut cpu,
            0,
            &[ext(ExtOp::Store, R0, R1), ext(ExtOp::Load, R2, R0), Instruction::Halt],
        );

        cpu.run().unwrap();

        assert_eq!(cpu.mem.read_word(0x3000), 0x8765);
        assert_eq!(cpu.regs.get(R2), 0x8765);
        assert!(cpu.regs.flags.sign());
    }

    #[test]
    fn test_logic_ops_keep_carry_and_overflow() {
        let mut cpu = make_cpu("");
        cpu.regs.set(R0, 0b1100);
        cpu.regs.set(R1, 0b1010);
        cpu.regs.set(R2, 0b1100);
        cpu.regs.set(R3, 0b1100);
        cpu.regs.flags.set(Flags::CARRY, true);
        cpu.regs.flags.set(Flags::OVERFLOW, true);
        load(
            &mut cpu,
            0,
            &[
                ext(ExtOp::And, R0, R1),
                ext(ExtOp::Or, R2, R1),
                ext(ExtOp::Xor, R3, R3),
                Instruction::Halt,
            ],
        );

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(R0), 0b1000);
        assert_eq!(cpu.regs.get(R2), 0b1110);
        assert_eq!(cpu.regs.get(R3), 0);
        assert!(cpu.regs.flags.zero());
        assert!(cpu.regs.flags.carry());
        assert!(cpu.regs.flags.overflow());
    }

    #[test]
    fn test_mov_updates_flags() {
        let mut cpu = make_cpu("");
        cpu.regs.set(R1, 0);
        cpu.regs.set(R0, 7);
        load(&mut cpu, 0, &[Instruction::Mov { dst: R0, src: R1 }, Instruction::Halt]);
        cpu.run().unwrap();
        assert_eq!(cpu.regs.get(R0), 0);
        assert!(cpu.regs.flags.zero());
    }

    #[test]
    fn test_unknown_opcode_halts() {
        let mut cpu = make_cpu("");
        load(&mut cpu, 0, &[Instruction::Nop, Instruction::Nop]);
        cpu.mem.write_word(4, 0xE000);

        let err = cpu.run().unwrap_err();

        assert_eq!(
            err,
            CpuError::Decode { addr: 4, source: DecodeError::InvalidOpcode(0xE) }
        );
        assert_eq!(err.to_string(), "unknown opcode: 0xE at PC=0x00004");
        assert!(cpu.is_halted());
        assert_eq!(cpu.cycles, 2);
        assert!(matches!(cpu.halt_reason(), Some(HaltReason::Fault { addr: 4, .. })));
    }

    #[test]
    fn test_fetch_wraps_at_top() {
        let mut cpu = make_cpu("");
        cpu.regs.pc = 0xF_FFFE;
        load(&mut cpu, 0xF_FFFE, &[Instruction::Nop]);
        load(&mut cpu, 0, &[Instruction::Halt]);

        assert_eq!(cpu.run().unwrap(), 2);
        assert_eq!(cpu.halt_reason(), Some(HaltReason::Halted { addr: 0 }));
    }

    #[test]
    fn test_stdout_inline_string_wraps_at_top() {
        let mut cpu = make_cpu("");
        cpu.regs.pc = 0xF_FFFC;
        load(
            &mut cpu,
            0xF_FFFC,
            &[Instruction::Stdout { mode: OutputMode::InlineString, reg: R0 }],
        );
        cpu.mem.write_cstring(0xF_FFFE, b"abc");
        load(&mut cpu, 2, &[Instruction::Halt]);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 2);
        assert_eq!(cpu.console.output_string(), "abc");

        cpu.run().unwrap();
        assert_eq!(cpu.halt_reason(), Some(HaltReason::Halted { addr: 2 }));
    }

    #[test]
    fn test_stdout_inline_string_aligns_pc() {
        let mut cpu = make_cpu("");
        load(
            &mut cpu,
            0,
            &[Instruction::Stdout { mode: OutputMode::InlineString, reg: R0 }],
        );
        cpu.mem.write_cstring(2, b"Hi");
        load(&mut cpu, 6, &[Instruction::Halt]);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 6);
        cpu.run().unwrap();
        assert_eq!(cpu.console.output_string(), "Hi");
    }

    #[test]
    fn test_stdout_number_char_and_string() {
        let mut cpu = make_cpu("");
        cpu.regs.set(R1, 0xFFF6);
        cpu.regs.set(R2, b'A' as u16 | 0x1200);
        cpu.regs.set(R3, 0x500);
        cpu.mem.write_cstring(0x500, b"mem");
        load(
            &mut cpu,
            0,
            &[
                Instruction::Stdout { mode: OutputMode::Number, reg: R1 },
                Instruction::Stdout { mode: OutputMode::Char, reg: R2 },
                Instruction::Stdout { mode: OutputMode::StringAt, reg: R3 },
                Instruction::Stdout { mode: OutputMode::Reserved(5), reg: R3 },
                Instruction::Halt,
            ],
        );

        cpu.run().unwrap();

        assert_eq!(cpu.console.output_string(), "-10Amem");
    }

    #[test]
    fn test_stdin_line_into_memory() {
        let mut cpu = make_cpu("hello\n");
        cpu.regs.set(R0, 0x800);
        cpu.mem.write_byte(0x805, 0xFF);
        load(
            &mut cpu,
            0,
            &[
                Instruction::Stdin { mode: InputMode::Line, reg: R0 },
                Instruction::Stdout { mode: OutputMode::StringAt, reg: R0 },
                Instruction::Halt,
            ],
        );

        cpu.run().unwrap();

        assert_eq!(cpu.mem.read_cstring(0x800), b"hello".to_vec());
        assert_eq!(cpu.mem.read_byte(0x805), 0);
        assert_eq!(cpu.console.output_string(), "hello");
    }

    #[test]
    fn test_stdin_number() {
        let mut cpu = make_cpu("-3 rest\n70000\n");
        load(
            &mut cpu,
            0,
            &[
                Instruction::Stdin { mode: InputMode::Number, reg: R4 },
                Instruction::Stdin { mode: InputMode::Number, reg: R5 },
                Instruction::Halt,
            ],
        );

        cpu.step().unwrap();
        assert_eq!(cpu.regs.get(R4), 0xFFFD);
        assert!(cpu.regs.flags.sign());

        cpu.step().unwrap();
        assert_eq!(cpu.regs.get(R5), (70000u32 & 0xFFFF) as u16);
    }

    #[test]
    fn test_stdin_malformed_number_is_ignored() {
        let mut cpu = make_cpu("oops\n");
        cpu.regs.set(R4, 99);
        cpu.regs.flags.set(Flags::ZERO, true);
        load(
            &mut cpu,
            0,
            &[Instruction::Stdin { mode: InputMode::Number, reg: R4 }, Instruction::Halt],
        );

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(R4), 99);
        assert!(cpu.regs.flags.zero());
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_reset() {
        let mut cpu = make_cpu("");
        load(&mut cpu, 0, &[movi(R0, -1), Instruction::Halt]);
        cpu.run().unwrap();

        cpu.reset();

        assert!(cpu.is_running());
        assert_eq!(cpu.regs, Registers::new());
        assert_eq!(cpu.mem.read_word(0), 0);
        assert_eq!(cpu.cycles, 0);
        assert_eq!(cpu.halt_reason(), None);
        assert_eq!(cpu.last_instruction(), None);
    }

    #[test]
    fn test_run_limited() {
        let mut cpu = make_cpu("");
        cpu.regs.set(R0, 0);
        // JMP R0 at address 0: an infinite loop.
        load(&mut cpu, 0, &[Instruction::Jmp { target: R0 }]);

        assert_eq!(cpu.run_limited(100).unwrap(), 100);
        assert!(cpu.is_running());
        assert_eq!(cpu.last_instruction(), Some(Instruction::Jmp { target: R0 }));
    }

    #[test]
    fn test_dump_reflects_state() {
        let mut cpu = make_cpu("");
        load(&mut cpu, 0, &[movi(R0, 5), movi(R1, 10), ext(ExtOp::Add, R0, R1), Instruction::Halt]);
        cpu.run().unwrap();

        let dump = cpu.dump();
        assert_eq!(dump.pc, 8);
        assert_eq!(dump.registers[0], 15);
        assert!(dump.halted);
        assert!(dump.to_string().contains("R0: 0x000F (15)"));
    }
}
