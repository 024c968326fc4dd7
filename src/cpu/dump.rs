//! Human-readable machine state snapshot.

use crate::cpu::registers::{Registers, NUM_REGISTERS};
use serde::Serialize;

/// Snapshot of the architecturally visible state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateDump {
    pub pc: u32,
    pub sp: u32,
    pub zero: bool,
    pub sign: bool,
    pub carry: bool,
    pub overflow: bool,
    pub registers: [u16; NUM_REGISTERS],
    pub halted: bool,
    pub cycles: u64,
}

impl StateDump {
    pub fn capture(regs: &Registers, halted: bool, cycles: u64) -> Self {
        Self {
            pc: regs.pc,
            sp: regs.sp,
            zero: regs.flags.zero(),
            sign: regs.flags.sign(),
            carry: regs.flags.carry(),
            overflow: regs.flags.overflow(),
            registers: regs.gpr,
            halted,
            cycles,
        }
    }
}

impl std::fmt::Display for StateDump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== CPU State ===")?;
        writeln!(f, "PC: 0x{:05X}  SP: 0x{:05X}", self.pc, self.sp)?;
        writeln!(
            f,
            "Flags: Z={} S={} C={} O={}",
            self.zero as u8, self.sign as u8, self.carry as u8, self.overflow as u8
        )?;
        writeln!(f, "Registers:")?;
        for (i, value) in self.registers.iter().enumerate() {
            writeln!(f, "  R{}: 0x{:04X} ({})", i, value, *value as i16)?;
        }
        writeln!(f, "=================")
    }
}
