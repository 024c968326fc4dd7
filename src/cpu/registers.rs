//! Register file and condition flags.
//!
//! The machine has:
//! - R0-R7: eight 16-bit general purpose registers
//! - PC: 20-bit program counter
//! - SP: 20-bit stack pointer, growing downward from the top of memory
//! - FLAGS: Zero, Sign, Carry, Overflow
//! - SR0-SR3: segment registers, reserved and never touched by an opcode

use crate::cpu::memory::{wrap, MEMORY_SIZE};
use serde::{Deserialize, Serialize};

/// Number of general purpose registers.
pub const NUM_REGISTERS: usize = 8;

/// Initial stack pointer: top of memory, word aligned.
pub const STACK_TOP: u32 = MEMORY_SIZE as u32 - 2;

/// A general purpose register name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Register {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
}

impl Register {
    /// All registers in index order.
    pub const ALL: [Register; NUM_REGISTERS] = [
        Register::R0,
        Register::R1,
        Register::R2,
        Register::R3,
        Register::R4,
        Register::R5,
        Register::R6,
        Register::R7,
    ];

    /// Decode a 3-bit register field. Bits above the low three are ignored.
    #[inline]
    pub const fn from_bits(bits: u16) -> Self {
        match bits & 0x7 {
            0 => Register::R0,
            1 => Register::R1,
            2 => Register::R2,
            3 => Register::R3,
            4 => Register::R4,
            5 => Register::R5,
            6 => Register::R6,
            _ => Register::R7,
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{}", self.index())
    }
}

/// The four condition flags, packed into one byte.
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flags(u8);

impl Flags {
    pub const ZERO: u8 = 1 << 0;
    pub const SIGN: u8 = 1 << 1;
    pub const CARRY: u8 = 1 << 2;
    pub const OVERFLOW: u8 = 1 << 3;

    const DEFINED: u8 = Self::ZERO | Self::SIGN | Self::CARRY | Self::OVERFLOW;

    /// Build from a raw byte; undefined bits are dropped.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::DEFINED)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn get(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    #[inline]
    pub fn set(&mut self, flag: u8, value: bool) {
        if value {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }

    pub fn zero(self) -> bool {
        self.get(Self::ZERO)
    }

    pub fn sign(self) -> bool {
        self.get(Self::SIGN)
    }

    pub fn carry(self) -> bool {
        self.get(Self::CARRY)
    }

    pub fn overflow(self) -> bool {
        self.get(Self::OVERFLOW)
    }

    /// Recompute Zero and Sign from a 16-bit result.
    #[inline]
    pub fn update_zero_sign(&mut self, result: u16) {
        self.set(Self::ZERO, result == 0);
        self.set(Self::SIGN, result & 0x8000 != 0);
    }
}

impl std::fmt::Debug for Flags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Z={} S={} C={} O={}",
            self.zero() as u8,
            self.sign() as u8,
            self.carry() as u8,
            self.overflow() as u8
        )
    }
}

/// The register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// General purpose registers R0-R7.
    pub gpr: [u16; NUM_REGISTERS],

    /// Program counter (20 bits).
    pub pc: u32,

    /// Stack pointer (20 bits).
    pub sp: u32,

    /// Segment registers (CS, DS, SS, ES). Reserved.
    pub sr: [u16; 4],

    pub flags: Flags,
}

impl Registers {
    /// Create a register file in the reset state.
    pub fn new() -> Self {
        Self {
            gpr: [0; NUM_REGISTERS],
            pc: 0,
            sp: STACK_TOP,
            sr: [0; 4],
            flags: Flags::default(),
        }
    }

    /// Return to the reset state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub fn get(&self, reg: Register) -> u16 {
        self.gpr[reg.index()]
    }

    #[inline]
    pub fn set(&mut self, reg: Register, value: u16) {
        self.gpr[reg.index()] = value;
    }

    /// Store a value and recompute Zero/Sign from it.
    #[inline]
    pub fn set_with_flags(&mut self, reg: Register, value: u16) {
        self.set(reg, value);
        self.flags.update_zero_sign(value);
    }

    /// Advance the program counter, wrapping in the 20-bit space.
    /// Returns the old value.
    #[inline]
    pub fn advance_pc(&mut self, bytes: u32) -> u32 {
        let old = self.pc;
        self.pc = wrap(self.pc.wrapping_add(bytes));
        old
    }

    /// Set the program counter to an absolute address.
    #[inline]
    pub fn jump(&mut self, addr: u32) {
        self.pc = wrap(addr);
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_state() {
        let regs = Registers::new();
        assert_eq!(regs.pc, 0);
        assert_eq!(regs.sp, 0xF_FFFE);
        assert_eq!(regs.flags.bits(), 0);
        assert_eq!(regs.gpr, [0; 8]);
    }

    #[test]
    fn test_register_from_bits() {
        assert_eq!(Register::from_bits(0), Register::R0);
        assert_eq!(Register::from_bits(7), Register::R7);
        assert_eq!(Register::from_bits(0b1011), Register::R3);
        for reg in Register::ALL {
            assert_eq!(Register::from_bits(reg.index() as u16), reg);
        }
    }

    #[test]
    fn test_flag_bits() {
        let mut flags = Flags::default();
        flags.set(Flags::CARRY, true);
        flags.set(Flags::OVERFLOW, true);
        assert_eq!(flags.bits(), 0b1100);
        flags.set(Flags::CARRY, false);
        assert!(!flags.carry());
        assert!(flags.overflow());
        assert_eq!(Flags::from_bits(0xFF).bits(), 0x0F);
    }

    #[test]
    fn test_update_zero_sign() {
        let mut flags = Flags::default();
        flags.update_zero_sign(0);
        assert!(flags.zero() && !flags.sign());
        flags.update_zero_sign(0x8001);
        assert!(!flags.zero() && flags.sign());
        flags.update_zero_sign(1);
        assert!(!flags.zero() && !flags.sign());
    }

    #[test]
    fn test_advance_pc_wraps() {
        let mut regs = Registers::new();
        regs.pc = 0xF_FFFE;
        let old = regs.advance_pc(2);
        assert_eq!(old, 0xF_FFFE);
        assert_eq!(regs.pc, 0);
    }

    #[test]
    fn test_segment_registers_roundtrip() {
        let mut regs = Registers::new();
        regs.sr = [0x1000, 0x2000, 0x3000, 0x4000];
        regs.set(Register::R5, 0xCAFE);
        regs.flags.set(Flags::SIGN, true);

        let json = serde_json::to_string(&regs).unwrap();
        let back: Registers = serde_json::from_str(&json).unwrap();
        assert_eq!(back, regs);
    }
}
