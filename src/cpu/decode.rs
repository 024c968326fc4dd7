//! Instruction codec.
//!
//! Every instruction is one 16-bit word. The top nibble is the opcode;
//! the remaining bits are read in one of three layouts:
//!
//! ```text
//! register form   OPCODE(4) | DST(3)  | SRC(3)  | unused(6)
//! immediate form  OPCODE(4) | REG(3)  | IMM9(9)
//! extended form   0xD(4)    | EXT(3)  | REG1(3) | REG2(3) | unused(3)
//! ```
//!
//! Field extraction never fails. Only [`decode`] decides whether the
//! opcode is one the machine knows.

use crate::cpu::registers::Register;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Primary opcode values (top nibble).
pub mod opcode {
    pub const HALT: u8 = 0x0;
    pub const NOP: u8 = 0x1;
    pub const MOV: u8 = 0x2;
    pub const MOVI: u8 = 0x3;
    pub const CMP: u8 = 0x4;
    pub const JMP: u8 = 0x5;
    pub const JZ: u8 = 0x6;
    pub const JNZ: u8 = 0x7;
    pub const PUSH: u8 = 0x8;
    pub const POP: u8 = 0x9;
    pub const CALL: u8 = 0xA;
    pub const STDOUT: u8 = 0xB;
    pub const STDIN: u8 = 0xC;
    pub const EXT: u8 = 0xD;
}

/// Raw bit fields of an instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fields {
    /// Bits 12-15.
    pub opcode: u8,
    /// Bits 9-11. Extended opcode in the extended form.
    pub dst: u8,
    /// Bits 6-8. First operand register in the extended form.
    pub src: u8,
    /// Bits 3-5. Second operand register in the extended form.
    pub reg2: u8,
    /// Bits 0-8.
    pub imm9: u16,
}

impl Fields {
    /// Split a word into its fields.
    #[inline]
    pub const fn unpack(word: u16) -> Self {
        Self {
            opcode: ((word >> 12) & 0xF) as u8,
            dst: ((word >> 9) & 0x7) as u8,
            src: ((word >> 6) & 0x7) as u8,
            reg2: ((word >> 3) & 0x7) as u8,
            imm9: word & 0x1FF,
        }
    }
}

/// Pack a register-form word.
#[inline]
pub const fn pack_reg(opcode: u8, dst: u8, src: u8) -> u16 {
    ((opcode as u16 & 0xF) << 12) | ((dst as u16 & 0x7) << 9) | ((src as u16 & 0x7) << 6)
}

/// Pack an immediate-form word. Only the low 9 bits of `imm` are kept.
#[inline]
pub const fn pack_imm(opcode: u8, reg: u8, imm: u16) -> u16 {
    ((opcode as u16 & 0xF) << 12) | ((reg as u16 & 0x7) << 9) | (imm & 0x1FF)
}

/// Pack an extended-form word.
#[inline]
pub const fn pack_ext(ext: u8, reg1: u8, reg2: u8) -> u16 {
    ((opcode::EXT as u16) << 12)
        | ((ext as u16 & 0x7) << 9)
        | ((reg1 as u16 & 0x7) << 6)
        | ((reg2 as u16 & 0x7) << 3)
}

/// Sign-extend a 9-bit two's-complement immediate to 16 bits.
#[inline]
pub const fn sign_extend_9(imm9: u16) -> u16 {
    let imm9 = imm9 & 0x1FF;
    if imm9 & 0x100 != 0 {
        imm9 | 0xFE00
    } else {
        imm9
    }
}

/// Extended opcodes (bits 9-11 when the opcode is EXT).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtOp {
    Ret,
    Load,
    Store,
    Add,
    Sub,
    And,
    Or,
    Xor,
}

impl ExtOp {
    pub fn from_code(code: u8) -> Result<Self, DecodeError> {
        Ok(match code {
            0x0 => ExtOp::Ret,
            0x1 => ExtOp::Load,
            0x2 => ExtOp::Store,
            0x3 => ExtOp::Add,
            0x4 => ExtOp::Sub,
            0x5 => ExtOp::And,
            0x6 => ExtOp::Or,
            0x7 => ExtOp::Xor,
            other => return Err(DecodeError::InvalidExtOpcode(other)),
        })
    }

    pub const fn code(self) -> u8 {
        match self {
            ExtOp::Ret => 0x0,
            ExtOp::Load => 0x1,
            ExtOp::Store => 0x2,
            ExtOp::Add => 0x3,
            ExtOp::Sub => 0x4,
            ExtOp::And => 0x5,
            ExtOp::Or => 0x6,
            ExtOp::Xor => 0x7,
        }
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            ExtOp::Ret => "RET",
            ExtOp::Load => "LOAD",
            ExtOp::Store => "STORE",
            ExtOp::Add => "ADD",
            ExtOp::Sub => "SUB",
            ExtOp::And => "AND",
            ExtOp::Or => "OR",
            ExtOp::Xor => "XOR",
        }
    }
}

/// STDOUT sub-modes, selected by the DST field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputMode {
    /// NUL-terminated string stored right after the instruction.
    InlineString,
    /// Register as signed decimal.
    Number,
    /// NUL-terminated string at the address held in the register.
    StringAt,
    /// Low byte of the register as a character.
    Char,
    /// Modes 4-7 produce no output.
    Reserved(u8),
}

impl OutputMode {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x7 {
            0 => OutputMode::InlineString,
            1 => OutputMode::Number,
            2 => OutputMode::StringAt,
            3 => OutputMode::Char,
            other => OutputMode::Reserved(other),
        }
    }

    pub const fn bits(self) -> u8 {
        match self {
            OutputMode::InlineString => 0,
            OutputMode::Number => 1,
            OutputMode::StringAt => 2,
            OutputMode::Char => 3,
            OutputMode::Reserved(bits) => bits & 0x7,
        }
    }
}

/// STDIN sub-modes, selected by the DST field. Any non-zero value reads a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputMode {
    Line,
    Number,
}

impl InputMode {
    pub const fn from_bits(bits: u8) -> Self {
        if bits & 0x7 == 0 {
            InputMode::Line
        } else {
            InputMode::Number
        }
    }

    pub const fn bits(self) -> u8 {
        match self {
            InputMode::Line => 0,
            InputMode::Number => 1,
        }
    }
}

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Stop the machine.
    Halt,

    Nop,

    /// dst := src
    Mov { dst: Register, src: Register },

    /// dst := sign_extend(imm), `imm` is the raw 9-bit field.
    Movi { dst: Register, imm: u16 },

    /// Flags from dst - src; nothing stored.
    Cmp { dst: Register, src: Register },

    Jmp { target: Register },
    Jz { target: Register },
    Jnz { target: Register },

    Push { src: Register },
    Pop { dst: Register },

    /// Push the 20-bit return address as two words, then jump.
    Call { target: Register },

    Stdout { mode: OutputMode, reg: Register },
    Stdin { mode: InputMode, reg: Register },

    /// Extended group: operands come from bits 6-8 and 3-5.
    Ext { op: ExtOp, reg1: Register, reg2: Register },
}

/// Decode a 16-bit word.
pub fn decode(word: u16) -> Result<Instruction, DecodeError> {
    let f = Fields::unpack(word);
    let dst = Register::from_bits(f.dst as u16);
    let src = Register::from_bits(f.src as u16);

    let instruction = match f.opcode {
        opcode::HALT => Instruction::Halt,
        opcode::NOP => Instruction::Nop,
        opcode::MOV => Instruction::Mov { dst, src },
        opcode::MOVI => Instruction::Movi { dst, imm: f.imm9 },
        opcode::CMP => Instruction::Cmp { dst, src },
        opcode::JMP => Instruction::Jmp { target: dst },
        opcode::JZ => Instruction::Jz { target: dst },
        opcode::JNZ => Instruction::Jnz { target: dst },
        opcode::PUSH => Instruction::Push { src: dst },
        opcode::POP => Instruction::Pop { dst },
        opcode::CALL => Instruction::Call { target: dst },
        opcode::STDOUT => Instruction::Stdout {
            mode: OutputMode::from_bits(f.dst),
            reg: src,
        },
        opcode::STDIN => Instruction::Stdin {
            mode: InputMode::from_bits(f.dst),
            reg: src,
        },
        opcode::EXT => Instruction::Ext {
            op: ExtOp::from_code(f.dst)?,
            reg1: src,
            reg2: Register::from_bits(f.reg2 as u16),
        },
        other => return Err(DecodeError::InvalidOpcode(other)),
    };

    Ok(instruction)
}

/// Encode an instruction. Unused bits are zero.
pub fn encode(instr: &Instruction) -> u16 {
    let r = |reg: Register| reg.index() as u8;

    match *instr {
        Instruction::Halt => pack_reg(opcode::HALT, 0, 0),
        Instruction::Nop => pack_reg(opcode::NOP, 0, 0),
        Instruction::Mov { dst, src } => pack_reg(opcode::MOV, r(dst), r(src)),
        Instruction::Movi { dst, imm } => pack_imm(opcode::MOVI, r(dst), imm),
        Instruction::Cmp { dst, src } => pack_reg(opcode::CMP, r(dst), r(src)),
        Instruction::Jmp { target } => pack_reg(opcode::JMP, r(target), 0),
        Instruction::Jz { target } => pack_reg(opcode::JZ, r(target), 0),
        Instruction::Jnz { target } => pack_reg(opcode::JNZ, r(target), 0),
        Instruction::Push { src } => pack_reg(opcode::PUSH, r(src), 0),
        Instruction::Pop { dst } => pack_reg(opcode::POP, r(dst), 0),
        Instruction::Call { target } => pack_reg(opcode::CALL, r(target), 0),
        Instruction::Stdout { mode, reg } => pack_reg(opcode::STDOUT, mode.bits(), r(reg)),
        Instruction::Stdin { mode, reg } => pack_reg(opcode::STDIN, mode.bits(), r(reg)),
        Instruction::Ext { op, reg1, reg2 } => pack_ext(op.code(), r(reg1), r(reg2)),
    }
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode: 0x{0:X}")]
    InvalidOpcode(u8),

    #[error("unknown extended opcode: 0x{0:X}")]
    InvalidExtOpcode(u8),
}
