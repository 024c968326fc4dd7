//! Program builder.
//!
//! Emits encoded instruction words and inline data into a byte image,
//! one method per instruction. Addresses of already-emitted code are
//! available through [`ProgramBuilder::here`], which is how loops are
//! written:
//!
//! ```
//! use r16::asm::ProgramBuilder;
//! use r16::Register::*;
//!
//! let mut b = ProgramBuilder::new();
//! b.movi(R0, 3).movi(R1, 1);
//! let top = b.here();
//! b.preset(R2, top as u16);
//! b.sub(R0, R1).jnz(R2).halt();
//! let program = b.build();
//! assert_eq!(program.bytes.len(), 10);
//! ```

use crate::cpu::decode::{encode, ExtOp, InputMode, Instruction, OutputMode};
use crate::cpu::io::Console;
use crate::cpu::registers::Register;
use crate::cpu::Cpu;

/// A built program: an image plus register values to set before it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// Load address of the first byte.
    pub origin: u32,
    /// Encoded words and inline data, little-endian.
    pub bytes: Vec<u8>,
    /// Registers preset by the loader.
    pub presets: Vec<(Register, u16)>,
}

impl Program {
    /// Copy the image into memory and apply the register presets.
    pub fn load_into<C: Console>(&self, cpu: &mut Cpu<C>) {
        cpu.load_program(self.origin, &self.bytes);
        for &(reg, value) in &self.presets {
            cpu.regs.set(reg, value);
        }
    }
}

/// Incremental program writer.
#[derive(Debug, Clone, Default)]
pub struct ProgramBuilder {
    origin: u32,
    bytes: Vec<u8>,
    presets: Vec<(Register, u16)>,
}

impl ProgramBuilder {
    /// Start a program at address 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a program at `origin`.
    pub fn at(origin: u32) -> Self {
        Self {
            origin,
            ..Self::default()
        }
    }

    /// Address the next emitted byte will occupy.
    pub fn here(&self) -> u32 {
        self.origin + self.bytes.len() as u32
    }

    /// Append a raw word.
    pub fn word(&mut self, word: u16) -> &mut Self {
        self.bytes.extend_from_slice(&word.to_le_bytes());
        self
    }

    /// Append an encoded instruction.
    pub fn emit(&mut self, instr: Instruction) -> &mut Self {
        self.word(encode(&instr))
    }

    /// Pad with a zero byte if the next address is odd.
    pub fn align(&mut self) -> &mut Self {
        if self.here() & 1 != 0 {
            self.bytes.push(0);
        }
        self
    }

    /// Set a register before execution starts. Used for 16-bit constants
    /// that do not fit the 9-bit immediate.
    pub fn preset(&mut self, reg: Register, value: u16) -> &mut Self {
        self.presets.retain(|&(r, _)| r != reg);
        self.presets.push((reg, value));
        self
    }

    pub fn halt(&mut self) -> &mut Self {
        self.emit(Instruction::Halt)
    }

    pub fn nop(&mut self) -> &mut Self {
        self.emit(Instruction::Nop)
    }

    pub fn mov(&mut self, dst: Register, src: Register) -> &mut Self {
        self.emit(Instruction::Mov { dst, src })
    }

    /// Load a signed immediate in `-256..=255`. Wider values are truncated
    /// to their low nine bits.
    pub fn movi(&mut self, dst: Register, imm: i16) -> &mut Self {
        debug_assert!((-256..=255).contains(&imm), "immediate {} exceeds 9 bits", imm);
        self.emit(Instruction::Movi { dst, imm: imm as u16 & 0x1FF })
    }

    pub fn cmp(&mut self, dst: Register, src: Register) -> &mut Self {
        self.emit(Instruction::Cmp { dst, src })
    }

    pub fn jmp(&mut self, target: Register) -> &mut Self {
        self.emit(Instruction::Jmp { target })
    }

    pub fn jz(&mut self, target: Register) -> &mut Self {
        self.emit(Instruction::Jz { target })
    }

    pub fn jnz(&mut self, target: Register) -> &mut Self {
        self.emit(Instruction::Jnz { target })
    }

    pub fn push(&mut self, src: Register) -> &mut Self {
        self.emit(Instruction::Push { src })
    }

    pub fn pop(&mut self, dst: Register) -> &mut Self {
        self.emit(Instruction::Pop { dst })
    }

    pub fn call(&mut self, target: Register) -> &mut Self {
        self.emit(Instruction::Call { target })
    }

    fn ext(&mut self, op: ExtOp, reg1: Register, reg2: Register) -> &mut Self {
        self.emit(Instruction::Ext { op, reg1, reg2 })
    }

    pub fn ret(&mut self) -> &mut Self {
        self.ext(ExtOp::Ret, Register::R0, Register::R0)
    }

    /// reg1 := mem16[reg2]
    pub fn load(&mut self, reg1: Register, reg2: Register) -> &mut Self {
        self.ext(ExtOp::Load, reg1, reg2)
    }

    /// mem16[reg1] := reg2
    pub fn store(&mut self, reg1: Register, reg2: Register) -> &mut Self {
        self.ext(ExtOp::Store, reg1, reg2)
    }

    pub fn add(&mut self, reg1: Register, reg2: Register) -> &mut Self {
        self.ext(ExtOp::Add, reg1, reg2)
    }

    pub fn sub(&mut self, reg1: Register, reg2: Register) -> &mut Self {
        self.ext(ExtOp::Sub, reg1, reg2)
    }

    pub fn and(&mut self, reg1: Register, reg2: Register) -> &mut Self {
        self.ext(ExtOp::And, reg1, reg2)
    }

    pub fn or(&mut self, reg1: Register, reg2: Register) -> &mut Self {
        self.ext(ExtOp::Or, reg1, reg2)
    }

    pub fn xor(&mut self, reg1: Register, reg2: Register) -> &mut Self {
        self.ext(ExtOp::Xor, reg1, reg2)
    }

    /// Print an inline string. The text follows the instruction and is
    /// padded to an even address, matching how the CPU skips it.
    pub fn stdout_str(&mut self, text: &str) -> &mut Self {
        self.emit(Instruction::Stdout {
            mode: OutputMode::InlineString,
            reg: Register::R0,
        });
        self.bytes.extend_from_slice(text.as_bytes());
        self.bytes.push(0);
        self.align()
    }

    /// Print a register as a signed decimal.
    pub fn stdout_reg(&mut self, reg: Register) -> &mut Self {
        self.emit(Instruction::Stdout { mode: OutputMode::Number, reg })
    }

    /// Print the NUL-terminated string whose address is in `reg`.
    pub fn stdout_str_at(&mut self, reg: Register) -> &mut Self {
        self.emit(Instruction::Stdout { mode: OutputMode::StringAt, reg })
    }

    /// Print the low byte of `reg` as a character.
    pub fn stdout_char(&mut self, reg: Register) -> &mut Self {
        self.emit(Instruction::Stdout { mode: OutputMode::Char, reg })
    }

    /// Read a decimal number into `reg`.
    pub fn stdin_num(&mut self, reg: Register) -> &mut Self {
        self.emit(Instruction::Stdin { mode: InputMode::Number, reg })
    }

    /// Read a line into the buffer at `buffer`; `reg` is preset to hold it.
    pub fn stdin_str(&mut self, reg: Register, buffer: u16) -> &mut Self {
        self.preset(reg, buffer);
        self.emit(Instruction::Stdin { mode: InputMode::Line, reg })
    }

    /// Finish the program.
    pub fn build(&self) -> Program {
        Program {
            origin: self.origin,
            bytes: self.bytes.clone(),
            presets: self.presets.clone(),
        }
    }
}
