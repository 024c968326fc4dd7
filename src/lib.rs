//! # R16 Emulator
//!
//! An emulator for a small 16-bit register machine.
//!
//! The machine has eight 16-bit registers, a 20-bit program counter and
//! stack pointer, four condition flags and 1 MiB of byte-addressable
//! memory. Instructions are single 16-bit words with a two-level opcode
//! scheme; console I/O is done by two dedicated instructions.

pub mod asm;
pub mod cpu;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use asm::{disassemble, load_image, save_image, ImageError, Program, ProgramBuilder};
pub use cpu::{
    BufferConsole, Console, Cpu, CpuError, CpuState, Flags, HaltReason, Instruction, Memory,
    MemoryError, Register, Registers, StateDump, StdConsole,
};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
