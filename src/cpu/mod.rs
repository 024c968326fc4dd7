//! CPU emulation for the R16 machine.
//!
//! This module implements the complete architecture:
//! - 1 MiB byte-addressable memory with 20-bit wrap-around addressing
//! - 8 general purpose 16-bit registers, PC, SP and a 4-bit flags register
//! - 14 primary opcodes plus an 8-entry extended group
//! - console I/O instructions behind the [`Console`] trait

pub mod alu;
pub mod decode;
pub mod dump;
pub mod execute;
pub mod io;
pub mod memory;
pub mod registers;

pub use decode::{DecodeError, ExtOp, InputMode, Instruction, OutputMode};
pub use dump::StateDump;
pub use execute::{Cpu, CpuError, CpuState, HaltReason};
pub use io::{BufferConsole, Console, StdConsole, StreamConsole};
pub use memory::{Memory, MemoryError, ADDR_MASK, MEMORY_SIZE};
pub use registers::{Flags, Register, Registers};
