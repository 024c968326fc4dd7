//! TUI debugger for the R16 emulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register and flag view
//! - Hex memory view
//! - Step/run/breakpoint controls
//! - Disassembly around the program counter
//! - Captured program output (STDIN is scripted up front)

mod app;
mod ui;

pub use app::{run_debugger, DebuggerApp};
