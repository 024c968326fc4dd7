//! Program construction and inspection.
//!
//! This module provides:
//! - A program builder (instruction methods → byte image)
//! - Raw binary images (load/save)
//! - A disassembler (image → readable text)
//! - The built-in example programs

pub mod builder;
pub mod disasm;
pub mod image;
pub mod programs;

pub use builder::{Program, ProgramBuilder};
pub use disasm::disassemble;
pub use image::{load_image, save_image, ImageError};
