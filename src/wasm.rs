//! WebAssembly bindings for the R16 emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.

use crate::asm::disasm::{disassemble_instruction, format_instruction};
use crate::asm::{programs, Program};
use crate::cpu::memory::wrap;
use crate::cpu::{BufferConsole, Cpu, Register};
use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly CPU wrapper. STDIN is fed with [`WasmCpu::push_input`],
/// STDOUT is collected and drained with [`WasmCpu::take_output`].
#[wasm_bindgen]
pub struct WasmCpu {
    cpu: Cpu<BufferConsole>,
    program: Option<Program>,
}

#[wasm_bindgen]
impl WasmCpu {
    /// Create a new CPU instance.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WasmCpu, JsError> {
        let cpu = Cpu::with_console(BufferConsole::default())
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(Self { cpu, program: None })
    }

    /// Load a raw image at `origin` and point the PC at it.
    #[wasm_bindgen]
    pub fn load_image(&mut self, bytes: &[u8], origin: u32) -> Result<usize, JsError> {
        if bytes.len() > crate::cpu::MEMORY_SIZE {
            return Err(JsError::new("image does not fit in memory"));
        }
        let program = Program {
            origin: wrap(origin),
            bytes: bytes.to_vec(),
            presets: Vec::new(),
        };
        self.install(program);
        Ok(bytes.len())
    }

    /// Load one of the built-in programs by name.
    #[wasm_bindgen]
    pub fn load_demo(&mut self, name: &str) -> Result<usize, JsError> {
        let program = programs::by_name(name)
            .ok_or_else(|| JsError::new(&format!("unknown program: {}", name)))?;
        let len = program.bytes.len();
        self.install(program);
        Ok(len)
    }

    fn install(&mut self, program: Program) {
        self.cpu.reset();
        self.cpu.console = BufferConsole::default();
        program.load_into(&mut self.cpu);
        self.cpu.regs.jump(program.origin);
        self.program = Some(program);
    }

    /// Queue text for STDIN.
    #[wasm_bindgen]
    pub fn push_input(&mut self, text: &str) {
        self.cpu.console.push_input(text.as_bytes());
    }

    /// Return and clear everything printed so far.
    #[wasm_bindgen]
    pub fn take_output(&mut self) -> String {
        let output = self.cpu.console.output_string();
        self.cpu.console.clear_output();
        output
    }

    /// Step one instruction. Returns the disassembled instruction.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let instr = self.cpu.step().map_err(|e| JsError::new(&e.to_string()))?;
        Ok(format_instruction(&instr))
    }

    /// Run until halt or max cycles. Returns the total cycle count.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> Result<u64, JsError> {
        self.cpu
            .run_limited(max_cycles as u64)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(self.cpu.cycles)
    }

    /// Reset CPU to initial state with the loaded program.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        match self.program.take() {
            Some(program) => self.install(program),
            None => self.cpu.reset(),
        }
    }

    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.cpu.is_running()
    }

    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    /// Why the CPU stopped, or an empty string.
    #[wasm_bindgen]
    pub fn halt_reason(&self) -> String {
        self.cpu.halt_reason().map(|r| r.to_string()).unwrap_or_default()
    }

    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    #[wasm_bindgen]
    pub fn pc(&self) -> u32 {
        self.cpu.regs.pc
    }

    #[wasm_bindgen]
    pub fn sp(&self) -> u32 {
        self.cpu.regs.sp
    }

    /// Register value by index (0-7).
    #[wasm_bindgen]
    pub fn register(&self, index: u8) -> u16 {
        self.cpu.regs.get(Register::from_bits(index as u16))
    }

    /// Flags as the packed byte (Z=1, S=2, C=4, O=8).
    #[wasm_bindgen]
    pub fn flags(&self) -> u8 {
        self.cpu.regs.flags.bits()
    }

    /// A window of memory, wrapping at the top.
    #[wasm_bindgen]
    pub fn memory(&self, start: u32, len: usize) -> js_sys::Uint8Array {
        let bytes: Vec<u8> = self.cpu.mem.dump(start, len).into_iter().map(|(_, b)| b).collect();
        js_sys::Uint8Array::from(bytes.as_slice())
    }

    /// Machine state as JSON.
    #[wasm_bindgen]
    pub fn state_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.cpu.dump()).map_err(|e| JsError::new(&e.to_string()))
    }

    /// Machine state in the text dump format.
    #[wasm_bindgen]
    pub fn state_text(&self) -> String {
        self.cpu.dump().to_string()
    }
}

/// Disassemble a single instruction word.
#[wasm_bindgen]
pub fn wasm_disassemble(word: u16) -> String {
    disassemble_instruction(word)
}
