//! Debugger application state and logic.

use crate::asm::disasm::{disassemble_instruction, format_instruction};
use crate::asm::Program;
use crate::cpu::memory::{wrap, MemoryError};
use crate::cpu::{BufferConsole, Cpu};
use std::collections::HashSet;

/// Bytes shown per memory row.
pub const MEM_ROW: u32 = 16;

/// Debugger application state.
pub struct DebuggerApp {
    /// The CPU being debugged. STDIN is scripted, STDOUT is captured.
    pub cpu: Cpu<BufferConsole>,
    /// Program reloaded on reset.
    pub program: Program,
    /// Scripted STDIN contents.
    pub input: Vec<u8>,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<u32>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// First memory row shown.
    pub mem_scroll: u32,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(program: Program, input: Vec<u8>) -> Result<Self, MemoryError> {
        let cpu = Self::boot(&program, &input)?;

        Ok(Self {
            cpu,
            mem_scroll: program.origin / MEM_ROW,
            program,
            input,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into(),
        })
    }

    fn boot(program: &Program, input: &[u8]) -> Result<Cpu<BufferConsole>, MemoryError> {
        let mut cpu = Cpu::with_console(BufferConsole::with_input(input.to_vec()))?;
        program.load_into(&mut cpu);
        cpu.regs.jump(program.origin);
        Ok(cpu)
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if !self.cpu.is_running() {
            self.status = match self.cpu.halt_reason() {
                Some(reason) => reason.to_string(),
                None => format!("CPU halted: {:?}", self.cpu.state),
            };
            self.running = false;
            return;
        }

        let pc = self.cpu.regs.pc;
        match self.cpu.step() {
            Ok(instr) => {
                self.status = format!("PC={:05X}: {}", pc, format_instruction(&instr));
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
    }

    /// Run until halt, breakpoint, or error.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if !self.cpu.is_running() {
            self.running = false;
            self.status = format!("Halted after {} cycles", self.cpu.cycles);
            return;
        }

        self.step();

        // Stop on arrival so the next 'r' steps past it.
        if self.running && self.breakpoints.contains(&self.cpu.regs.pc) {
            self.running = false;
            self.status = format!("Breakpoint at PC={:05X}", self.cpu.regs.pc);
        }
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cpu.regs.pc;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={:05X}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={:05X}", pc);
        }
    }

    /// Reset CPU to initial state and reload the program.
    pub fn reset(&mut self) {
        match Self::boot(&self.program, &self.input) {
            Ok(cpu) => {
                self.cpu = cpu;
                self.status = "Reset. Ready.".into();
            }
            Err(e) => self.status = format!("Reset failed: {}", e),
        }
        self.running = false;
    }

    pub fn scroll_up(&mut self) {
        self.mem_scroll = self.mem_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        let last_row = (wrap(u32::MAX) + 1) / MEM_ROW - 1;
        self.mem_scroll = (self.mem_scroll + 1).min(last_row);
    }

    /// Get disassembly around current PC: (address, text, is_current).
    pub fn get_disassembly(&self, lines: usize) -> Vec<(u32, String, bool)> {
        let pc = self.cpu.regs.pc;
        let start = wrap(pc.wrapping_sub((lines as u32 / 2) * 2));

        (0..lines as u32)
            .map(|i| {
                let addr = wrap(start.wrapping_add(i * 2));
                let word = self.cpu.mem.read_word(addr);
                (addr, disassemble_instruction(word), addr == pc)
            })
            .collect()
    }

    /// Everything the program has printed so far.
    pub fn output(&self) -> String {
        self.cpu.console.output_string()
    }
}

/// Run the debugger with a program.
pub fn run_debugger(program: Program, input: Vec<u8>) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    let mut app = DebuggerApp::new(program, input)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::OutOfMemory, e))?;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Main loop
    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => app.scroll_up(),
                        KeyCode::Down => app.scroll_down(),
                        _ => {}
                    }
                }
            }
        }

        // Several instructions per frame keeps long loops responsive.
        for _ in 0..64 {
            if !app.running {
                break;
            }
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::{programs, ProgramBuilder};
    use crate::cpu::Register::*;

    #[test]
    fn test_step_updates_status() {
        let mut app = DebuggerApp::new(programs::multiplication(), Vec::new()).unwrap();
        app.step();
        assert_eq!(app.cpu.regs.pc, 2);
        assert!(app.status.contains("MOVI R0, 30"));
    }

    #[test]
    fn test_status_shows_executed_instruction() {
        // The STORE at 4 overwrites itself with HALT.
        let mut b = ProgramBuilder::new();
        b.movi(R1, 4).movi(R2, 0).store(R1, R2);
        let mut app = DebuggerApp::new(b.build(), Vec::new()).unwrap();

        for _ in 0..3 {
            app.step();
        }
        assert_eq!(app.status, "PC=00004: STORE [R1], R2");
        assert_eq!(app.cpu.mem.read_word(4), 0);
    }

    #[test]
    fn test_breakpoint_stops_run() {
        let mut app = DebuggerApp::new(programs::multiplication(), Vec::new()).unwrap();
        app.breakpoints.insert(6);
        app.run();
        while app.running {
            app.tick();
        }
        assert_eq!(app.cpu.regs.pc, 6);
        assert!(app.status.starts_with("Breakpoint"));

        // Resuming steps past the breakpoint and finishes.
        app.breakpoints.clear();
        app.run();
        while app.running {
            app.tick();
        }
        assert!(app.cpu.is_halted());
        assert_eq!(app.output(), "Result: 150\n");
    }

    #[test]
    fn test_reset_reloads_program() {
        let mut app = DebuggerApp::new(programs::multiplication(), Vec::new()).unwrap();
        app.run();
        while app.running {
            app.tick();
        }
        app.reset();
        assert!(app.cpu.is_running());
        assert_eq!(app.cpu.regs.pc, 0);
        assert_eq!(app.output(), "");
    }

    #[test]
    fn test_disassembly_window_marks_pc() {
        let app = DebuggerApp::new(programs::fibonacci(), Vec::new()).unwrap();
        let lines = app.get_disassembly(6);
        assert_eq!(lines.len(), 6);
        // PC=0, so the window starts 6 bytes below, wrapping to the top of memory.
        assert_eq!(lines[0].0, 0xF_FFFA);
        assert!(lines[3].2);
        assert_eq!(lines[3].1, "MOVI R0, 0");
    }
}
