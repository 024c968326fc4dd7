//! R16 Emulator - CLI Entry Point
//!
//! Commands:
//! - `r16-emu run <image>` - Run a raw binary image
//! - `r16-emu debug <image>` - Interactive debugger
//! - `r16-emu disasm <image>` - Disassemble an image
//! - `r16-emu demo <name>` - Run (or write out) a built-in program

use clap::{Parser, Subcommand};
use r16::asm::programs;
use r16::{Cpu, CpuError, HaltReason, Program};
use tracing::Level;

#[derive(Parser)]
#[command(name = "r16-emu")]
#[command(version)]
#[command(about = "An emulator for a 16-bit register machine with a 20-bit address space")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). Logs go to stderr.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program image until it halts
    Run {
        /// Path to the raw binary image
        image: String,
        /// Load address (decimal or 0x-prefixed hex)
        #[arg(short, long, default_value = "0", value_parser = parse_address)]
        origin: u32,
        /// Maximum number of instructions to run (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        max_cycles: u64,
        /// Print each executed instruction to stderr
        #[arg(short, long)]
        trace: bool,
        /// Print the machine state after the run
        #[arg(short, long)]
        dump: bool,
        /// Print the machine state as JSON (implies --dump)
        #[arg(long)]
        json: bool,
    },
    /// Interactive debugger
    #[cfg(feature = "tui")]
    Debug {
        /// Path to the raw binary image
        image: String,
        /// Load address (decimal or 0x-prefixed hex)
        #[arg(short, long, default_value = "0", value_parser = parse_address)]
        origin: u32,
        /// File whose contents are fed to STDIN
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Disassemble an image to readable text
    Disasm {
        /// Path to the raw binary image
        image: String,
        /// Load address (decimal or 0x-prefixed hex)
        #[arg(short, long, default_value = "0", value_parser = parse_address)]
        origin: u32,
    },
    /// Run a built-in program (fibonacci, multiply)
    Demo {
        /// Program name
        name: String,
        /// Write the program image here instead of running it
        #[arg(short, long)]
        output: Option<String>,
        /// Print the machine state after the run
        #[arg(short, long)]
        dump: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Run { image, origin, max_cycles, trace, dump, json }) => {
            let program = load_program(&image, origin);
            let options = RunOptions { max_cycles, trace, dump: dump || json, json };
            run_program(&program, &options);
        }
        #[cfg(feature = "tui")]
        Some(Commands::Debug { image, origin, input }) => {
            debug_program(&image, origin, input);
        }
        Some(Commands::Disasm { image, origin }) => {
            disassemble_file(&image, origin);
        }
        Some(Commands::Demo { name, output, dump }) => {
            demo(&name, output, dump);
        }
        None => {
            println!("R16 Emulator v{}", env!("CARGO_PKG_VERSION"));
            println!("A 16-bit register machine emulator");
            println!();
            println!("Use --help for available commands");
            println!("Built-in programs: {}", programs::NAMES.join(", "));
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Parse a decimal or `0x`-prefixed hexadecimal address.
fn parse_address(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid address '{}': {}", s, e))
}

fn load_program(path: &str, origin: u32) -> Program {
    match r16::load_image(path) {
        Ok(bytes) => Program {
            origin,
            bytes,
            presets: Vec::new(),
        },
        Err(e) => {
            eprintln!("error: failed to load {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

struct RunOptions {
    max_cycles: u64,
    trace: bool,
    dump: bool,
    json: bool,
}

fn run_program(program: &Program, options: &RunOptions) {
    let mut cpu = match Cpu::new() {
        Ok(cpu) => cpu,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    program.load_into(&mut cpu);
    cpu.regs.jump(program.origin);

    let result = if options.trace {
        trace_run(&mut cpu, options.max_cycles)
    } else if options.max_cycles == 0 {
        cpu.run()
    } else {
        cpu.run_limited(options.max_cycles)
    };

    if let Some(reason) = cpu.halt_reason() {
        println!("{}", reason);
    }

    if options.dump {
        let state = cpu.dump();
        if options.json {
            match serde_json::to_string_pretty(&state) {
                Ok(text) => println!("{}", text),
                Err(e) => eprintln!("error: {}", e),
            }
        } else {
            print!("\n{}\n", state);
        }
    }

    if cpu.is_running() {
        eprintln!("warning: stopped after {} instructions without halting", cpu.cycles);
    }

    if result.is_err() {
        if let Some(e) = unreported_error(&result, cpu.halt_reason()) {
            eprintln!("error: {}", e);
        }
        std::process::exit(1);
    }
}

/// The run error, unless the printed halt reason already describes it.
fn unreported_error(
    result: &Result<u64, CpuError>,
    reason: Option<HaltReason>,
) -> Option<&CpuError> {
    match (result, reason) {
        (Err(CpuError::Decode { .. }), Some(HaltReason::Fault { .. })) => None,
        (Err(e), _) => Some(e),
        (Ok(_), _) => None,
    }
}

/// Step one instruction at a time, echoing each to stderr.
fn trace_run(cpu: &mut Cpu, max_cycles: u64) -> Result<u64, CpuError> {
    let start = cpu.cycles;
    while cpu.is_running() && (max_cycles == 0 || cpu.cycles - start < max_cycles) {
        let pc = cpu.regs.pc;
        let instr = cpu.step()?;
        eprintln!("{:05X}: {}", pc, r16::asm::disasm::format_instruction(&instr));
    }
    Ok(cpu.cycles - start)
}

#[cfg(feature = "tui")]
fn debug_program(path: &str, origin: u32, input: Option<String>) {
    let program = load_program(path, origin);

    let input = match input {
        Some(file) => match std::fs::read(&file) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("error: failed to read {}: {}", file, e);
                std::process::exit(1);
            }
        },
        None => Vec::new(),
    };

    if let Err(e) = r16::run_debugger(program, input) {
        eprintln!("error: debugger failed: {}", e);
        std::process::exit(1);
    }
}

fn disassemble_file(path: &str, origin: u32) {
    let program = load_program(path, origin);
    print!("{}", r16::disassemble(&program.bytes, program.origin));
}

fn demo(name: &str, output: Option<String>, dump: bool) {
    let Some(program) = programs::by_name(name) else {
        eprintln!(
            "error: unknown program '{}' (available: {})",
            name,
            programs::NAMES.join(", ")
        );
        std::process::exit(1);
    };

    match output {
        Some(path) => {
            if !program.presets.is_empty() {
                // A raw image has nowhere to keep register presets.
                eprintln!(
                    "warning: '{}' relies on register presets; the image alone will not run",
                    name
                );
            }
            if let Err(e) = r16::save_image(&path, &program.bytes) {
                eprintln!("error: failed to write {}: {}", path, e);
                std::process::exit(1);
            }
            println!("Wrote {} bytes to {}", program.bytes.len(), path);
        }
        None => {
            println!("--- {} ---", name);
            let options = RunOptions { max_cycles: 0, trace: false, dump, json: false };
            run_program(&program, &options);
        }
    }
}
