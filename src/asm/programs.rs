//! Built-in example programs.

use crate::asm::builder::{Program, ProgramBuilder};
use crate::cpu::registers::Register::*;

/// Names accepted by [`by_name`].
pub const NAMES: [&str; 2] = ["fibonacci", "multiply"];

/// Look up a built-in program.
pub fn by_name(name: &str) -> Option<Program> {
    match name {
        "fibonacci" | "fib" => Some(fibonacci()),
        "multiply" | "mul" => Some(multiplication()),
        _ => None,
    }
}

/// Print the first 23 Fibonacci numbers, the most that fit a signed word
/// with the next term still computable.
pub fn fibonacci() -> Program {
    let mut b = ProgramBuilder::new();

    b.movi(R0, 0).movi(R1, 1).movi(R2, 23);

    let top = b.here();
    b.stdout_reg(R0).stdout_str(" ");

    // R3 = R0 + R1, then shift the window
    b.mov(R3, R0).add(R3, R1);
    b.mov(R0, R1).mov(R1, R3);

    // Jump target has to be in place before the decrement sets Z.
    b.preset(R4, top as u16);
    b.movi(R5, 1).sub(R2, R5).jnz(R4);

    b.stdout_str("\nDone!\n").halt();
    b.build()
}

/// Multiply 30 by 5 with repeated addition and print the result.
pub fn multiplication() -> Program {
    let mut b = ProgramBuilder::new();

    b.movi(R0, 30).movi(R1, 5).movi(R2, 0);

    let top = b.here();
    b.add(R2, R0);
    b.movi(R3, 1).sub(R1, R3);
    b.preset(R4, top as u16).jnz(R4);

    b.stdout_str("Result: ").stdout_reg(R2).stdout_str("\n").halt();
    b.build()
}
