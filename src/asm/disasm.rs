//! Disassembler for R16 programs.
//!
//! Converts instruction words back to readable assembly.

use crate::cpu::decode::{decode, ExtOp, InputMode, Instruction, OutputMode};

/// Disassemble a single instruction word to text.
pub fn disassemble_instruction(word: u16) -> String {
    match decode(word) {
        Ok(decoded) => format_instruction(&decoded),
        Err(_) => format!("??? ; 0x{:04X}", word),
    }
}

/// Disassemble an image loaded at `origin`.
///
/// Inline strings following `STDOUT` are rendered as quoted text and
/// skipped the same way the CPU skips them.
pub fn disassemble(bytes: &[u8], origin: u32) -> String {
    let mut output = String::new();
    output.push_str("; R16 Disassembly\n");
    output.push_str("; ---------------\n\n");

    let mut offset = 0usize;
    while offset + 1 < bytes.len() {
        let addr = origin.wrapping_add(offset as u32);
        let word = u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
        offset += 2;

        let text = match decode(word) {
            Ok(Instruction::Stdout {
                mode: OutputMode::InlineString,
                ..
            }) => {
                let rest = &bytes[offset..];
                let len = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
                let literal = String::from_utf8_lossy(&rest[..len]).into_owned();
                offset += len + 1;
                if (origin as usize + offset) & 1 != 0 {
                    offset += 1;
                }
                format!("STDOUT {:?}", literal)
            }
            Ok(instr) => format_instruction(&instr),
            Err(_) => format!("??? ; 0x{:04X}", word),
        };

        output.push_str(&format!("{:05X}: {:04X}  {}\n", addr, word, text));
    }

    if offset < bytes.len() {
        let addr = origin.wrapping_add(offset as u32);
        let byte = bytes[offset];
        output.push_str(&format!("{:05X}: {:02X}    DB 0x{:02X}\n", addr, byte, byte));
    }

    output
}

/// Format a decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    match *instr {
        Instruction::Halt => "HALT".to_string(),
        Instruction::Nop => "NOP".to_string(),
        Instruction::Mov { dst, src } => format!("MOV {}, {}", dst, src),
        Instruction::Movi { dst, imm } => {
            let value = crate::cpu::decode::sign_extend_9(imm) as i16;
            format!("MOVI {}, {}", dst, value)
        }
        Instruction::Cmp { dst, src } => format!("CMP {}, {}", dst, src),
        Instruction::Jmp { target } => format!("JMP {}", target),
        Instruction::Jz { target } => format!("JZ {}", target),
        Instruction::Jnz { target } => format!("JNZ {}", target),
        Instruction::Push { src } => format!("PUSH {}", src),
        Instruction::Pop { dst } => format!("POP {}", dst),
        Instruction::Call { target } => format!("CALL {}", target),

        Instruction::Stdout { mode, reg } => match mode {
            OutputMode::InlineString => "STDOUT \"...\"".to_string(),
            OutputMode::Number => format!("STDOUT NUM {}", reg),
            OutputMode::StringAt => format!("STDOUT STR [{}]", reg),
            OutputMode::Char => format!("STDOUT CHR {}", reg),
            OutputMode::Reserved(bits) => format!("STDOUT ?{} {}", bits, reg),
        },
        Instruction::Stdin { mode, reg } => match mode {
            InputMode::Line => format!("STDIN LINE [{}]", reg),
            InputMode::Number => format!("STDIN NUM {}", reg),
        },

        Instruction::Ext { op, reg1, reg2 } => match op {
            ExtOp::Ret => "RET".to_string(),
            ExtOp::Load => format!("LOAD {}, [{}]", reg1, reg2),
            ExtOp::Store => format!("STORE [{}], {}", reg1, reg2),
            _ => format!("{} {}, {}", op.mnemonic(), reg1, reg2),
        },
    }
}
