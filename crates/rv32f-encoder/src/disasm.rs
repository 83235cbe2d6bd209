//! Instruction disassembly.

use alloc::{format, string::String};

use crate::regs::{Fpr, Gpr};

/// Disassemble a single instruction word.
///
/// Returns a human-readable string like "add a0, a1, a2" or "flw f1, 0(a0)".
/// Words outside the supported subset render as `unknown ...`.
pub fn disassemble_instruction(inst: u32) -> String {
    let opcode = inst & 0x7f;
    let rd = ((inst >> 7) & 0x1f) as u8;
    let funct3 = ((inst >> 12) & 0x7) as u8;
    let rs1 = ((inst >> 15) & 0x1f) as u8;
    let rs2 = ((inst >> 20) & 0x1f) as u8;
    let funct7 = ((inst >> 25) & 0x7f) as u8;

    let imm_i = (inst as i32) >> 20;
    let imm_s = (((inst as i32) >> 25) << 5) | ((inst >> 7) & 0x1f) as i32;
    let imm_b = {
        let imm = ((inst >> 19) & 0x1000)
            | ((inst << 4) & 0x800)
            | ((inst >> 20) & 0x7e0)
            | ((inst >> 7) & 0x1e);
        ((imm << 19) as i32) >> 19
    };

    let x = |n: u8| Gpr::new(n);
    let f = |n: u8| Fpr::new(n);

    match opcode {
        0x33 => match (funct3, funct7) {
            (0x0, 0x00) => format!("add {}, {}, {}", x(rd), x(rs1), x(rs2)),
            (0x0, 0x20) => format!("sub {}, {}, {}", x(rd), x(rs1), x(rs2)),
            _ => format!("unknown_r_type 0x{:08x}", inst),
        },
        0x03 => match funct3 {
            0x2 => format!("lw {}, {}({})", x(rd), imm_i, x(rs1)),
            _ => format!("unknown_load 0x{:08x}", inst),
        },
        0x23 => match funct3 {
            0x2 => format!("sw {}, {}({})", x(rs2), imm_s, x(rs1)),
            _ => format!("unknown_store 0x{:08x}", inst),
        },
        0x63 => match funct3 {
            0x0 => format!("beq {}, {}, {}", x(rs1), x(rs2), imm_b),
            _ => format!("unknown_branch 0x{:08x}", inst),
        },
        0x07 => match funct3 {
            0x2 => format!("flw {}, {}({})", f(rd), imm_i, x(rs1)),
            _ => format!("unknown_fp_load 0x{:08x}", inst),
        },
        0x27 => match funct3 {
            0x2 => format!("fsw {}, {}({})", f(rs2), imm_s, x(rs1)),
            _ => format!("unknown_fp_store 0x{:08x}", inst),
        },
        0x53 => match (funct3, funct7) {
            (0x0, 0x00) => format!("fadd.s {}, {}, {}", f(rd), f(rs1), f(rs2)),
            (0x0, 0x04) => format!("fsub.s {}, {}, {}", f(rd), f(rs1), f(rs2)),
            (0x0, 0x08) => format!("fmul.s {}, {}, {}", f(rd), f(rs1), f(rs2)),
            (0x0, 0x0c) => format!("fdiv.s {}, {}, {}", f(rd), f(rs1), f(rs2)),
            (0x0, 0x2c) => format!("fsqrt.s {}, {}", f(rd), f(rs1)),
            (0x0, 0x60) => format!("fcvt.w.s {}, {}", x(rd), f(rs1)),
            (0x0, 0x68) => format!("fcvt.s.w {}, {}", f(rd), x(rs1)),
            _ => format!("unknown_fp_op 0x{:08x}", inst),
        },
        _ => format!("unknown 0x{:08x} (opcode=0x{:02x})", inst, opcode),
    }
}

/// Disassemble a code buffer.
///
/// Returns one line per instruction, showing its address (starting at
/// `base`) and the disassembled text.
pub fn disassemble_code(code: &[u8], base: u32) -> String {
    let mut result = String::new();
    let mut chunks = code.chunks_exact(4);
    let mut addr = base;

    for chunk in &mut chunks {
        let inst = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        result.push_str(&format!("0x{:08x}: {}\n", addr, disassemble_instruction(inst)));
        addr = addr.wrapping_add(4);
    }

    if !chunks.remainder().is_empty() {
        result.push_str(&format!("0x{:08x}: <incomplete instruction>\n", addr));
    }

    result
}
