//! Instruction encoding.
//!
//! Each public function returns the 32-bit word for one instruction. The
//! internal format helpers take raw register numbers so integer and float
//! registers share them.

use crate::regs::{Fpr, Gpr};

pub const OPCODE_LOAD: u8 = 0x03;
pub const OPCODE_LOAD_FP: u8 = 0x07;
pub const OPCODE_STORE: u8 = 0x23;
pub const OPCODE_STORE_FP: u8 = 0x27;
pub const OPCODE_OP: u8 = 0x33;
pub const OPCODE_OP_FP: u8 = 0x53;
pub const OPCODE_BRANCH: u8 = 0x63;

/// Encode an R-type instruction.
///
/// Format: `funct7 rs2 rs1 funct3 rd opcode`
fn encode_r(opcode: u8, rd: u8, rs1: u8, rs2: u8, funct3: u8, funct7: u8) -> u32 {
    let opcode = opcode as u32;
    let rd = (rd & 0x1f) as u32;
    let funct3 = (funct3 & 0x7) as u32;
    let rs1 = (rs1 & 0x1f) as u32;
    let rs2 = (rs2 & 0x1f) as u32;
    let funct7 = (funct7 & 0x7f) as u32;

    opcode | (rd << 7) | (funct3 << 12) | (rs1 << 15) | (rs2 << 20) | (funct7 << 25)
}

/// Encode an I-type instruction.
///
/// Format: `imm[11:0] rs1 funct3 rd opcode`
fn encode_i(opcode: u8, rd: u8, rs1: u8, imm: i32, funct3: u8) -> u32 {
    let opcode = opcode as u32;
    let rd = (rd & 0x1f) as u32;
    let funct3 = (funct3 & 0x7) as u32;
    let rs1 = (rs1 & 0x1f) as u32;
    let imm = (imm as u32) & 0xfff;

    opcode | (rd << 7) | (funct3 << 12) | (rs1 << 15) | (imm << 20)
}

/// Encode an S-type instruction.
///
/// Format: `imm[11:5] rs2 rs1 funct3 imm[4:0] opcode`
fn encode_s(opcode: u8, rs1: u8, rs2: u8, imm: i32, funct3: u8) -> u32 {
    let opcode = opcode as u32;
    let funct3 = (funct3 & 0x7) as u32;
    let rs1 = (rs1 & 0x1f) as u32;
    let rs2 = (rs2 & 0x1f) as u32;
    let imm = (imm as u32) & 0xfff;

    let imm_lo = imm & 0x1f;
    let imm_hi = (imm >> 5) & 0x7f;

    opcode | (imm_lo << 7) | (funct3 << 12) | (rs1 << 15) | (rs2 << 20) | (imm_hi << 25)
}

/// Encode a B-type instruction.
///
/// Format: `imm[12|10:5] rs2 rs1 funct3 imm[4:1|11] opcode`
fn encode_b(opcode: u8, rs1: u8, rs2: u8, imm: i32, funct3: u8) -> u32 {
    let opcode = opcode as u32;
    let funct3 = (funct3 & 0x7) as u32;
    let rs1 = (rs1 & 0x1f) as u32;
    let rs2 = (rs2 & 0x1f) as u32;
    let imm = imm as u32;

    let imm_12 = (imm >> 12) & 0x1;
    let imm_10_5 = (imm >> 5) & 0x3f;
    let imm_4_1 = (imm >> 1) & 0xf;
    let imm_11 = (imm >> 11) & 0x1;

    opcode
        | (imm_12 << 31)
        | (imm_10_5 << 25)
        | (funct3 << 12)
        | (rs1 << 15)
        | (rs2 << 20)
        | (imm_4_1 << 8)
        | (imm_11 << 7)
}

// Integer arithmetic

/// ADD: rd = rs1 + rs2
pub fn add(rd: Gpr, rs1: Gpr, rs2: Gpr) -> u32 {
    encode_r(OPCODE_OP, rd.num(), rs1.num(), rs2.num(), 0x0, 0x00)
}

/// SUB: rd = rs1 - rs2
pub fn sub(rd: Gpr, rs1: Gpr, rs2: Gpr) -> u32 {
    encode_r(OPCODE_OP, rd.num(), rs1.num(), rs2.num(), 0x0, 0x20)
}

// Integer load/store

/// LW: rd = mem[rs1 + imm]
pub fn lw(rd: Gpr, rs1: Gpr, imm: i32) -> u32 {
    encode_i(OPCODE_LOAD, rd.num(), rs1.num(), imm, 0x2)
}

/// SW: mem[rs1 + imm] = rs2
pub fn sw(rs1: Gpr, rs2: Gpr, imm: i32) -> u32 {
    encode_s(OPCODE_STORE, rs1.num(), rs2.num(), imm, 0x2)
}

// Control flow

/// BEQ: if rs1 == rs2, pc = pc + imm
pub fn beq(rs1: Gpr, rs2: Gpr, imm: i32) -> u32 {
    encode_b(OPCODE_BRANCH, rs1.num(), rs2.num(), imm, 0x0)
}

// Floating-point load/store (address base is an integer register)

/// FLW: fd = bits(mem[rs1 + imm])
pub fn flw(fd: Fpr, rs1: Gpr, imm: i32) -> u32 {
    encode_i(OPCODE_LOAD_FP, fd.num(), rs1.num(), imm, 0x2)
}

/// FSW: mem[rs1 + imm] = bits(fs2)
pub fn fsw(rs1: Gpr, fs2: Fpr, imm: i32) -> u32 {
    encode_s(OPCODE_STORE_FP, rs1.num(), fs2.num(), imm, 0x2)
}

// Floating-point arithmetic

/// FADD.S: fd = fs1 + fs2
pub fn fadd_s(fd: Fpr, fs1: Fpr, fs2: Fpr) -> u32 {
    encode_r(OPCODE_OP_FP, fd.num(), fs1.num(), fs2.num(), 0x0, 0x00)
}

/// FSUB.S: fd = fs1 - fs2
pub fn fsub_s(fd: Fpr, fs1: Fpr, fs2: Fpr) -> u32 {
    encode_r(OPCODE_OP_FP, fd.num(), fs1.num(), fs2.num(), 0x0, 0x04)
}

/// FMUL.S: fd = fs1 * fs2
pub fn fmul_s(fd: Fpr, fs1: Fpr, fs2: Fpr) -> u32 {
    encode_r(OPCODE_OP_FP, fd.num(), fs1.num(), fs2.num(), 0x0, 0x08)
}

/// FDIV.S: fd = fs1 / fs2
pub fn fdiv_s(fd: Fpr, fs1: Fpr, fs2: Fpr) -> u32 {
    encode_r(OPCODE_OP_FP, fd.num(), fs1.num(), fs2.num(), 0x0, 0x0c)
}

/// FSQRT.S: fd = sqrt(fs1)
pub fn fsqrt_s(fd: Fpr, fs1: Fpr) -> u32 {
    encode_r(OPCODE_OP_FP, fd.num(), fs1.num(), 0, 0x0, 0x2c)
}

// Conversions

/// FCVT.W.S: rd = (i32) fs1, truncating
pub fn fcvt_w_s(rd: Gpr, fs1: Fpr) -> u32 {
    encode_r(OPCODE_OP_FP, rd.num(), fs1.num(), 0, 0x0, 0x60)
}

/// FCVT.S.W: fd = (f32) rs1
pub fn fcvt_s_w(fd: Fpr, rs1: Gpr) -> u32 {
    encode_r(OPCODE_OP_FP, fd.num(), rs1.num(), 0, 0x0, 0x68)
}
