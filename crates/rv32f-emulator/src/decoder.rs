//! Instruction decoder.
//!
//! Pure bit-field extraction. Whether a combination of fields means anything
//! is decided by the executor's dispatch table, so decoding never fails.

use rv32f_encoder::{
    OPCODE_BRANCH, OPCODE_LOAD, OPCODE_LOAD_FP, OPCODE_OP, OPCODE_OP_FP, OPCODE_STORE,
    OPCODE_STORE_FP,
};

/// Immediate layout used to reconstruct `imm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// No immediate; `imm` is 0.
    R,
    /// `inst[31:20]`, sign bit 31.
    I,
    /// `inst[31:25] ++ inst[11:7]`, sign bit 31.
    S,
    /// 13-bit branch offset with bit 0 clear, sign bit 31.
    B,
}

impl Format {
    /// Immediate layout for an opcode. Opcodes outside the supported classes
    /// get the I layout.
    pub fn for_opcode(opcode: u8) -> Self {
        match opcode {
            OPCODE_OP | OPCODE_OP_FP => Format::R,
            OPCODE_LOAD | OPCODE_LOAD_FP => Format::I,
            OPCODE_STORE | OPCODE_STORE_FP => Format::S,
            OPCODE_BRANCH => Format::B,
            _ => Format::I,
        }
    }
}

/// Fields of one instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub word: u32,
    pub opcode: u8,
    pub rd: u8,
    pub funct3: u8,
    pub rs1: u8,
    pub rs2: u8,
    pub funct7: u8,
    pub format: Format,
    pub imm: i32,
}

/// I-type immediate: bits [31:20], arithmetic shift of the whole word.
pub fn imm_i(inst: u32) -> i32 {
    (inst as i32) >> 20
}

/// S-type immediate: bits [31:25] (sign-extended) over bits [11:7].
pub fn imm_s(inst: u32) -> i32 {
    (((inst as i32) >> 25) << 5) | ((inst >> 7) & 0x1f) as i32
}

/// B-type offset: inst[31] -> 12, inst[7] -> 11, inst[30:25] -> 10:5,
/// inst[11:8] -> 4:1, bit 0 always clear. Sign-extended from bit 12.
pub fn imm_b(inst: u32) -> i32 {
    let imm = ((inst >> 19) & 0x1000)
        | ((inst << 4) & 0x800)
        | ((inst >> 20) & 0x7e0)
        | ((inst >> 7) & 0x1e);
    ((imm << 19) as i32) >> 19
}

/// Decode a 32-bit instruction word.
pub fn decode(inst: u32) -> DecodedInstruction {
    let opcode = (inst & 0x7f) as u8;
    let format = Format::for_opcode(opcode);
    let imm = match format {
        Format::R => 0,
        Format::I => imm_i(inst),
        Format::S => imm_s(inst),
        Format::B => imm_b(inst),
    };

    DecodedInstruction {
        word: inst,
        opcode,
        rd: ((inst >> 7) & 0x1f) as u8,
        funct3: ((inst >> 12) & 0x7) as u8,
        rs1: ((inst >> 15) & 0x1f) as u8,
        rs2: ((inst >> 20) & 0x1f) as u8,
        funct7: ((inst >> 25) & 0x7f) as u8,
        format,
        imm,
    }
}
