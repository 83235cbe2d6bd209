//! Dispatch table and per-instruction handlers.

use core::fmt;

use rv32f_encoder::{
    Fpr, Gpr, OPCODE_BRANCH, OPCODE_LOAD, OPCODE_LOAD_FP, OPCODE_OP, OPCODE_OP_FP, OPCODE_STORE,
    OPCODE_STORE_FP,
};

use crate::decoder::DecodedInstruction;
use crate::error::EmulatorError;
use crate::logging::{Effect, InstLog};
use crate::memory::Memory;

/// Operation selected by `(opcode, funct3, funct7)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add { rd: Gpr, rs1: Gpr, rs2: Gpr },
    Sub { rd: Gpr, rs1: Gpr, rs2: Gpr },
    Lw { rd: Gpr, rs1: Gpr, imm: i32 },
    Sw { rs1: Gpr, rs2: Gpr, imm: i32 },
    Beq { rs1: Gpr, rs2: Gpr, offset: i32 },
    Flw { fd: Fpr, rs1: Gpr, imm: i32 },
    Fsw { rs1: Gpr, fs2: Fpr, imm: i32 },
    FaddS { fd: Fpr, fs1: Fpr, fs2: Fpr },
    FsubS { fd: Fpr, fs1: Fpr, fs2: Fpr },
    FmulS { fd: Fpr, fs1: Fpr, fs2: Fpr },
    FdivS { fd: Fpr, fs1: Fpr, fs2: Fpr },
    FsqrtS { fd: Fpr, fs1: Fpr },
    FcvtWS { rd: Gpr, fs1: Fpr },
    FcvtSW { fd: Fpr, rs1: Gpr },
}

/// Why a word has no entry in the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedKind {
    /// The opcode is not one of the supported classes.
    UnknownOpcode { opcode: u8 },
    /// The opcode is known but funct3/funct7 select nothing.
    UnmatchedSubOperation { opcode: u8, funct3: u8, funct7: u8 },
}

impl fmt::Display for UnsupportedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnsupportedKind::UnknownOpcode { opcode } => {
                write!(f, "unknown opcode 0x{:02x}", opcode)
            }
            UnsupportedKind::UnmatchedSubOperation {
                opcode,
                funct3,
                funct7,
            } => write!(
                f,
                "no operation for opcode 0x{:02x} with funct3=0x{:x}, funct7=0x{:02x}",
                opcode, funct3, funct7
            ),
        }
    }
}

/// Look up the operation for a decoded word.
pub fn dispatch(inst: &DecodedInstruction) -> Result<Op, UnsupportedKind> {
    let x = Gpr::new;
    let f = Fpr::new;
    let (rd, rs1, rs2, imm) = (inst.rd, inst.rs1, inst.rs2, inst.imm);

    let op = match (inst.opcode, inst.funct3, inst.funct7) {
        (OPCODE_OP, 0x0, 0x00) => Op::Add { rd: x(rd), rs1: x(rs1), rs2: x(rs2) },
        (OPCODE_OP, 0x0, 0x20) => Op::Sub { rd: x(rd), rs1: x(rs1), rs2: x(rs2) },
        (OPCODE_LOAD, 0x2, _) => Op::Lw { rd: x(rd), rs1: x(rs1), imm },
        (OPCODE_STORE, 0x2, _) => Op::Sw { rs1: x(rs1), rs2: x(rs2), imm },
        (OPCODE_BRANCH, 0x0, _) => Op::Beq { rs1: x(rs1), rs2: x(rs2), offset: imm },
        (OPCODE_LOAD_FP, 0x2, _) => Op::Flw { fd: f(rd), rs1: x(rs1), imm },
        (OPCODE_STORE_FP, 0x2, _) => Op::Fsw { rs1: x(rs1), fs2: f(rs2), imm },
        (OPCODE_OP_FP, 0x0, 0x00) => Op::FaddS { fd: f(rd), fs1: f(rs1), fs2: f(rs2) },
        (OPCODE_OP_FP, 0x0, 0x04) => Op::FsubS { fd: f(rd), fs1: f(rs1), fs2: f(rs2) },
        (OPCODE_OP_FP, 0x0, 0x08) => Op::FmulS { fd: f(rd), fs1: f(rs1), fs2: f(rs2) },
        (OPCODE_OP_FP, 0x0, 0x0c) => Op::FdivS { fd: f(rd), fs1: f(rs1), fs2: f(rs2) },
        (OPCODE_OP_FP, 0x0, 0x2c) => Op::FsqrtS { fd: f(rd), fs1: f(rs1) },
        (OPCODE_OP_FP, 0x0, 0x60) => Op::FcvtWS { rd: x(rd), fs1: f(rs1) },
        (OPCODE_OP_FP, 0x0, 0x68) => Op::FcvtSW { fd: f(rd), rs1: x(rs1) },
        (
            OPCODE_OP | OPCODE_LOAD | OPCODE_STORE | OPCODE_BRANCH | OPCODE_LOAD_FP
            | OPCODE_STORE_FP | OPCODE_OP_FP,
            funct3,
            funct7,
        ) => {
            return Err(UnsupportedKind::UnmatchedSubOperation {
                opcode: inst.opcode,
                funct3,
                funct7,
            })
        }
        (opcode, _, _) => return Err(UnsupportedKind::UnknownOpcode { opcode }),
    };

    Ok(op)
}

/// Result of executing a single instruction.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// New PC value (None means PC += 4)
    pub new_pc: Option<u32>,
    /// Log entry for this instruction
    pub log: InstLog,
}

/// Effective address: integer base register plus immediate, wrapping.
fn effective_address(regs: &[i32; 32], base: Gpr, imm: i32) -> u32 {
    (regs[base.idx()] as u32).wrapping_add(imm as u32)
}

fn float_alu(fregs: &mut [f32; 32], fd: Fpr, fs1: Fpr, fs2: Option<Fpr>, value: f32) -> Effect {
    let fd_old = fregs[fd.idx()];
    let fs1_val = fregs[fs1.idx()];
    let fs2_val = fs2.map(|r| fregs[r.idx()]);
    fregs[fd.idx()] = value;
    Effect::FloatAlu {
        fd,
        fs1_val,
        fs2_val,
        fd_old,
        fd_new: value,
    }
}

/// Execute an operation against the machine state.
///
/// Register 0 is an ordinary register: it is read and written like the
/// others. On a memory fault nothing has been modified.
pub fn execute_instruction(
    op: Op,
    pc: u32,
    instruction: u32,
    regs: &mut [i32; 32],
    fregs: &mut [f32; 32],
    memory: &mut Memory,
) -> Result<ExecutionResult, EmulatorError> {
    let mut new_pc: Option<u32> = None;

    let effect = match op {
        Op::Add { rd, rs1, rs2 } | Op::Sub { rd, rs1, rs2 } => {
            let rs1_val = regs[rs1.idx()];
            let rs2_val = regs[rs2.idx()];
            let rd_new = match op {
                Op::Add { .. } => rs1_val.wrapping_add(rs2_val),
                _ => rs1_val.wrapping_sub(rs2_val),
            };
            let rd_old = core::mem::replace(&mut regs[rd.idx()], rd_new);
            Effect::IntAlu {
                rd,
                rs1_val,
                rs2_val,
                rd_old,
                rd_new,
            }
        }
        Op::Lw { rd, rs1, imm } => {
            let addr = effective_address(regs, rs1, imm);
            let rd_new = memory.read_word(addr)? as i32;
            let rd_old = core::mem::replace(&mut regs[rd.idx()], rd_new);
            Effect::Load {
                rd,
                addr,
                rd_old,
                rd_new,
            }
        }
        Op::Sw { rs1, rs2, imm } => {
            let addr = effective_address(regs, rs1, imm);
            let mem_new = regs[rs2.idx()] as u32;
            let mem_old = memory.write_word(addr, mem_new)?;
            Effect::Store {
                addr,
                mem_old,
                mem_new,
            }
        }
        Op::Beq { rs1, rs2, offset } => {
            let rs1_val = regs[rs1.idx()];
            let rs2_val = regs[rs2.idx()];
            if rs1_val == rs2_val {
                new_pc = Some(pc.wrapping_add(offset as u32));
            }
            Effect::Branch {
                rs1_val,
                rs2_val,
                target_pc: new_pc,
            }
        }
        Op::Flw { fd, rs1, imm } => {
            let addr = effective_address(regs, rs1, imm);
            let bits = memory.read_word(addr)?;
            let fd_old = core::mem::replace(&mut fregs[fd.idx()], f32::from_bits(bits));
            Effect::FloatLoad {
                fd,
                addr,
                fd_old,
                bits,
            }
        }
        Op::Fsw { rs1, fs2, imm } => {
            let addr = effective_address(regs, rs1, imm);
            let bits = fregs[fs2.idx()].to_bits();
            let mem_old = memory.write_word(addr, bits)?;
            Effect::FloatStore {
                addr,
                mem_old,
                bits,
            }
        }
        Op::FaddS { fd, fs1, fs2 } => {
            let value = fregs[fs1.idx()] + fregs[fs2.idx()];
            float_alu(fregs, fd, fs1, Some(fs2), value)
        }
        Op::FsubS { fd, fs1, fs2 } => {
            let value = fregs[fs1.idx()] - fregs[fs2.idx()];
            float_alu(fregs, fd, fs1, Some(fs2), value)
        }
        Op::FmulS { fd, fs1, fs2 } => {
            let value = fregs[fs1.idx()] * fregs[fs2.idx()];
            float_alu(fregs, fd, fs1, Some(fs2), value)
        }
        Op::FdivS { fd, fs1, fs2 } => {
            let value = fregs[fs1.idx()] / fregs[fs2.idx()];
            float_alu(fregs, fd, fs1, Some(fs2), value)
        }
        Op::FsqrtS { fd, fs1 } => {
            // negative inputs give NaN
            let value = fregs[fs1.idx()].sqrt();
            float_alu(fregs, fd, fs1, None, value)
        }
        Op::FcvtWS { rd, fs1 } => {
            let fs1_val = fregs[fs1.idx()];
            // truncates toward zero; saturates out of range, NaN -> 0
            let rd_new = fs1_val as i32;
            let rd_old = core::mem::replace(&mut regs[rd.idx()], rd_new);
            Effect::FloatToInt {
                rd,
                fs1_val,
                rd_old,
                rd_new,
            }
        }
        Op::FcvtSW { fd, rs1 } => {
            let rs1_val = regs[rs1.idx()];
            let fd_new = rs1_val as f32;
            let fd_old = core::mem::replace(&mut fregs[fd.idx()], fd_new);
            Effect::IntToFloat {
                fd,
                rs1_val,
                fd_old,
                fd_new,
            }
        }
    };

    Ok(ExecutionResult {
        new_pc,
        log: InstLog::new(pc, instruction, effect),
    })
}
