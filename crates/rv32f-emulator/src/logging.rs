//! Instruction trace kept by the emulator.

use core::fmt;

use rv32f_encoder::{disassemble_instruction, Fpr, Gpr};

use crate::executor::UnsupportedKind;

/// Logging verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// No logging.
    #[default]
    None,
    /// Only unsupported-instruction diagnostics.
    Errors,
    /// Every executed step.
    Instructions,
}

/// State change made by one step.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// ADD, SUB
    IntAlu {
        rd: Gpr,
        rs1_val: i32,
        rs2_val: i32,
        rd_old: i32,
        rd_new: i32,
    },
    /// LW
    Load {
        rd: Gpr,
        addr: u32,
        rd_old: i32,
        rd_new: i32,
    },
    /// SW
    Store {
        addr: u32,
        mem_old: u32,
        mem_new: u32,
    },
    /// BEQ
    Branch {
        rs1_val: i32,
        rs2_val: i32,
        target_pc: Option<u32>, // Some if taken
    },
    /// FLW
    FloatLoad {
        fd: Fpr,
        addr: u32,
        fd_old: f32,
        bits: u32,
    },
    /// FSW
    FloatStore {
        addr: u32,
        mem_old: u32,
        bits: u32,
    },
    /// FADD.S, FSUB.S, FMUL.S, FDIV.S, FSQRT.S
    FloatAlu {
        fd: Fpr,
        fs1_val: f32,
        fs2_val: Option<f32>, // None for FSQRT.S
        fd_old: f32,
        fd_new: f32,
    },
    /// FCVT.W.S
    FloatToInt {
        rd: Gpr,
        fs1_val: f32,
        rd_old: i32,
        rd_new: i32,
    },
    /// FCVT.S.W
    IntToFloat {
        fd: Fpr,
        rs1_val: i32,
        fd_old: f32,
        fd_new: f32,
    },
    /// No state change; the word has no operation in the dispatch table.
    Unsupported(UnsupportedKind),
}

/// Log entry for a single step.
#[derive(Debug, Clone, PartialEq)]
pub struct InstLog {
    pub cycle: u64,
    pub pc: u32,
    pub instruction: u32,
    pub effect: Effect,
}

impl InstLog {
    pub fn new(pc: u32, instruction: u32, effect: Effect) -> Self {
        Self {
            cycle: 0,
            pc,
            instruction,
            effect,
        }
    }

    /// Set the cycle count for this log entry.
    pub fn with_cycle(mut self, cycle: u64) -> Self {
        self.cycle = cycle;
        self
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self.effect, Effect::Unsupported(_))
    }
}

impl fmt::Display for InstLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:4}] 0x{:08x}: {}",
            self.cycle,
            self.pc,
            disassemble_instruction(self.instruction)
        )?;

        match &self.effect {
            Effect::IntAlu {
                rd,
                rs1_val,
                rs2_val,
                rd_old,
                rd_new,
            } => {
                write!(f, "\n    {}: {} -> {}", rd, rd_old, rd_new)?;
                write!(f, " (rs1={}, rs2={})", rs1_val, rs2_val)?;
            }
            Effect::Load {
                rd,
                addr,
                rd_old,
                rd_new,
            } => {
                write!(f, "\n    {}: {} -> {}", rd, rd_old, rd_new)?;
                write!(f, " (mem[0x{:08x}])", addr)?;
            }
            Effect::Store {
                addr,
                mem_old,
                mem_new,
            } => {
                write!(
                    f,
                    "\n    mem[0x{:08x}]: 0x{:08x} -> 0x{:08x}",
                    addr, mem_old, mem_new
                )?;
            }
            Effect::Branch {
                rs1_val,
                rs2_val,
                target_pc,
            } => {
                match target_pc {
                    Some(target) => {
                        write!(f, "\n    branch taken: 0x{:08x} -> 0x{:08x}", self.pc, target)?
                    }
                    None => write!(f, "\n    branch not taken")?,
                }
                write!(f, " (rs1={}, rs2={})", rs1_val, rs2_val)?;
            }
            Effect::FloatLoad {
                fd,
                addr,
                fd_old,
                bits,
            } => {
                write!(
                    f,
                    "\n    {}: {} -> {} (0x{:08x} from mem[0x{:08x}])",
                    fd,
                    fd_old,
                    f32::from_bits(*bits),
                    bits,
                    addr
                )?;
            }
            Effect::FloatStore {
                addr,
                mem_old,
                bits,
            } => {
                write!(
                    f,
                    "\n    mem[0x{:08x}]: 0x{:08x} -> 0x{:08x} ({})",
                    addr,
                    mem_old,
                    bits,
                    f32::from_bits(*bits)
                )?;
            }
            Effect::FloatAlu {
                fd,
                fs1_val,
                fs2_val,
                fd_old,
                fd_new,
            } => {
                write!(f, "\n    {}: {} -> {}", fd, fd_old, fd_new)?;
                match fs2_val {
                    Some(fs2_val) => write!(f, " (fs1={}, fs2={})", fs1_val, fs2_val)?,
                    None => write!(f, " (fs1={})", fs1_val)?,
                }
            }
            Effect::FloatToInt {
                rd,
                fs1_val,
                rd_old,
                rd_new,
            } => {
                write!(f, "\n    {}: {} -> {} (fs1={})", rd, rd_old, rd_new, fs1_val)?;
            }
            Effect::IntToFloat {
                fd,
                rs1_val,
                fd_old,
                fd_new,
            } => {
                write!(f, "\n    {}: {} -> {} (rs1={})", fd, fd_old, fd_new, rs1_val)?;
            }
            Effect::Unsupported(kind) => {
                write!(f, "\n    unsupported: {}", kind)?;
            }
        }

        Ok(())
    }
}
