//! Reference interpreter for a subset of RV32I plus a handful of RV32F
//! single-precision operations.
//!
//! The engine owns the whole machine state (PC, integer and float register
//! files, flat byte memory) and exposes `reset`, `load_image` and `step`.
//! Anything that drives it repeatedly lives outside this crate.

mod decoder;
mod emulator;
mod error;
mod executor;
mod logging;
mod memory;

pub mod helpers;

pub use decoder::{decode, imm_b, imm_i, imm_s, DecodedInstruction, Format};
pub use emulator::{
    Rv32fEmulator, StepResult, UnsupportedInstruction, DEFAULT_LOG_CAPACITY, PROGRAM_BASE,
};
pub use error::{EmulatorError, MemoryAccessKind};
pub use executor::{dispatch, Op, UnsupportedKind};
pub use logging::{Effect, InstLog, LogLevel};
pub use memory::{Memory, DEFAULT_MEMORY_SIZE};
pub use rv32f_encoder::{Fpr, Gpr};
