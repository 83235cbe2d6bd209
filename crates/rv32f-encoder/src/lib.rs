//! Instruction encoding for the RV32I/RV32F subset understood by `rv32f-emulator`.
//!
//! This crate provides functions to encode instructions into their binary
//! representation, render them back as text, and assemble small programs
//! from source.

#![no_std]

extern crate alloc;

mod asm;
mod disasm;
mod encode;
mod regs;

pub use asm::{assemble_code, assemble_instruction, AsmError, DEFAULT_BASE};
pub use disasm::{disassemble_code, disassemble_instruction};
pub use encode::*;
pub use regs::{Fpr, Gpr};
