//! Helper functions for testing RV32 code.
//!
//! The instruction subset has no way to materialise constants, so every
//! helper takes a `setup` closure that seeds registers or memory after the
//! image is loaded and before the first step.

use rv32f_encoder::{assemble_code, AsmError, Fpr, Gpr};

use crate::{
    emulator::{Rv32fEmulator, StepResult, PROGRAM_BASE},
    error::{EmulatorError, MemoryAccessKind},
    executor::UnsupportedKind,
    logging::LogLevel,
};

/// Assemble `asm` at `PROGRAM_BASE` and load it into a logging emulator.
pub fn emulator_from_asm(asm: &str) -> Result<Rv32fEmulator, AsmError> {
    let code = assemble_code(asm, PROGRAM_BASE)?;
    let mut emu = Rv32fEmulator::new().with_log_level(LogLevel::Instructions);
    emu.load_image(&code);
    Ok(emu)
}

/// Step `steps` times, stopping at the first error.
pub fn step_n(emu: &mut Rv32fEmulator, steps: usize) -> Result<Vec<StepResult>, EmulatorError> {
    let mut results = Vec::with_capacity(steps);
    for _ in 0..steps {
        results.push(emu.step()?);
    }
    Ok(results)
}

fn prepare<F>(asm: &str, setup: F) -> Rv32fEmulator
where
    F: FnOnce(&mut Rv32fEmulator),
{
    let mut emu = match emulator_from_asm(asm) {
        Ok(emu) => emu,
        Err(e) => panic!("{}\n\nCode:\n{}", e, asm),
    };
    setup(&mut emu);
    emu
}

/// Format a failure with disassembly and logs.
fn format_failure(emu: &Rv32fEmulator, message: &str, error_pc: Option<u32>) -> String {
    format!(
        "=== RV32 Execution Failure ===\n\n{}\n\n{}\n{}",
        message,
        emu.format_debug_info(error_pc, 10),
        emu.dump_state()
    )
}

/// Expect `steps` steps to run without error, returning the emulator.
pub fn expect_ok<F>(asm: &str, setup: F, steps: usize) -> Rv32fEmulator
where
    F: FnOnce(&mut Rv32fEmulator),
{
    let mut emu = prepare(asm, setup);
    if let Err(e) = step_n(&mut emu, steps) {
        panic!("{}", format_failure(&emu, &e.to_string(), e.pc()));
    }
    emu
}

/// Expect an integer register to hold `expected` after `steps` steps.
pub fn expect_register<F>(asm: &str, setup: F, steps: usize, reg: Gpr, expected: i32)
where
    F: FnOnce(&mut Rv32fEmulator),
{
    let emu = expect_ok(asm, setup, steps);
    let actual = emu.get_register(reg);
    if actual != expected {
        panic!(
            "{}",
            format_failure(
                &emu,
                &format!("Register {} mismatch: expected {}, got {}", reg, expected, actual),
                None
            )
        );
    }
}

/// Expect a float register to hold exactly the bit pattern `expected`.
pub fn expect_fregister_bits<F>(asm: &str, setup: F, steps: usize, reg: Fpr, expected: u32)
where
    F: FnOnce(&mut Rv32fEmulator),
{
    let emu = expect_ok(asm, setup, steps);
    let actual = emu.get_fregister(reg).to_bits();
    if actual != expected {
        panic!(
            "{}",
            format_failure(
                &emu,
                &format!(
                    "Register {} mismatch: expected 0x{:08x}, got 0x{:08x}",
                    reg, expected, actual
                ),
                None
            )
        );
    }
}

/// Expect one of the first `steps` steps to fail with a memory fault of
/// the given kind. Returns the emulator as it was after the fault.
pub fn expect_memory_fault<F>(
    asm: &str,
    setup: F,
    steps: usize,
    kind: MemoryAccessKind,
) -> Rv32fEmulator
where
    F: FnOnce(&mut Rv32fEmulator),
{
    let mut emu = prepare(asm, setup);
    match step_n(&mut emu, steps) {
        Ok(_) => panic!(
            "{}",
            format_failure(&emu, "Expected memory fault but execution succeeded", None)
        ),
        Err(EmulatorError::MemoryFault { kind: actual, .. }) if actual == kind => emu,
        Err(e) => panic!(
            "{}",
            format_failure(
                &emu,
                &format!("Expected {} fault, got: {}", kind, e),
                e.pc()
            )
        ),
    }
}

/// Expect a single raw word to be reported as unsupported and leave
/// everything but the PC unchanged.
pub fn expect_unsupported(word: u32) -> UnsupportedKind {
    let mut emu = Rv32fEmulator::new().with_log_level(LogLevel::Instructions);
    emu.load_image(&word.to_le_bytes());
    let before = emu.clone();

    let result = match emu.step() {
        Ok(result) => result,
        Err(e) => panic!("{}", format_failure(&emu, &e.to_string(), e.pc())),
    };
    let diag = match result {
        StepResult::Unsupported(diag) => diag,
        other => panic!(
            "{}",
            format_failure(
                &emu,
                &format!("Expected 0x{:08x} to be unsupported, got {:?}", word, other),
                Some(PROGRAM_BASE)
            )
        ),
    };

    assert_eq!(diag.pc, PROGRAM_BASE);
    assert_eq!(diag.instruction, word);
    assert_eq!(emu.pc(), PROGRAM_BASE + 4);
    assert_eq!(emu.registers(), before.registers());
    assert_eq!(
        emu.fregisters().map(f32::to_bits),
        before.fregisters().map(f32::to_bits)
    );
    assert_eq!(emu.memory(), before.memory());
    diag.kind
}
