//! Basic tests for the RV32F emulator.

use rv32f_emulator::{
    helpers::expect_unsupported, LogLevel, Rv32fEmulator, StepResult, UnsupportedKind,
    PROGRAM_BASE,
};
use rv32f_encoder::{add, beq, sub, Gpr};

fn image(words: &[u32]) -> Vec<u8> {
    let mut code = Vec::new();
    for word in words {
        code.extend_from_slice(&word.to_le_bytes());
    }
    code
}

#[test]
fn test_add_with_register_zero() {
    let mut emu = Rv32fEmulator::new();
    // add x1, x0, x0
    emu.load_image(&image(&[add(Gpr::new(1), Gpr::new(0), Gpr::new(0))]));
    emu.set_register(Gpr::ZERO, 5);

    let result = emu.step().expect("Execution failed");
    assert_eq!(result, StepResult::Executed);
    assert_eq!(emu.get_register(Gpr::new(1)), 10, "x0 is not hardwired");
    assert_eq!(emu.pc(), 0x1004);
}

#[test]
fn test_add_leaves_other_state_alone() {
    let mut emu = Rv32fEmulator::new();
    emu.load_image(&image(&[add(Gpr::A0, Gpr::A1, Gpr::A2)]));
    for i in 0..32 {
        emu.set_register(Gpr::new(i), i as i32 * 3);
    }
    let memory_before = emu.memory().clone();
    let mut expected = *emu.registers();
    expected[10] = 11 * 3 + 12 * 3;

    emu.step().expect("Execution failed");
    assert_eq!(emu.registers(), &expected);
    assert_eq!(emu.memory(), &memory_before);
}

#[test]
fn test_add_sub_wrap() {
    let mut emu = Rv32fEmulator::new();
    emu.load_image(&image(&[
        add(Gpr::A0, Gpr::A1, Gpr::A2),
        sub(Gpr::A3, Gpr::A4, Gpr::A5),
    ]));
    emu.set_register(Gpr::A1, i32::MAX);
    emu.set_register(Gpr::A2, 1);
    emu.set_register(Gpr::A4, i32::MIN);
    emu.set_register(Gpr::A5, 1);

    emu.step().expect("Execution failed");
    emu.step().expect("Execution failed");
    assert_eq!(emu.get_register(Gpr::A0), i32::MIN);
    assert_eq!(emu.get_register(Gpr::A3), i32::MAX);
    assert_eq!(emu.pc(), PROGRAM_BASE + 8);
}

#[test]
fn test_sub_instruction() {
    let mut emu = Rv32fEmulator::new();
    emu.load_image(&image(&[sub(Gpr::A0, Gpr::A0, Gpr::A1)]));
    emu.set_register(Gpr::A0, 20);
    emu.set_register(Gpr::A1, 7);

    emu.step().expect("Execution failed");
    assert_eq!(emu.get_register(Gpr::A0), 13, "Expected 20 - 7 = 13");
}

#[test]
fn test_beq_taken_skips_increment() {
    let mut emu = Rv32fEmulator::new();
    emu.load_image(&image(&[beq(Gpr::A0, Gpr::A1, 12)]));
    emu.set_register(Gpr::A0, -7);
    emu.set_register(Gpr::A1, -7);

    let result = emu.step().expect("Execution failed");
    assert_eq!(
        result,
        StepResult::Branched {
            from: PROGRAM_BASE,
            to: PROGRAM_BASE + 12
        }
    );
    assert_eq!(emu.pc(), PROGRAM_BASE + 12);
}

#[test]
fn test_beq_not_taken() {
    let mut emu = Rv32fEmulator::new();
    emu.load_image(&image(&[beq(Gpr::A0, Gpr::A1, 12)]));
    emu.set_register(Gpr::A0, 1);
    emu.set_register(Gpr::A1, 2);
    let regs_before = *emu.registers();

    let result = emu.step().expect("Execution failed");
    assert_eq!(result, StepResult::Executed);
    assert_eq!(emu.pc(), PROGRAM_BASE + 4);
    assert_eq!(emu.registers(), &regs_before);
}

#[test]
fn test_beq_backward_loop() {
    // add a0, a0, a1
    // beq zero, zero, -4
    let mut emu = Rv32fEmulator::new();
    emu.load_image(&image(&[
        add(Gpr::A0, Gpr::A0, Gpr::A1),
        beq(Gpr::ZERO, Gpr::ZERO, -4),
    ]));
    emu.set_register(Gpr::A1, 3);

    for _ in 0..6 {
        emu.step().expect("Execution failed");
    }
    assert_eq!(emu.get_register(Gpr::A0), 9);
    assert_eq!(emu.pc(), PROGRAM_BASE);
    assert_eq!(emu.instruction_count(), 6);
}

#[test]
fn test_beq_to_self() {
    let mut emu = Rv32fEmulator::new();
    emu.load_image(&image(&[beq(Gpr::ZERO, Gpr::ZERO, 0)]));
    for _ in 0..3 {
        emu.step().expect("Execution failed");
        assert_eq!(emu.pc(), PROGRAM_BASE);
    }
}

#[test]
fn test_unknown_opcode_is_not_fatal() {
    assert_eq!(
        expect_unsupported(0x0000_0001),
        UnsupportedKind::UnknownOpcode { opcode: 0x01 }
    );
    // jal is outside the subset
    assert_eq!(
        expect_unsupported(0x0000_006f),
        UnsupportedKind::UnknownOpcode { opcode: 0x6f }
    );
}

#[test]
fn test_unmatched_sub_operation_is_reported() {
    // mul a0, a1, a2
    assert_eq!(
        expect_unsupported(0x02c5_8533),
        UnsupportedKind::UnmatchedSubOperation {
            opcode: 0x33,
            funct3: 0,
            funct7: 0x01
        }
    );
    // bne a0, a1, 0
    assert_eq!(
        expect_unsupported(beq(Gpr::A0, Gpr::A1, 0) | (1 << 12)),
        UnsupportedKind::UnmatchedSubOperation {
            opcode: 0x63,
            funct3: 1,
            funct7: 0
        }
    );
}

#[test]
fn test_execution_continues_after_unsupported() {
    let mut emu = Rv32fEmulator::new().with_log_level(LogLevel::Errors);
    emu.load_image(&image(&[0xffff_ffff, add(Gpr::A0, Gpr::A1, Gpr::A1)]));
    emu.set_register(Gpr::A1, 4);

    let diag = match emu.step().expect("Execution failed") {
        StepResult::Unsupported(diag) => diag,
        other => panic!("expected unsupported, got {:?}", other),
    };
    assert_eq!(
        diag.to_string(),
        "Unsupported instruction: 0xFFFFFFFF at PC 0x00001000"
    );

    emu.step().expect("Execution failed");
    assert_eq!(emu.get_register(Gpr::A0), 8);
    assert_eq!(emu.get_logs().len(), 1);
}

#[test]
fn test_instances_are_independent() {
    let mut a = Rv32fEmulator::new();
    let mut b = Rv32fEmulator::new();
    a.load_image(&image(&[add(Gpr::A0, Gpr::A1, Gpr::A1)]));
    b.load_image(&image(&[add(Gpr::A0, Gpr::A1, Gpr::A1)]));
    a.set_register(Gpr::A1, 1);
    b.set_register(Gpr::A1, 100);

    a.step().expect("Execution failed");
    b.step().expect("Execution failed");
    assert_eq!(a.get_register(Gpr::A0), 2);
    assert_eq!(b.get_register(Gpr::A0), 200);
}
