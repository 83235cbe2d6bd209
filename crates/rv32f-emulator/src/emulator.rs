//! Fetch-decode-execute engine.

use core::fmt;
use std::{fs::File, io::Read, path::Path};

use rv32f_encoder::{disassemble_instruction, Fpr, Gpr};

use crate::{
    decoder::decode,
    error::EmulatorError,
    executor::{dispatch, execute_instruction, UnsupportedKind},
    logging::{Effect, InstLog, LogLevel},
    memory::{Memory, DEFAULT_MEMORY_SIZE},
};

/// Address images are loaded at and the PC starts from.
pub const PROGRAM_BASE: u32 = 0x1000;

/// Default number of entries kept in the instruction log.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Result of a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// Instruction executed, PC advanced by 4
    Executed,
    /// Taken branch redirected the PC
    Branched { from: u32, to: u32 },
    /// No operation matches the word; nothing changed except PC += 4
    Unsupported(UnsupportedInstruction),
}

/// Diagnostic for a word that has no entry in the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsupportedInstruction {
    pub pc: u32,
    pub instruction: u32,
    pub kind: UnsupportedKind,
}

impl fmt::Display for UnsupportedInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unsupported instruction: 0x{:08X} at PC 0x{:08X}",
            self.instruction, self.pc
        )
    }
}

/// RV32I/RV32F subset emulator.
///
/// Owns the whole machine state: PC, 32 integer registers, 32 float
/// registers and a fixed-size memory. Register 0 is an ordinary register.
#[derive(Debug, Clone)]
pub struct Rv32fEmulator {
    regs: [i32; 32],
    fregs: [f32; 32],
    pc: u32,
    memory: Memory,
    instruction_count: u64,
    log_level: LogLevel,
    log_capacity: usize,
    log_buffer: Vec<InstLog>,
}

impl Rv32fEmulator {
    /// Create an emulator with `DEFAULT_MEMORY_SIZE` bytes of zeroed memory
    /// and the PC at `PROGRAM_BASE`.
    pub fn new() -> Self {
        Self {
            regs: [0; 32],
            fregs: [0.0; 32],
            pc: PROGRAM_BASE,
            memory: Memory::new(DEFAULT_MEMORY_SIZE),
            instruction_count: 0,
            log_level: LogLevel::None,
            log_capacity: DEFAULT_LOG_CAPACITY,
            log_buffer: Vec::new(),
        }
    }

    /// Replace memory with `bytes` bytes of zeroed memory.
    pub fn with_memory_size(mut self, bytes: usize) -> Self {
        self.memory = Memory::new(bytes);
        self
    }

    /// Set the logging level.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Set how many log entries are kept.
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self.trim_logs();
        self
    }

    /// Zero all registers and memory, put the PC back at `PROGRAM_BASE`.
    ///
    /// Logs and the instruction count are cleared too. Configuration is kept.
    pub fn reset(&mut self) {
        self.regs = [0; 32];
        self.fregs = [0.0; 32];
        self.pc = PROGRAM_BASE;
        self.memory.clear();
        self.instruction_count = 0;
        self.log_buffer.clear();
    }

    /// Reset, then copy `image` to `PROGRAM_BASE`.
    ///
    /// Bytes past the end of memory are dropped. Returns the number of bytes
    /// copied.
    pub fn load_image(&mut self, image: &[u8]) -> usize {
        self.reset();
        self.memory.load_at(PROGRAM_BASE, image)
    }

    /// Read an image from `source`, then load it.
    ///
    /// At most the bytes that fit between `PROGRAM_BASE` and the end of
    /// memory are read; the rest of the source is left unread. The state is
    /// untouched when reading fails.
    pub fn load_image_from<R: Read>(&mut self, source: R) -> Result<usize, EmulatorError> {
        let room = self
            .memory
            .capacity()
            .saturating_sub(PROGRAM_BASE as usize);
        let mut image = Vec::new();
        source
            .take(room as u64)
            .read_to_end(&mut image)
            .map_err(|e| EmulatorError::image_load("could not read image source", e))?;
        Ok(self.load_image(&image))
    }

    /// Load the raw image stored at `path`.
    pub fn load_image_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, EmulatorError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            EmulatorError::image_load(format!("could not open {}", path.display()), e)
        })?;
        self.load_image_from(file)
    }

    /// Execute a single instruction.
    ///
    /// A memory fault (including fetching outside memory) fails the step
    /// and leaves the state exactly as it was.
    pub fn step(&mut self) -> Result<StepResult, EmulatorError> {
        let pc = self.pc;

        // Fetch instruction
        let inst_word = self
            .memory
            .fetch_instruction(pc)
            .map_err(|e| e.at_pc(pc))?;

        let decoded = decode(inst_word);

        let op = match dispatch(&decoded) {
            Ok(op) => op,
            Err(kind) => {
                self.pc = pc.wrapping_add(4);
                self.instruction_count += 1;
                let log = InstLog::new(pc, inst_word, Effect::Unsupported(kind))
                    .with_cycle(self.instruction_count);
                self.log_instruction(log);
                return Ok(StepResult::Unsupported(UnsupportedInstruction {
                    pc,
                    instruction: inst_word,
                    kind,
                }));
            }
        };

        let exec_result = execute_instruction(
            op,
            pc,
            inst_word,
            &mut self.regs,
            &mut self.fregs,
            &mut self.memory,
        )
        .map_err(|e| e.at_pc(pc))?;

        self.instruction_count += 1;

        // Update PC
        self.pc = exec_result.new_pc.unwrap_or(pc.wrapping_add(4));

        let log_with_cycle = exec_result.log.with_cycle(self.instruction_count);
        self.log_instruction(log_with_cycle);

        Ok(match exec_result.new_pc {
            Some(to) => StepResult::Branched { from: pc, to },
            None => StepResult::Executed,
        })
    }

    /// Get the current program counter.
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// Set the program counter.
    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    /// The integer register file.
    pub fn registers(&self) -> &[i32; 32] {
        &self.regs
    }

    /// The float register file.
    pub fn fregisters(&self) -> &[f32; 32] {
        &self.fregs
    }

    /// Get the value of an integer register.
    pub fn get_register(&self, reg: Gpr) -> i32 {
        self.regs[reg.idx()]
    }

    /// Set the value of an integer register. x0 is writable like any other.
    pub fn set_register(&mut self, reg: Gpr, value: i32) {
        self.regs[reg.idx()] = value;
    }

    pub fn get_fregister(&self, reg: Fpr) -> f32 {
        self.fregs[reg.idx()]
    }

    pub fn set_fregister(&mut self, reg: Fpr, value: f32) {
        self.fregs[reg.idx()] = value;
    }

    /// Get a reference to the memory (for inspection).
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Get a mutable reference to the memory (for initialization).
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Number of steps taken since the last reset.
    pub fn instruction_count(&self) -> u64 {
        self.instruction_count
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Get captured log entries.
    pub fn get_logs(&self) -> &[InstLog] {
        &self.log_buffer
    }

    /// Format all captured logs as a string.
    pub fn format_logs(&self) -> String {
        let mut result = String::new();
        for log in &self.log_buffer {
            result.push_str(&format!("{}\n", log));
        }
        result
    }

    /// Clear captured log messages.
    pub fn clear_logs(&mut self) {
        self.log_buffer.clear();
    }

    /// Dump the PC and both register files.
    pub fn dump_state(&self) -> String {
        let mut result = String::new();
        result.push_str(&format!("PC = 0x{:08X}\n", self.pc));

        result.push_str("Integer Registers:\n");
        for (i, value) in self.regs.iter().enumerate() {
            result.push_str(&format!("x{:<2} = 0x{:08X} ", i, *value as u32));
            if i % 4 == 3 {
                result.push('\n');
            }
        }

        result.push_str("Floating-Point Registers:\n");
        for (i, value) in self.fregs.iter().enumerate() {
            result.push_str(&format!("f{:<2} = {:<10.6} ", i, value));
            if i % 4 == 3 {
                result.push('\n');
            }
        }

        result
    }

    fn log_instruction(&mut self, log: InstLog) {
        let keep = match self.log_level {
            LogLevel::None => false,
            LogLevel::Errors => log.is_unsupported(),
            LogLevel::Instructions => true,
        };
        if keep {
            self.log_buffer.push(log);
            self.trim_logs();
        }
    }

    /// Drop the oldest entries beyond `log_capacity`.
    fn trim_logs(&mut self) {
        if self.log_buffer.len() > self.log_capacity {
            let excess = self.log_buffer.len() - self.log_capacity;
            self.log_buffer.drain(..excess);
        }
    }

    /// Format debug information including disassembly and execution logs.
    ///
    /// # Arguments
    ///
    /// * `highlight_pc` - PC to centre the disassembly on (the current PC if None)
    /// * `log_count` - Number of recent logs to show
    pub fn format_debug_info(&self, highlight_pc: Option<u32>, log_count: usize) -> String {
        let mut result = String::new();
        let center = highlight_pc.unwrap_or(self.pc);

        // Ten words either side of the centre, clipped to memory.
        let start = center.saturating_sub(40);
        let end = center.saturating_add(44);

        result.push_str("Disassembly:\n");
        let mut addr = start;
        while addr < end {
            let Ok(word) = self.memory.read_word(addr) else {
                break;
            };
            let marker = if addr == center { ">>> " } else { "    " };
            result.push_str(&format!(
                "{}0x{:08x}: {}\n",
                marker,
                addr,
                disassemble_instruction(word)
            ));
            addr += 4;
        }

        // Show logs
        if !self.log_buffer.is_empty() {
            result.push_str("\nLast execution logs:\n");
            let start = self.log_buffer.len().saturating_sub(log_count);
            for log in &self.log_buffer[start..] {
                result.push_str(&format!("{}\n", log));
            }
        }

        result
    }
}

impl Default for Rv32fEmulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rv32f_encoder::add;

    fn image(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn test_new_state() {
        let emu = Rv32fEmulator::new();
        assert_eq!(emu.pc(), PROGRAM_BASE);
        assert_eq!(emu.memory().capacity(), DEFAULT_MEMORY_SIZE);
        assert_eq!(emu.registers(), &[0; 32]);
        assert_eq!(emu.log_level(), LogLevel::None);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut emu = Rv32fEmulator::new();
        emu.load_image(&image(&[add(Gpr::RA, Gpr::ZERO, Gpr::ZERO)]));
        emu.set_register(Gpr::ZERO, 5);
        emu.set_fregister(Fpr::new(3), 1.5);
        emu.step().unwrap();

        emu.reset();
        assert_eq!(emu.pc(), PROGRAM_BASE);
        assert_eq!(emu.registers(), &[0; 32]);
        assert_eq!(emu.fregisters(), &[0.0; 32]);
        assert!(emu.memory().as_bytes().iter().all(|b| *b == 0));
        assert_eq!(emu.instruction_count(), 0);
    }

    #[test]
    fn test_fetch_fault_changes_nothing() {
        let mut emu = Rv32fEmulator::new().with_memory_size(0x1002);
        let err = emu.step().unwrap_err();
        assert_eq!(err.pc(), Some(PROGRAM_BASE));
        assert_eq!(emu.pc(), PROGRAM_BASE);
        assert_eq!(emu.instruction_count(), 0);
    }

    #[test]
    fn test_log_levels() {
        let program = image(&[add(Gpr::RA, Gpr::ZERO, Gpr::ZERO), 0x0000_0001]);

        let mut quiet = Rv32fEmulator::new();
        quiet.load_image(&program);
        quiet.step().unwrap();
        quiet.step().unwrap();
        assert!(quiet.get_logs().is_empty());

        let mut errors = Rv32fEmulator::new().with_log_level(LogLevel::Errors);
        errors.load_image(&program);
        errors.step().unwrap();
        errors.step().unwrap();
        assert_eq!(errors.get_logs().len(), 1);
        assert!(errors.get_logs()[0].is_unsupported());
        assert_eq!(errors.get_logs()[0].cycle, 2);

        let mut all = Rv32fEmulator::new().with_log_level(LogLevel::Instructions);
        all.load_image(&program);
        all.step().unwrap();
        all.step().unwrap();
        assert_eq!(all.get_logs().len(), 2);
        assert_eq!(all.format_logs().lines().next(), Some("[   1] 0x00001000: add ra, zero, zero"));
    }

    #[test]
    fn test_log_window_rolls() {
        let word = add(Gpr::RA, Gpr::RA, Gpr::ZERO);
        let mut emu = Rv32fEmulator::new()
            .with_log_level(LogLevel::Instructions)
            .with_log_capacity(3);
        emu.load_image(&image(&[word; 5]));
        for _ in 0..5 {
            emu.step().unwrap();
        }
        let cycles: Vec<u64> = emu.get_logs().iter().map(|l| l.cycle).collect();
        assert_eq!(cycles, vec![3, 4, 5]);

        emu.clear_logs();
        assert!(emu.get_logs().is_empty());
    }

    #[test]
    fn test_dump_state_layout() {
        let mut emu = Rv32fEmulator::new();
        emu.set_register(Gpr::new(1), -1);
        emu.set_fregister(Fpr::new(0), 1.5);
        let dump = emu.dump_state();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines[0], "PC = 0x00001000");
        assert_eq!(lines[1], "Integer Registers:");
        assert_eq!(
            lines[2],
            "x0  = 0x00000000 x1  = 0xFFFFFFFF x2  = 0x00000000 x3  = 0x00000000 "
        );
        assert_eq!(lines[10], "Floating-Point Registers:");
        assert!(lines[11].starts_with("f0  = 1.500000   f1  = 0.000000  "));
        assert_eq!(lines.len(), 19);
    }

    #[test]
    fn test_unsupported_display() {
        let diag = UnsupportedInstruction {
            pc: 0x1000,
            instruction: 0x0000_0001,
            kind: UnsupportedKind::UnknownOpcode { opcode: 1 },
        };
        assert_eq!(
            diag.to_string(),
            "Unsupported instruction: 0x00000001 at PC 0x00001000"
        );
    }
}
