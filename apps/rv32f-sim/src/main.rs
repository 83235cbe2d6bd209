use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rv32f_emulator::{EmulatorError, LogLevel, Rv32fEmulator, StepResult, PROGRAM_BASE};
use rv32f_encoder::assemble_code;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Opts {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load a raw image at 0x1000 and step through it
    Run {
        /// Raw binary image
        image: PathBuf,

        /// Run this many steps without prompting
        #[arg(short, long)]
        steps: Option<u64>,

        /// Print each instruction's trace entry
        #[arg(short, long)]
        trace: bool,
    },
    /// Assemble a source file into a raw image
    Asm {
        /// Assembly source
        source: PathBuf,

        /// Output image
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    match opts.command {
        Command::Run {
            image,
            steps,
            trace,
        } => {
            let level = if trace {
                LogLevel::Instructions
            } else {
                LogLevel::None
            };
            let mut emu = Rv32fEmulator::new().with_log_level(level);
            emu.load_image_file(&image)?;

            let stdin = io::stdin();
            let stdout = io::stdout();
            run_session(&mut emu, stdin.lock(), stdout.lock(), steps)
        }
        Command::Asm { source, output } => assemble_file(&source, &output),
    }
}

fn assemble_file(source: &Path, output: &Path) -> Result<()> {
    let text = fs::read_to_string(source)
        .with_context(|| format!("reading {}", source.display()))?;
    let code = assemble_code(&text, PROGRAM_BASE)?;
    fs::write(output, &code).with_context(|| format!("writing {}", output.display()))?;
    Ok(())
}

/// Drive the emulator one step at a time.
///
/// With `steps` set the loop runs that many steps; otherwise it prompts
/// after each step and stops on `q` or end of input. A memory fault is
/// printed and ends the session.
fn run_session<R: BufRead, W: Write>(
    emu: &mut Rv32fEmulator,
    mut input: R,
    mut out: W,
    steps: Option<u64>,
) -> Result<()> {
    writeln!(out, "Simulator starting at PC = 0x{:08X}", emu.pc())?;

    let mut taken = 0u64;
    loop {
        if steps.is_some_and(|limit| taken >= limit) {
            break;
        }

        if let Ok(word) = emu.memory().fetch_instruction(emu.pc()) {
            writeln!(out, "Instruction: 0x{:08X}", word)?;
        }

        match emu.step() {
            Ok(StepResult::Unsupported(diag)) => writeln!(out, "{}", diag)?,
            Ok(_) => {}
            Err(e @ EmulatorError::MemoryFault { .. }) => {
                writeln!(out, "{}", e)?;
                break;
            }
            Err(e) => return Err(e.into()),
        }
        taken += 1;

        if let Some(log) = emu.get_logs().last() {
            if log.cycle == emu.instruction_count() {
                writeln!(out, "{}", log)?;
            }
        }

        write!(out, "{}", emu.dump_state())?;

        if steps.is_none() {
            write!(out, "Press ENTER to continue, q to quit > ")?;
            out.flush()?;
            let mut line = String::new();
            if input.read_line(&mut line)? == 0 || line.contains('q') {
                break;
            }
        }
    }

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rv32f_encoder::{add, Gpr};

    fn session(emu: &mut Rv32fEmulator, input: &str, steps: Option<u64>) -> String {
        let mut out = Vec::new();
        run_session(emu, input.as_bytes(), &mut out, steps).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn emulator(words: &[u32]) -> Rv32fEmulator {
        let mut emu = Rv32fEmulator::new();
        let code: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        emu.load_image(&code);
        emu
    }

    #[test]
    fn test_fixed_step_count() {
        let mut emu = emulator(&[add(Gpr::A0, Gpr::A0, Gpr::A1); 4]);
        emu.set_register(Gpr::A1, 2);
        let out = session(&mut emu, "", Some(3));
        assert!(out.starts_with("Simulator starting at PC = 0x00001000\n"));
        assert_eq!(out.matches("Instruction: 0x").count(), 3);
        assert!(!out.contains("Press ENTER"));
        assert_eq!(emu.get_register(Gpr::A0), 6);
    }

    #[test]
    fn test_interactive_quit() {
        let mut emu = emulator(&[add(Gpr::A0, Gpr::A0, Gpr::A1); 4]);
        let out = session(&mut emu, "\n\nq\n", None);
        assert_eq!(out.matches("Press ENTER to continue, q to quit > ").count(), 3);
        assert_eq!(emu.instruction_count(), 3);
    }

    #[test]
    fn test_interactive_quit_anywhere_in_line() {
        let mut emu = emulator(&[add(Gpr::A0, Gpr::A0, Gpr::A1); 4]);
        session(&mut emu, "\n  quit\n\n", None);
        assert_eq!(emu.instruction_count(), 2);

        let mut emu = emulator(&[add(Gpr::A0, Gpr::A0, Gpr::A1); 4]);
        session(&mut emu, "xq\n\n", None);
        assert_eq!(emu.instruction_count(), 1);
    }

    #[test]
    fn test_interactive_stops_at_eof() {
        let mut emu = emulator(&[add(Gpr::A0, Gpr::A0, Gpr::A1); 4]);
        session(&mut emu, "\n", None);
        assert_eq!(emu.instruction_count(), 2);
    }

    #[test]
    fn test_unsupported_is_reported_and_skipped() {
        let mut emu = emulator(&[0x0000_0001, add(Gpr::A0, Gpr::A1, Gpr::A1)]);
        emu.set_register(Gpr::A1, 4);
        let out = session(&mut emu, "", Some(2));
        assert!(out.contains("Unsupported instruction: 0x00000001 at PC 0x00001000"));
        assert_eq!(emu.get_register(Gpr::A0), 8);
    }

    #[test]
    fn test_memory_fault_ends_session() {
        let mut emu = Rv32fEmulator::new().with_memory_size(0x1004);
        emu.load_image(&add(Gpr::A0, Gpr::A1, Gpr::A1).to_le_bytes());
        let out = session(&mut emu, "", Some(10));
        assert!(out.contains("Memory fault: instruction fetch of 4 bytes at address 0x00001004"));
        assert_eq!(emu.instruction_count(), 1);
    }

    #[test]
    fn test_trace_prints_entries() {
        let mut emu =
            emulator(&[add(Gpr::A0, Gpr::A1, Gpr::A1)]).with_log_level(LogLevel::Instructions);
        let out = session(&mut emu, "", Some(1));
        assert!(out.contains("[   1] 0x00001000: add a0, a1, a1"));
    }

    #[test]
    fn test_assemble_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("prog.s");
        let output = dir.path().join("prog.bin");
        fs::write(&source, "add ra, zero, zero\n").unwrap();

        assemble_file(&source, &output).unwrap();
        assert_eq!(fs::read(&output).unwrap(), vec![0xb3, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_assemble_file_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("bad.s");
        fs::write(&source, "add ra, zero, zero\naddi a0, a0, 1\n").unwrap();

        let err = assemble_file(&source, &dir.path().join("out.bin")).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
