//! Error types for the emulator.

use thiserror::Error;

/// Kind of memory access that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryAccessKind {
    Read,
    Write,
    InstructionFetch,
}

impl core::fmt::Display for MemoryAccessKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let kind = match self {
            MemoryAccessKind::Read => "read",
            MemoryAccessKind::Write => "write",
            MemoryAccessKind::InstructionFetch => "instruction fetch",
        };
        f.write_str(kind)
    }
}

/// Errors returned by `step` and the image loaders.
///
/// Unsupported instructions are not errors; they are reported through
/// `StepResult::Unsupported` and execution continues.
#[derive(Debug, Error)]
pub enum EmulatorError {
    /// An access touched bytes outside `[0, capacity)`. The step that
    /// raised it left registers, memory and PC unchanged.
    #[error("Memory fault: {kind} of {size} bytes at address 0x{address:08x} (PC 0x{pc:08x})")]
    MemoryFault {
        address: u32,
        size: usize,
        kind: MemoryAccessKind,
        pc: u32,
    },

    /// The image source could not be read. Machine state is untouched.
    #[error("Failed to load image: {reason}")]
    ImageLoad {
        reason: String,
        #[source]
        source: std::io::Error,
    },
}

impl EmulatorError {
    /// PC of the instruction that faulted, if the error came from a step.
    pub fn pc(&self) -> Option<u32> {
        match self {
            EmulatorError::MemoryFault { pc, .. } => Some(*pc),
            EmulatorError::ImageLoad { .. } => None,
        }
    }

    /// Attach the faulting PC to an error raised below the engine.
    pub(crate) fn at_pc(self, at: u32) -> Self {
        match self {
            EmulatorError::MemoryFault {
                address,
                size,
                kind,
                ..
            } => EmulatorError::MemoryFault {
                address,
                size,
                kind,
                pc: at,
            },
            other => other,
        }
    }

    pub(crate) fn image_load(reason: impl Into<String>, source: std::io::Error) -> Self {
        EmulatorError::ImageLoad {
            reason: reason.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_fault_display() {
        let err = EmulatorError::MemoryFault {
            address: 0x10000,
            size: 4,
            kind: MemoryAccessKind::Write,
            pc: 0x1008,
        };
        assert_eq!(
            err.to_string(),
            "Memory fault: write of 4 bytes at address 0x00010000 (PC 0x00001008)"
        );
        assert_eq!(err.pc(), Some(0x1008));
    }

    #[test]
    fn test_at_pc_only_touches_faults() {
        let err = EmulatorError::MemoryFault {
            address: 0xffff_fffe,
            size: 4,
            kind: MemoryAccessKind::Read,
            pc: 0,
        }
        .at_pc(0x2000);
        assert_eq!(err.pc(), Some(0x2000));

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = EmulatorError::image_load("prog.bin", io).at_pc(0x2000);
        assert_eq!(err.pc(), None);
        assert!(err.to_string().contains("prog.bin"));
    }

    #[test]
    fn test_image_load_keeps_io_source() {
        use std::error::Error;

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked");
        let err = EmulatorError::image_load("could not open prog.bin", io);
        let source = err.source().expect("io error should be the source");
        assert_eq!(source.to_string(), "locked");
        assert!(matches!(
            err,
            EmulatorError::ImageLoad { ref source, .. }
                if source.kind() == std::io::ErrorKind::PermissionDenied
        ));
    }
}
