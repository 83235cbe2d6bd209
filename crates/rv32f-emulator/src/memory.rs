//! Flat byte-addressable memory.

use core::ops::Range;

use crate::error::{EmulatorError, MemoryAccessKind};

/// Default memory capacity in bytes.
pub const DEFAULT_MEMORY_SIZE: usize = 65536;

/// Fixed-size memory. Every address in `[0, capacity)` is readable and
/// writable; anything else is a fault. Words are little-endian and need no
/// alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    /// Create zeroed memory of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// The whole buffer (for inspection).
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Zero every byte.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Byte range covered by an access, or a fault (with PC 0; the engine
    /// fills it in).
    fn span(
        &self,
        address: u32,
        size: usize,
        kind: MemoryAccessKind,
    ) -> Result<Range<usize>, EmulatorError> {
        let start = address as usize;
        match start.checked_add(size) {
            Some(end) if end <= self.bytes.len() => Ok(start..end),
            _ => Err(EmulatorError::MemoryFault {
                address,
                size,
                kind,
                pc: 0,
            }),
        }
    }

    fn word_at(&self, range: Range<usize>) -> u32 {
        let b = &self.bytes[range];
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }

    /// Read a 32-bit little-endian word.
    pub fn read_word(&self, address: u32) -> Result<u32, EmulatorError> {
        let range = self.span(address, 4, MemoryAccessKind::Read)?;
        Ok(self.word_at(range))
    }

    /// Write a 32-bit little-endian word, returning the word it replaced.
    ///
    /// Nothing is written when the access faults.
    pub fn write_word(&mut self, address: u32, value: u32) -> Result<u32, EmulatorError> {
        let range = self.span(address, 4, MemoryAccessKind::Write)?;
        let old = self.word_at(range.clone());
        self.bytes[range].copy_from_slice(&value.to_le_bytes());
        Ok(old)
    }

    /// Fetch the instruction word at `address`.
    pub fn fetch_instruction(&self, address: u32) -> Result<u32, EmulatorError> {
        let range = self.span(address, 4, MemoryAccessKind::InstructionFetch)?;
        Ok(self.word_at(range))
    }

    /// Copy `image` in starting at `base`, truncating at capacity.
    ///
    /// Returns the number of bytes copied.
    pub fn load_at(&mut self, base: u32, image: &[u8]) -> usize {
        let start = (base as usize).min(self.bytes.len());
        let len = image.len().min(self.bytes.len() - start);
        self.bytes[start..start + len].copy_from_slice(&image[..len]);
        len
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_is_little_endian() {
        let mut mem = Memory::new(16);
        mem.write_word(4, 0x1122_3344).unwrap();
        assert_eq!(&mem.as_bytes()[4..8], &[0x44, 0x33, 0x22, 0x11]);
        assert_eq!(mem.read_word(4).unwrap(), 0x1122_3344);
    }

    #[test]
    fn test_unaligned_access_is_allowed() {
        let mut mem = Memory::new(16);
        let old = mem.write_word(3, 0xdead_beef).unwrap();
        assert_eq!(old, 0);
        assert_eq!(mem.read_word(3).unwrap(), 0xdead_beef);
        assert_eq!(mem.write_word(3, 1).unwrap(), 0xdead_beef);
    }

    #[test]
    fn test_last_word_in_bounds() {
        let mem = Memory::new(16);
        assert!(mem.read_word(12).is_ok());
        assert!(matches!(
            mem.read_word(13),
            Err(EmulatorError::MemoryFault {
                address: 13,
                size: 4,
                kind: MemoryAccessKind::Read,
                ..
            })
        ));
    }

    #[test]
    fn test_faulting_write_changes_nothing() {
        let mut mem = Memory::new(8);
        mem.write_word(4, 0xaaaa_aaaa).unwrap();
        let before = mem.clone();
        let err = mem.write_word(6, 0x5555_5555).unwrap_err();
        assert!(matches!(
            err,
            EmulatorError::MemoryFault {
                kind: MemoryAccessKind::Write,
                ..
            }
        ));
        assert_eq!(mem, before);
    }

    #[test]
    fn test_high_address_does_not_wrap() {
        let mem = Memory::new(DEFAULT_MEMORY_SIZE);
        assert!(mem.read_word(u32::MAX).is_err());
        assert!(mem.fetch_instruction(0xffff_fffc).is_err());
    }

    #[test]
    fn test_load_at_truncates() {
        let mut mem = Memory::new(0x1004);
        let copied = mem.load_at(0x1000, &[1, 2, 3, 4, 5, 6]);
        assert_eq!(copied, 4);
        assert_eq!(&mem.as_bytes()[0x1000..], &[1, 2, 3, 4]);

        let mut tiny = Memory::new(16);
        assert_eq!(tiny.load_at(0x1000, &[1, 2, 3]), 0);
    }
}
