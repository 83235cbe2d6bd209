//! Integer and floating-point register indices.

extern crate alloc;

use alloc::{format, string::String};
use core::fmt;

const GPR_NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

const FPR_ABI_NAMES: [&str; 32] = [
    "ft0", "ft1", "ft2", "ft3", "ft4", "ft5", "ft6", "ft7", "fs0", "fs1", "fa0", "fa1", "fa2",
    "fa3", "fa4", "fa5", "fa6", "fa7", "fs2", "fs3", "fs4", "fs5", "fs6", "fs7", "fs8", "fs9",
    "fs10", "fs11", "ft8", "ft9", "ft10", "ft11",
];

/// Integer register (`x0`..`x31`).
///
/// Register 0 is an index like any other here; whether it reads as zero is
/// up to the machine that uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Gpr(u8);

impl Gpr {
    /// Create a new GPR from register number (0-31).
    ///
    /// # Panics
    ///
    /// Panics if the register number is >= 32.
    pub fn new(num: u8) -> Self {
        assert!(num < 32, "Register number must be < 32");
        Self(num)
    }

    /// Get the register number (0-31).
    pub fn num(&self) -> u8 {
        self.0
    }

    /// Register number as an index into a register file.
    pub fn idx(&self) -> usize {
        self.0 as usize
    }

    /// Parse a register name into a Gpr.
    ///
    /// Accepts ABI names (`zero`, `ra`, `sp`, `a0`, `fp`, ...) and `x0`..`x31`.
    pub fn from_name(name: &str) -> Result<Self, String> {
        if name == "fp" {
            return Ok(Gpr::S0);
        }
        if let Some(num) = GPR_NAMES.iter().position(|n| *n == name) {
            return Ok(Gpr(num as u8));
        }
        if let Some(num) = parse_indexed(name, "x") {
            return Ok(Gpr(num));
        }
        Err(format!("Invalid register name: {}", name))
    }

    /// ABI name of this register.
    pub fn abi_name(&self) -> &'static str {
        GPR_NAMES[self.idx()]
    }
}

// Named registers
impl Gpr {
    pub const ZERO: Gpr = Gpr(0);
    pub const RA: Gpr = Gpr(1);
    pub const SP: Gpr = Gpr(2);
    pub const GP: Gpr = Gpr(3);
    pub const TP: Gpr = Gpr(4);
    pub const T0: Gpr = Gpr(5);
    pub const T1: Gpr = Gpr(6);
    pub const T2: Gpr = Gpr(7);
    pub const S0: Gpr = Gpr(8);
    pub const S1: Gpr = Gpr(9);
    pub const A0: Gpr = Gpr(10);
    pub const A1: Gpr = Gpr(11);
    pub const A2: Gpr = Gpr(12);
    pub const A3: Gpr = Gpr(13);
    pub const A4: Gpr = Gpr(14);
    pub const A5: Gpr = Gpr(15);
    pub const A6: Gpr = Gpr(16);
    pub const A7: Gpr = Gpr(17);
    pub const S2: Gpr = Gpr(18);
    pub const S3: Gpr = Gpr(19);
    pub const S4: Gpr = Gpr(20);
    pub const S5: Gpr = Gpr(21);
    pub const S6: Gpr = Gpr(22);
    pub const S7: Gpr = Gpr(23);
    pub const S8: Gpr = Gpr(24);
    pub const S9: Gpr = Gpr(25);
    pub const S10: Gpr = Gpr(26);
    pub const S11: Gpr = Gpr(27);
    pub const T3: Gpr = Gpr(28);
    pub const T4: Gpr = Gpr(29);
    pub const T5: Gpr = Gpr(30);
    pub const T6: Gpr = Gpr(31);
}

impl fmt::Display for Gpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abi_name())
    }
}

/// Single-precision floating-point register (`f0`..`f31`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fpr(u8);

impl Fpr {
    /// Create a new FPR from register number (0-31).
    ///
    /// # Panics
    ///
    /// Panics if the register number is >= 32.
    pub fn new(num: u8) -> Self {
        assert!(num < 32, "Register number must be < 32");
        Self(num)
    }

    pub fn num(&self) -> u8 {
        self.0
    }

    pub fn idx(&self) -> usize {
        self.0 as usize
    }

    /// Parse `f0`..`f31` or an ABI name (`ft0`, `fs0`, `fa0`, ...).
    pub fn from_name(name: &str) -> Result<Self, String> {
        if let Some(num) = FPR_ABI_NAMES.iter().position(|n| *n == name) {
            return Ok(Fpr(num as u8));
        }
        if let Some(num) = parse_indexed(name, "f") {
            return Ok(Fpr(num));
        }
        Err(format!("Invalid float register name: {}", name))
    }
}

impl fmt::Display for Fpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// `x7` / `f12` style names.
fn parse_indexed(name: &str, prefix: &str) -> Option<u8> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u8>().ok().filter(|n| *n < 32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn test_gpr_creation() {
        let reg = Gpr::new(5);
        assert_eq!(reg.num(), 5);
        assert_eq!(reg, Gpr::T0);
    }

    #[test]
    #[should_panic(expected = "Register number must be < 32")]
    fn test_gpr_invalid() {
        Gpr::new(32);
    }

    #[test]
    #[should_panic(expected = "Register number must be < 32")]
    fn test_fpr_invalid() {
        Fpr::new(40);
    }

    #[test]
    fn test_gpr_from_name() {
        assert_eq!(Gpr::from_name("zero"), Ok(Gpr::ZERO));
        assert_eq!(Gpr::from_name("x0"), Ok(Gpr::ZERO));
        assert_eq!(Gpr::from_name("fp"), Ok(Gpr::S0));
        assert_eq!(Gpr::from_name("a7"), Ok(Gpr::A7));
        assert_eq!(Gpr::from_name("x31"), Ok(Gpr::T6));
        assert!(Gpr::from_name("x32").is_err());
        assert!(Gpr::from_name("x").is_err());
        assert!(Gpr::from_name("f1").is_err());
    }

    #[test]
    fn test_fpr_from_name() {
        assert_eq!(Fpr::from_name("f0"), Ok(Fpr::new(0)));
        assert_eq!(Fpr::from_name("f31"), Ok(Fpr::new(31)));
        assert_eq!(Fpr::from_name("fa0"), Ok(Fpr::new(10)));
        assert_eq!(Fpr::from_name("ft11"), Ok(Fpr::new(31)));
        assert!(Fpr::from_name("f32").is_err());
        assert!(Fpr::from_name("x1").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Gpr::ZERO), "zero");
        assert_eq!(format!("{}", Gpr::SP), "sp");
        assert_eq!(format!("{}", Gpr::A1), "a1");
        assert_eq!(format!("{}", Gpr::T6), "t6");
        assert_eq!(format!("{}", Fpr::new(7)), "f7");
    }
}
