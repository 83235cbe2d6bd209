//! Text assembler.
//!
//! Parses assembly source for the supported subset and produces a flat,
//! headerless image. Multi-line sources are assembled in two passes: the
//! first lays out statements and records labels, the second resolves branch
//! targets and encodes.

use alloc::{
    collections::BTreeMap,
    format,
    string::{String, ToString},
    vec::Vec,
};
use core::fmt;

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while1},
    character::complete::{char, digit1, hex_digit1, space0},
    combinator::{map, map_res, opt, verify},
    multi::separated_list1,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::{
    encode::*,
    regs::{Fpr, Gpr},
};

/// Address the first assembled byte is placed at (the emulator's load base).
pub const DEFAULT_BASE: u32 = 0x1000;

/// Assembly error with the 1-based source line it occurred on (0 when
/// assembling a single instruction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmError {
    pub line: usize,
    pub message: String,
}

impl AsmError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "Assembly error: {}", self.message)
        } else {
            write!(f, "Assembly error on line {}: {}", self.line, self.message)
        }
    }
}

impl core::error::Error for AsmError {}

/// Branch target: a label or a numeric byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Label(String),
    Offset(i32),
}

/// One parsed source statement, before label resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Statement {
    Inst(u32),
    Beq { rs1: Gpr, rs2: Gpr, target: Target },
    Words(Vec<i32>),
    Halves(Vec<u16>),
    Bytes(Vec<u8>),
    /// Zero padding up to the next multiple of `1 << power`.
    Align(u32),
}

/// Largest accepted `.align` power (64 KiB).
const MAX_ALIGN_POWER: u32 = 16;

impl Statement {
    /// Bytes emitted when the statement is placed at `addr`.
    fn size(&self, addr: u32) -> u32 {
        match self {
            Statement::Inst(_) | Statement::Beq { .. } => 4,
            Statement::Words(words) => 4 * words.len() as u32,
            Statement::Halves(halves) => 2 * halves.len() as u32,
            Statement::Bytes(bytes) => bytes.len() as u32,
            Statement::Align(power) => align_padding(addr, *power),
        }
    }
}

fn align_padding(addr: u32, power: u32) -> u32 {
    addr.wrapping_neg() & ((1u32 << power) - 1)
}

fn parse_gpr(input: &str) -> IResult<&str, Gpr> {
    map_res(take_while1(|c: char| c.is_ascii_alphanumeric()), Gpr::from_name)(input)
}

fn parse_fpr(input: &str) -> IResult<&str, Fpr> {
    map_res(take_while1(|c: char| c.is_ascii_alphanumeric()), Fpr::from_name)(input)
}

/// Operand separator: a comma with optional surrounding blanks.
fn sep(input: &str) -> IResult<&str, char> {
    delimited(space0, char(','), space0)(input)
}

/// Parse a decimal or hex immediate. Values up to `0xffffffff` are accepted
/// and reinterpreted as two's complement.
fn parse_immediate(input: &str) -> IResult<&str, i32> {
    map_res(
        pair(
            opt(char('-')),
            alt((
                preceded(
                    tag_no_case("0x"),
                    map_res(hex_digit1, |s: &str| i64::from_str_radix(s, 16)),
                ),
                map_res(digit1, |s: &str| s.parse::<i64>()),
            )),
        ),
        |(neg, value)| {
            let value = if neg.is_some() { -value } else { value };
            if (-(1i64 << 31)..(1i64 << 32)).contains(&value) {
                Ok(value as u32 as i32)
            } else {
                Err("immediate out of range")
            }
        },
    )(input)
}

/// `.half` value: signed or unsigned 16-bit.
fn parse_half(input: &str) -> IResult<&str, u16> {
    map(
        verify(parse_immediate, |v: &i32| (-0x8000..=0xffff).contains(v)),
        |v| v as u16,
    )(input)
}

/// `.byte` value: signed or unsigned 8-bit.
fn parse_byte(input: &str) -> IResult<&str, u8> {
    map(
        verify(parse_immediate, |v: &i32| (-0x80..=0xff).contains(v)),
        |v| v as u8,
    )(input)
}

fn parse_align_power(input: &str) -> IResult<&str, u32> {
    map(
        verify(parse_immediate, |v: &i32| (0..=MAX_ALIGN_POWER as i32).contains(v)),
        |v| v as u32,
    )(input)
}

/// 12-bit signed immediate (loads, stores).
fn parse_imm12(input: &str) -> IResult<&str, i32> {
    verify(parse_immediate, |imm: &i32| (-2048..=2047).contains(imm))(input)
}

/// `imm(reg)` memory operand; the offset may be omitted.
fn parse_mem_operand(input: &str) -> IResult<&str, (i32, Gpr)> {
    map(
        pair(
            opt(parse_imm12),
            delimited(
                pair(char('('), space0),
                parse_gpr,
                pair(space0, char(')')),
            ),
        ),
        |(imm, base)| (imm.unwrap_or(0), base),
    )(input)
}

fn parse_label_name(input: &str) -> IResult<&str, &str> {
    verify(
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.'),
        |s: &str| !s.starts_with(|c: char| c.is_ascii_digit()),
    )(input)
}

fn parse_target(input: &str) -> IResult<&str, Target> {
    alt((
        map(parse_immediate, Target::Offset),
        map(parse_label_name, |s: &str| Target::Label(s.to_string())),
    ))(input)
}

fn three_gprs(input: &str) -> IResult<&str, (Gpr, Gpr, Gpr)> {
    tuple((parse_gpr, preceded(sep, parse_gpr), preceded(sep, parse_gpr)))(input)
}

fn three_fprs(input: &str) -> IResult<&str, (Fpr, Fpr, Fpr)> {
    tuple((parse_fpr, preceded(sep, parse_fpr), preceded(sep, parse_fpr)))(input)
}

fn parse_mnemonic(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '.')(input)
}

/// Parse one statement (instruction or directive) with no label or comment.
fn parse_statement(text: &str) -> Result<Statement, String> {
    let (rest, op) = parse_mnemonic(text)
        .map_err(|_| format!("Expected an instruction, found '{}'", text))?;
    let rest = rest.trim_start();
    let op_lower = op.to_ascii_lowercase();

    let parsed: IResult<&str, Statement> = match op_lower.as_str() {
        "add" => map(three_gprs, |(rd, rs1, rs2)| Statement::Inst(add(rd, rs1, rs2)))(rest),
        "sub" => map(three_gprs, |(rd, rs1, rs2)| Statement::Inst(sub(rd, rs1, rs2)))(rest),
        "neg" => map(pair(parse_gpr, preceded(sep, parse_gpr)), |(rd, rs)| {
            Statement::Inst(sub(rd, Gpr::ZERO, rs))
        })(rest),
        "lw" => map(pair(parse_gpr, preceded(sep, parse_mem_operand)), |(rd, (imm, rs1))| {
            Statement::Inst(lw(rd, rs1, imm))
        })(rest),
        "sw" => map(pair(parse_gpr, preceded(sep, parse_mem_operand)), |(rs2, (imm, rs1))| {
            Statement::Inst(sw(rs1, rs2, imm))
        })(rest),
        "beq" => map(
            tuple((parse_gpr, preceded(sep, parse_gpr), preceded(sep, parse_target))),
            |(rs1, rs2, target)| Statement::Beq { rs1, rs2, target },
        )(rest),
        "flw" => map(pair(parse_fpr, preceded(sep, parse_mem_operand)), |(fd, (imm, rs1))| {
            Statement::Inst(flw(fd, rs1, imm))
        })(rest),
        "fsw" => map(pair(parse_fpr, preceded(sep, parse_mem_operand)), |(fs2, (imm, rs1))| {
            Statement::Inst(fsw(rs1, fs2, imm))
        })(rest),
        "fadd.s" => map(three_fprs, |(fd, a, b)| Statement::Inst(fadd_s(fd, a, b)))(rest),
        "fsub.s" => map(three_fprs, |(fd, a, b)| Statement::Inst(fsub_s(fd, a, b)))(rest),
        "fmul.s" => map(three_fprs, |(fd, a, b)| Statement::Inst(fmul_s(fd, a, b)))(rest),
        "fdiv.s" => map(three_fprs, |(fd, a, b)| Statement::Inst(fdiv_s(fd, a, b)))(rest),
        "fsqrt.s" => map(pair(parse_fpr, preceded(sep, parse_fpr)), |(fd, fs1)| {
            Statement::Inst(fsqrt_s(fd, fs1))
        })(rest),
        "fcvt.w.s" => map(pair(parse_gpr, preceded(sep, parse_fpr)), |(rd, fs1)| {
            Statement::Inst(fcvt_w_s(rd, fs1))
        })(rest),
        "fcvt.s.w" => map(pair(parse_fpr, preceded(sep, parse_gpr)), |(fd, rs1)| {
            Statement::Inst(fcvt_s_w(fd, rs1))
        })(rest),
        ".word" => map(separated_list1(sep, parse_immediate), Statement::Words)(rest),
        ".half" => map(separated_list1(sep, parse_half), Statement::Halves)(rest),
        ".byte" => map(separated_list1(sep, parse_byte), Statement::Bytes)(rest),
        ".align" => map(parse_align_power, Statement::Align)(rest),
        _ => return Err(format!("Unsupported instruction '{}'", op)),
    };

    match parsed {
        Ok((remaining, statement)) if remaining.trim().is_empty() => Ok(statement),
        Ok((remaining, _)) => Err(format!(
            "Unexpected text after instruction: '{}'",
            remaining.trim()
        )),
        Err(_) => Err(format!("Invalid operands for '{}': '{}'", op, rest)),
    }
}

/// Check a byte offset fits the 13-bit, 2-byte aligned branch field.
fn check_branch_offset(offset: i32) -> Result<i32, String> {
    if offset % 2 != 0 {
        return Err(format!("Branch offset {} is not a multiple of 2", offset));
    }
    if !(-4096..=4094).contains(&offset) {
        return Err(format!("Branch offset {} out of range", offset));
    }
    Ok(offset)
}

/// Assemble a single instruction from assembly text.
///
/// Branch targets must be numeric byte offsets; labels need [`assemble_code`].
pub fn assemble_instruction(asm: &str) -> Result<u32, AsmError> {
    let statement = parse_statement(asm.trim()).map_err(|e| AsmError::new(0, e))?;
    match statement {
        Statement::Inst(word) => Ok(word),
        Statement::Beq {
            rs1,
            rs2,
            target: Target::Offset(offset),
        } => {
            let offset = check_branch_offset(offset).map_err(|e| AsmError::new(0, e))?;
            Ok(beq(rs1, rs2, offset))
        }
        Statement::Beq {
            target: Target::Label(name),
            ..
        } => Err(AsmError::new(
            0,
            format!("Label '{}' cannot be resolved in a single instruction", name),
        )),
        Statement::Words(_)
        | Statement::Halves(_)
        | Statement::Bytes(_)
        | Statement::Align(_) => Err(AsmError::new(0, "Directives need assemble_code")),
    }
}

/// Remove a trailing `# comment`.
fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Split a leading `label:` off a line, if there is one.
fn split_label(line: &str) -> Result<(Option<&str>, &str), String> {
    let Some(idx) = line.find(':') else {
        return Ok((None, line));
    };
    let name = line[..idx].trim();
    match parse_label_name(name) {
        Ok(("", _)) => Ok((Some(name), line[idx + 1..].trim())),
        _ => Err(format!("Invalid label name '{}'", name)),
    }
}

/// Assemble multi-line assembly code into a flat image.
///
/// # Arguments
///
/// * `asm` - Multi-line assembly text; `#` starts a comment
/// * `base` - Address of the first byte, used to resolve labels
///
/// # Label Resolution
///
/// Labels are defined with `name:` either on their own line or in front of a
/// statement. `beq` may reference a label or give a numeric byte offset.
///
/// # Directives
///
/// `.word`, `.half` and `.byte` emit little-endian data; `.align n` pads
/// with zeros to the next multiple of `2^n` bytes (absolute address).
pub fn assemble_code(asm: &str, base: u32) -> Result<Vec<u8>, AsmError> {
    let mut labels: BTreeMap<String, u32> = BTreeMap::new();
    let mut statements: Vec<(usize, u32, Statement)> = Vec::new();
    let mut addr = base;

    // First pass: lay out statements and record labels
    for (idx, raw) in asm.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        let (label, rest) = split_label(line).map_err(|e| AsmError::new(line_no, e))?;
        if let Some(name) = label {
            if labels.insert(name.to_string(), addr).is_some() {
                return Err(AsmError::new(line_no, format!("Duplicate label '{}'", name)));
            }
        }
        if rest.is_empty() {
            continue;
        }

        let statement = parse_statement(rest).map_err(|e| AsmError::new(line_no, e))?;
        let size = statement.size(addr);
        statements.push((line_no, addr, statement));
        addr = addr.wrapping_add(size);
    }

    // Second pass: resolve targets and encode
    let mut code = Vec::new();
    for (line_no, addr, statement) in statements {
        match statement {
            Statement::Inst(word) => code.extend_from_slice(&word.to_le_bytes()),
            Statement::Words(words) => {
                for word in words {
                    code.extend_from_slice(&word.to_le_bytes());
                }
            }
            Statement::Halves(halves) => {
                for half in halves {
                    code.extend_from_slice(&half.to_le_bytes());
                }
            }
            Statement::Bytes(bytes) => code.extend_from_slice(&bytes),
            Statement::Align(power) => {
                code.resize(code.len() + align_padding(addr, power) as usize, 0);
            }
            Statement::Beq { rs1, rs2, target } => {
                let offset = match target {
                    Target::Offset(offset) => offset,
                    Target::Label(name) => {
                        let target_addr = labels.get(&name).ok_or_else(|| {
                            AsmError::new(line_no, format!("Unknown label: {}", name))
                        })?;
                        target_addr.wrapping_sub(addr) as i32
                    }
                };
                let offset =
                    check_branch_offset(offset).map_err(|e| AsmError::new(line_no, e))?;
                code.extend_from_slice(&beq(rs1, rs2, offset).to_le_bytes());
            }
        }
    }

    Ok(code)
}
