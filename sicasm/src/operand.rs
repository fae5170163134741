//! Operand-field syntax for format 3/4 instructions.
//!
//! All string dissection of instruction operands happens here, so the
//! passes work with one descriptor value instead of scattered substring
//! tests: the addressing prefix (`#` immediate, `@` indirect), the `,X`
//! index suffix, and the target (a literal or an expression).

use crate::error::AsmError;
use crate::expr::{self, Expr};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddrMode {
    Simple,
    Immediate,
    Indirect,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Target {
    /// `=...`, kept textually; Pass 1 interned it, Pass 2 looks up the
    /// pool address.
    Literal(String),
    Expr(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct OperandField {
    pub mode: AddrMode,
    pub indexed: bool,
    pub target: Target,
}

/// The literal form referenced by an operand field, if any.
pub fn literal_text(operand: &str) -> Option<&str> {
    let text = operand.trim();
    let text = text.strip_suffix(",X").unwrap_or(text);
    if text.starts_with('=') {
        Some(text)
    } else {
        None
    }
}

/// Split on commas that are outside `'...'` quotes. Serves macro argument
/// lists, `EXTDEF`/`EXTREF` name lists, and format 2 register pairs.
pub fn split_commas(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in text.chars() {
        match c {
            '\'' => {
                quoted = !quoted;
                current.push(c);
            }
            ',' if !quoted => parts.push(std::mem::replace(&mut current, String::new())),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts.iter_mut().for_each(|p| *p = p.trim().to_owned());
    parts
}

pub fn parse(text: &str, line: u32) -> Result<OperandField, AsmError> {
    let text = text.trim();

    let (mode, rest) = if let Some(rest) = text.strip_prefix('#') {
        (AddrMode::Immediate, rest)
    } else if let Some(rest) = text.strip_prefix('@') {
        (AddrMode::Indirect, rest)
    } else {
        (AddrMode::Simple, text)
    };

    let (indexed, rest) = match rest.strip_suffix(",X") {
        Some(rest) => (true, rest),
        None => (false, rest),
    };

    let target = if rest.starts_with('=') {
        Target::Literal(rest.to_owned())
    } else {
        Target::Expr(expr::parse(rest, line)?)
    };

    Ok(OperandField {
        mode,
        indexed,
        target,
    })
}
