//! Operand expressions: a term, or two terms joined by `+` or `-`.
//!
//! Used by `EQU`, `ORG`, `WORD`, storage reservation counts, and the
//! target field of format 3/4 instructions. Evaluation lives in the
//! passes (Pass 1 works on pre-layout block offsets, Pass 2 on final
//! addresses with external fixups); this module owns only the syntax.

use crate::error::{AsmError, ErrorKind};

#[derive(Clone, Debug, PartialEq)]
pub enum Term {
    Number(i32),
    Symbol(String),
    /// `*`, the location counter at the start of the line.
    Here,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExprOp {
    Add,
    Sub,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub first: Term,
    pub rest: Option<(ExprOp, Term)>,
}

impl Expr {
    /// True for a bare numeric constant.
    pub fn is_constant(&self) -> bool {
        self.rest.is_none() && matches!(self.first, Term::Number(_))
    }
}

fn parse_term(text: &str, line: u32) -> Result<Term, AsmError> {
    let text = text.trim();
    if text == "*" {
        return Ok(Term::Here);
    }
    if text
        .strip_prefix('-')
        .unwrap_or(text)
        .chars()
        .all(|c| c.is_ascii_digit())
        && !text.is_empty()
        && text != "-"
    {
        return text.parse::<i32>().map(Term::Number).map_err(|_| {
            AsmError::new(
                ErrorKind::Expression,
                line,
                format!("numeric term \"{}\" is out of range", text),
            )
        });
    }
    if !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '&')
    {
        return Ok(Term::Symbol(text.to_owned()));
    }
    Err(AsmError::new(
        ErrorKind::Expression,
        line,
        format!("\"{}\" is not a symbol, a number, or *", text),
    ))
}

/// Split at the first `+`/`-` that can be a binary operator (index > 0, so
/// a leading sign stays with its number).
pub fn parse(text: &str, line: u32) -> Result<Expr, AsmError> {
    let text = text.trim();
    let split = text
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c == '+' || c == '-');

    match split {
        None => Ok(Expr {
            first: parse_term(text, line)?,
            rest: None,
        }),
        Some((at, c)) => {
            let op = if c == '+' { ExprOp::Add } else { ExprOp::Sub };
            Ok(Expr {
                first: parse_term(&text[..at], line)?,
                rest: Some((op, parse_term(&text[at + 1..], line)?)),
            })
        }
    }
}
