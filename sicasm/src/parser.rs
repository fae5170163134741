//! Pest-backed line parser.
//!
//! Splits source text into [`SourceLine`]s. The parser is deliberately
//! permissive: it only separates fields, so a bad mnemonic or a malformed
//! operand surfaces later, in the pass that understands the field.
//!
//! [`SourceLine`]: struct.SourceLine.html

use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct SicParser;

/// One parsed source line. `text` keeps the original spelling for the
/// listing; expanded macro lines carry reconstructed text.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceLine {
    pub number: u32,
    pub text: String,
    pub body: LineBody,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LineBody {
    /// A `.` comment, a blank-bodied line, or a demoted macro-definition
    /// line. Appears in the listing, assembles to nothing.
    Comment,
    /// A statement. At least one of `label` and `mnemonic` is present;
    /// `mnemonic` is `None` only for a label-only line.
    Statement {
        label: Option<String>,
        mnemonic: Option<String>,
        extended: bool,
        operand: Option<String>,
    },
}

impl SourceLine {
    pub(crate) fn statement(
        number: u32,
        label: Option<String>,
        mnemonic: Option<String>,
        extended: bool,
        operand: Option<String>,
    ) -> SourceLine {
        let mut text = format!("{:<10}", label.as_deref().unwrap_or(""));
        match (&mnemonic, extended) {
            (Some(m), true) => text.push_str(&format!("{:<10}", format!("+{}", m))),
            (Some(m), false) => text.push_str(&format!("{:<10}", m)),
            (None, _) => {}
        }
        if let Some(op) = &operand {
            text.push_str(op);
        }
        SourceLine {
            number,
            text: text.trim_end().to_owned(),
            body: LineBody::Statement {
                label,
                mnemonic,
                extended,
                operand,
            },
        }
    }

    pub(crate) fn label(&self) -> Option<&str> {
        match &self.body {
            LineBody::Statement { label, .. } => label.as_deref(),
            LineBody::Comment => None,
        }
    }

    pub(crate) fn mnemonic(&self) -> Option<&str> {
        match &self.body {
            LineBody::Statement { mnemonic, .. } => mnemonic.as_deref(),
            LineBody::Comment => None,
        }
    }

    pub(crate) fn operand(&self) -> Option<&str> {
        match &self.body {
            LineBody::Statement { operand, .. } => operand.as_deref(),
            LineBody::Comment => None,
        }
    }

    pub(crate) fn extended(&self) -> bool {
        match &self.body {
            LineBody::Statement { extended, .. } => *extended,
            LineBody::Comment => false,
        }
    }
}

pub(crate) fn parse_lines(input: &str) -> Result<Vec<SourceLine>, Box<pest::error::Error<Rule>>> {
    let program = SicParser::parse(Rule::program, input)
        .map_err(Box::new)?
        .next()
        .unwrap();

    let mut lines = Vec::new();
    for pair in program.into_inner() {
        match pair.as_rule() {
            Rule::line => {
                let number = pair.as_span().start_pos().line_col().0 as u32;
                let text = pair.as_str().trim_end().to_owned();
                let inner = pair.into_inner().next().unwrap();
                match inner.as_rule() {
                    Rule::blank => {}
                    Rule::comment => lines.push(SourceLine {
                        number,
                        text,
                        body: LineBody::Comment,
                    }),
                    Rule::statement => {
                        let mut label = None;
                        let mut mnemonic = None;
                        let mut extended = false;
                        let mut operand = None;
                        for part in inner.into_inner() {
                            match part.as_rule() {
                                Rule::label => label = Some(part.as_str().to_owned()),
                                Rule::mnemonic => {
                                    let s = part.as_str();
                                    if let Some(stripped) = s.strip_prefix('+') {
                                        extended = true;
                                        mnemonic = Some(stripped.to_owned());
                                    } else {
                                        mnemonic = Some(s.to_owned());
                                    }
                                }
                                Rule::operand => operand = Some(part.as_str().to_owned()),
                                Rule::remark => {}
                                _ => unreachable!(),
                            }
                        }
                        lines.push(SourceLine {
                            number,
                            text,
                            body: LineBody::Statement {
                                label,
                                mnemonic,
                                extended,
                                operand,
                            },
                        });
                    }
                    _ => unreachable!(),
                }
            }
            Rule::EOI => {}
            _ => unreachable!(),
        }
    }
    Ok(lines)
}
