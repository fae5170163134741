//! Pass 1: address assignment.
//!
//! Walks the expanded line stream once, assigning every statement its
//! control section, program block, and offset; building the per-section
//! symbol and literal tables; and recording external definitions and
//! references. Block offsets are rebased to final addresses when a
//! section closes, after which every addressed line carries its absolute
//! address for Pass 2 and the listing.
//!
//! Instructions listed in `promoted` assemble as format 4 even without a
//! `+` prefix; the driver grows that set when Pass 2 discovers a format 3
//! instruction that cannot reach its target.

use std::collections::BTreeSet;

use sicxe::{Directive, Format, Formats, Opcode};

use crate::error::{AsmError, ErrorKind};
use crate::expr::{self, Expr, ExprOp, Term};
use crate::literals::LiteralTable;
use crate::operand::{self, split_commas};
use crate::parser::{LineBody, SourceLine};
use crate::symbols::{Symbol, SymbolKind, SymbolTable};

/// A named program block within a control section. Offsets count from 0
/// in every block; `base` is filled in at layout time.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub name: String,
    pub locctr: u32,
    pub high: u32,
    pub base: u32,
}

#[derive(Clone, Debug)]
pub struct Section {
    pub name: String,
    pub start: u32,
    pub length: u32,
    pub symbols: SymbolTable,
    pub literals: LiteralTable,
    /// EXTDEF names with the declaring line number.
    pub extdefs: Vec<(String, u32)>,
    pub extrefs: Vec<String>,
    pub blocks: Vec<Block>,
    current: usize,
}

impl Section {
    fn new(name: &str, start: u32) -> Section {
        Section {
            name: name.to_owned(),
            start,
            length: 0,
            symbols: SymbolTable::new(),
            literals: LiteralTable::new(),
            extdefs: Vec::new(),
            extrefs: Vec::new(),
            blocks: vec![Block {
                name: String::new(),
                locctr: 0,
                high: 0,
                base: 0,
            }],
            current: 0,
        }
    }

    pub fn locctr(&self) -> u32 {
        self.blocks[self.current].locctr
    }

    fn advance(&mut self, bytes: u32) {
        let block = &mut self.blocks[self.current];
        block.locctr += bytes;
        block.high = block.high.max(block.locctr);
    }

    fn set_locctr(&mut self, value: u32) {
        let block = &mut self.blocks[self.current];
        block.locctr = value;
        block.high = block.high.max(value);
    }

    /// Switch to the named block, creating it on first use. Re-entering a
    /// block restores its location counter exactly.
    fn use_block(&mut self, name: &str) {
        match self.blocks.iter().position(|b| b.name == name) {
            Some(index) => self.current = index,
            None => {
                self.blocks.push(Block {
                    name: name.to_owned(),
                    locctr: 0,
                    high: 0,
                    base: 0,
                });
                self.current = self.blocks.len() - 1;
            }
        }
    }

    /// Concatenate blocks in first-use order and rebase all block-relative
    /// values to final addresses.
    fn layout(&mut self) {
        let mut base = self.start;
        for block in &mut self.blocks {
            block.base = base;
            base += block.high;
        }
        self.length = base - self.start;

        let bases: Vec<u32> = self.blocks.iter().map(|b| b.base).collect();
        self.symbols.finalize(&bases);
        self.literals.finalize(&bases);
    }
}

/// Classification of a stream line, cached for Pass 2.
#[derive(Clone, Debug, PartialEq)]
pub enum LineKind {
    /// Comments and demoted macro-definition lines.
    Inert,
    /// A label-only line.
    Label,
    Instr {
        op: Opcode,
        format: Format,
    },
    Directive(Directive),
    /// A literal placed by a pool flush; the index into the owning
    /// section's literal table.
    Literal(usize),
}

#[derive(Clone, Debug)]
pub struct AssignedLine {
    pub line: SourceLine,
    /// Index in the expanded stream (pool lines share their trigger's).
    pub stream: usize,
    pub section: usize,
    pub block: usize,
    pub offset: u32,
    addressed: bool,
    pub address: Option<u32>,
    pub kind: LineKind,
}

#[derive(Debug)]
pub struct Pass1 {
    pub sections: Vec<Section>,
    pub lines: Vec<AssignedLine>,
    /// Line number and operand of the END statement.
    pub end_operand: Option<(u32, Option<String>)>,
}

struct BlockValue {
    value: i64,
    block: Option<usize>,
}

struct Assigner<'p> {
    promoted: &'p BTreeSet<usize>,
    sections: Vec<Section>,
    lines: Vec<AssignedLine>,
    errors: Vec<AsmError>,
    ended: bool,
    end_operand: Option<(u32, Option<String>)>,
}

pub fn run(expanded: &[SourceLine], promoted: &BTreeSet<usize>) -> Result<Pass1, Vec<AsmError>> {
    let mut assigner = Assigner {
        promoted,
        sections: Vec::new(),
        lines: Vec::new(),
        errors: Vec::new(),
        ended: false,
        end_operand: None,
    };

    for (stream, line) in expanded.iter().enumerate() {
        assigner.line(stream, line);
    }

    if !assigner.ended && !assigner.sections.is_empty() {
        // no END directive; close the open section at end of input
        let last = expanded.last().unwrap();
        assigner.close_section(last, expanded.len());
    }

    for assigned in &mut assigner.lines {
        if assigned.addressed {
            let section = &assigner.sections[assigned.section];
            assigned.address = Some(section.blocks[assigned.block].base + assigned.offset);
        }
    }

    if assigner.errors.is_empty() {
        Ok(Pass1 {
            sections: assigner.sections,
            lines: assigner.lines,
            end_operand: assigner.end_operand,
        })
    } else {
        Err(assigner.errors)
    }
}

impl<'p> Assigner<'p> {
    fn line(&mut self, stream: usize, line: &SourceLine) {
        match &line.body {
            LineBody::Comment => self.push_inert(stream, line),
            LineBody::Statement { .. } if self.ended => self.push_inert(stream, line),
            LineBody::Statement {
                mnemonic: Some(mnemonic),
                ..
            } => {
                let mnemonic = mnemonic.clone();
                let outcome = if let Ok(directive) = mnemonic.parse::<Directive>() {
                    self.directive(stream, line, directive)
                } else if let Ok(op) = mnemonic.parse::<Opcode>() {
                    self.instruction(stream, line, op)
                } else {
                    Err(AsmError::new(
                        ErrorKind::UnknownMnemonic,
                        line.number,
                        format!("\"{}\" is not an opcode, directive, or macro", mnemonic),
                    ))
                };
                if let Err(error) = outcome {
                    self.errors.push(error);
                    self.push_inert(stream, line);
                }
            }
            LineBody::Statement { .. } => {
                // label-only line
                self.ensure_section();
                self.define_here(line, stream);
                self.push_at_locctr(stream, line, LineKind::Label);
            }
        }
    }

    fn instruction(&mut self, stream: usize, line: &SourceLine, op: Opcode) -> Result<(), AsmError> {
        self.ensure_section();

        let formats = op.formats();
        let format = if formats == Formats::F1 {
            self.reject_extended(line, op)?;
            Format::One
        } else if formats == Formats::F2 {
            self.reject_extended(line, op)?;
            Format::Two
        } else if line.extended() || self.promoted.contains(&stream) {
            Format::Four
        } else {
            Format::Three
        };

        if let Some(text) = line.operand() {
            if let Some(literal) = operand::literal_text(text) {
                let literal = literal.to_owned();
                self.section_mut().literals.intern(&literal, line.number)?;
            }
        }

        self.define_here(line, stream);
        self.push_at_locctr(stream, line, LineKind::Instr { op, format });
        self.section_mut().advance(format.length());
        Ok(())
    }

    fn reject_extended(&self, line: &SourceLine, op: Opcode) -> Result<(), AsmError> {
        if line.extended() {
            return Err(AsmError::new(
                ErrorKind::Format,
                line.number,
                format!("{} does not permit the + extended-format prefix", op),
            ));
        }
        Ok(())
    }

    fn directive(
        &mut self,
        stream: usize,
        line: &SourceLine,
        directive: Directive,
    ) -> Result<(), AsmError> {
        use sicxe::Directive::*;

        match directive {
            START => {
                if !self.sections.is_empty() {
                    return Err(AsmError::new(
                        ErrorKind::Format,
                        line.number,
                        "START is only allowed as the first statement",
                    ));
                }
                let start = match line.operand() {
                    Some(text) => u32::from_str_radix(text.trim(), 16).map_err(|_| {
                        AsmError::new(
                            ErrorKind::Expression,
                            line.number,
                            format!("\"{}\" is not a hex start address", text),
                        )
                    })?,
                    None => 0,
                };
                let name = line.label().unwrap_or("").to_owned();
                self.open_section(&name, start, stream);
                self.push_at_locctr(stream, line, LineKind::Directive(START));
            }
            CSECT => {
                let name = line
                    .label()
                    .or_else(|| line.operand())
                    .ok_or_else(|| {
                        AsmError::new(
                            ErrorKind::Format,
                            line.number,
                            "CSECT requires a section name",
                        )
                    })?
                    .trim()
                    .to_owned();
                self.ensure_section();
                self.close_section(line, stream);
                self.open_section(&name, 0, stream);
                self.push_at_locctr(stream, line, LineKind::Directive(CSECT));
            }
            USE => {
                self.ensure_section();
                self.define_here(line, stream);
                let name = line.operand().unwrap_or("").trim().to_owned();
                self.section_mut().use_block(&name);
                self.push_at_locctr(stream, line, LineKind::Directive(USE));
            }
            EQU => {
                let name = line
                    .label()
                    .ok_or_else(|| {
                        AsmError::new(ErrorKind::Format, line.number, "EQU requires a label")
                    })?
                    .to_owned();
                let text = line.operand().ok_or_else(|| {
                    AsmError::new(ErrorKind::Expression, line.number, "EQU requires an operand")
                })?;
                self.ensure_section();
                let value = self.eval(&expr::parse(text, line.number)?, line.number)?;
                if value.block.is_some() && value.value < 0 {
                    return Err(AsmError::new(
                        ErrorKind::Expression,
                        line.number,
                        "relocatable EQU value is negative",
                    ));
                }

                let symbol = Symbol {
                    value: value.value as u32,
                    kind: SymbolKind::Equate,
                    relocatable: value.block.is_some(),
                    block: value.block,
                    defined_at: stream,
                };
                if !self.section_mut().symbols.insert(&name, symbol) {
                    self.errors
                        .push(AsmError::duplicate_symbol(line.number, &name));
                }

                let section = self.sections.len() - 1;
                self.lines.push(AssignedLine {
                    line: line.clone(),
                    stream,
                    section,
                    block: value.block.unwrap_or(0),
                    offset: value.value as u32,
                    addressed: value.block.is_some(),
                    address: None,
                    kind: LineKind::Directive(EQU),
                });
            }
            ORG => {
                let text = line.operand().ok_or_else(|| {
                    AsmError::new(ErrorKind::Expression, line.number, "ORG requires an operand")
                })?;
                self.ensure_section();
                self.define_here(line, stream);
                let value = self.eval(&expr::parse(text, line.number)?, line.number)?;
                let section = self.section_mut();
                match value.block {
                    Some(block) if block == section.current => {
                        if value.value < 0 {
                            return Err(AsmError::new(
                                ErrorKind::Expression,
                                line.number,
                                "ORG target is negative",
                            ));
                        }
                        section.set_locctr(value.value as u32);
                    }
                    Some(_) => {
                        return Err(AsmError::new(
                            ErrorKind::Expression,
                            line.number,
                            "ORG target is in a different program block",
                        ));
                    }
                    None => {
                        // absolute address; meaningful only in the default block
                        if section.current != 0 {
                            return Err(AsmError::new(
                                ErrorKind::Expression,
                                line.number,
                                "absolute ORG outside the default program block",
                            ));
                        }
                        if value.value < i64::from(section.start) {
                            return Err(AsmError::new(
                                ErrorKind::Expression,
                                line.number,
                                "ORG target precedes the section start",
                            ));
                        }
                        let offset = value.value as u32 - section.start;
                        section.set_locctr(offset);
                    }
                }
                self.push_at_locctr(stream, line, LineKind::Directive(ORG));
            }
            EXTDEF => {
                let text = line.operand().ok_or_else(|| {
                    AsmError::new(ErrorKind::Format, line.number, "EXTDEF requires symbol names")
                })?;
                self.ensure_section();
                self.define_here(line, stream);
                let number = line.number;
                for name in split_commas(text) {
                    self.section_mut().extdefs.push((name, number));
                }
                self.push_at_locctr(stream, line, LineKind::Directive(EXTDEF));
            }
            EXTREF => {
                let text = line.operand().ok_or_else(|| {
                    AsmError::new(ErrorKind::Format, line.number, "EXTREF requires symbol names")
                })?;
                self.ensure_section();
                self.define_here(line, stream);
                for name in split_commas(text) {
                    let symbol = Symbol {
                        value: 0,
                        kind: SymbolKind::External,
                        relocatable: false,
                        block: None,
                        defined_at: stream,
                    };
                    if self.section_mut().symbols.insert(&name, symbol) {
                        self.section_mut().extrefs.push(name);
                    } else {
                        self.errors
                            .push(AsmError::duplicate_symbol(line.number, &name));
                    }
                }
                self.push_at_locctr(stream, line, LineKind::Directive(EXTREF));
            }
            BYTE => {
                let text = line.operand().ok_or_else(|| {
                    AsmError::new(ErrorKind::Literal, line.number, "BYTE requires an operand")
                })?;
                let length = crate::literals::decode_const(text, line.number)?.len() as u32;
                self.ensure_section();
                self.define_here(line, stream);
                self.push_at_locctr(stream, line, LineKind::Directive(BYTE));
                self.section_mut().advance(length);
            }
            WORD => {
                self.ensure_section();
                self.define_here(line, stream);
                self.push_at_locctr(stream, line, LineKind::Directive(WORD));
                self.section_mut().advance(3);
            }
            RESB | RESW => {
                let text = line.operand().ok_or_else(|| {
                    AsmError::new(
                        ErrorKind::Expression,
                        line.number,
                        format!("{} requires a count", directive),
                    )
                })?;
                self.ensure_section();
                let value = self.eval(&expr::parse(text, line.number)?, line.number)?;
                if value.block.is_some() || value.value < 0 {
                    return Err(AsmError::new(
                        ErrorKind::Expression,
                        line.number,
                        "reservation count must be a non-negative absolute value",
                    ));
                }
                let bytes = value.value as u32 * if directive == RESW { 3 } else { 1 };

                // A large reservation would push pending literals out of
                // the PC-relative window of the code that uses them.
                if bytes > 100 && self.section_mut().literals.has_pending() {
                    self.flush_literals(line, stream);
                }

                self.define_here(line, stream);
                self.push_at_locctr(stream, line, LineKind::Directive(directive));
                self.section_mut().advance(bytes);
            }
            LTORG => {
                self.ensure_section();
                self.define_here(line, stream);
                self.push_at_locctr(stream, line, LineKind::Directive(LTORG));
                self.flush_literals(line, stream);
            }
            BASE | NOBASE => {
                self.ensure_section();
                self.define_here(line, stream);
                self.push_at_locctr(stream, line, LineKind::Directive(directive));
            }
            END => {
                self.ensure_section();
                self.define_here(line, stream);
                self.end_operand = Some((
                    line.number,
                    line.operand().map(|text| text.trim().to_owned()),
                ));
                self.push_at_locctr(stream, line, LineKind::Directive(END));
                self.close_section(line, stream);
                self.ended = true;
            }
        }
        Ok(())
    }

    fn ensure_section(&mut self) {
        if self.sections.is_empty() {
            self.sections.push(Section::new("", 0));
        }
    }

    fn open_section(&mut self, name: &str, start: u32, stream: usize) {
        let mut section = Section::new(name, start);
        if !name.is_empty() {
            section.symbols.insert(
                name,
                Symbol {
                    value: 0,
                    kind: SymbolKind::Label,
                    relocatable: true,
                    block: Some(0),
                    defined_at: stream,
                },
            );
        }
        self.sections.push(section);
    }

    fn close_section(&mut self, trigger: &SourceLine, stream: usize) {
        self.flush_literals(trigger, stream);

        let section = self.sections.len() - 1;
        let mut undefined = Vec::new();
        for (name, number) in &self.sections[section].extdefs {
            match self.sections[section].symbols.get(name) {
                Some(symbol) if symbol.kind != SymbolKind::External => {}
                _ => undefined.push((name.clone(), *number)),
            }
        }
        for (name, number) in undefined {
            self.errors.push(AsmError::undefined_symbol(number, &name));
        }

        self.sections[section].layout();
    }

    fn flush_literals(&mut self, trigger: &SourceLine, stream: usize) {
        let section = self.sections.len() - 1;
        let block = self.sections[section].current;
        let locctr = self.sections[section].locctr();
        let (placed, advanced) = self.sections[section].literals.flush(block, locctr);
        self.sections[section].set_locctr(advanced);

        for index in placed {
            let (offset, text) = {
                let literal = self.sections[section].literals.get(index);
                (literal.address.unwrap(), literal.text.clone())
            };
            let text = format!("{:<10}{:<10}{}", "", "*", text)
                .trim_end()
                .to_owned();
            self.lines.push(AssignedLine {
                line: SourceLine {
                    number: trigger.number,
                    text,
                    body: LineBody::Comment,
                },
                stream,
                section,
                block,
                offset,
                addressed: true,
                address: None,
                kind: LineKind::Literal(index),
            });
        }
    }

    fn section_mut(&mut self) -> &mut Section {
        self.sections.last_mut().unwrap()
    }

    fn define_here(&mut self, line: &SourceLine, stream: usize) {
        if let Some(name) = line.label() {
            let name = name.to_owned();
            let section = self.section_mut();
            let symbol = Symbol {
                value: section.locctr(),
                kind: SymbolKind::Label,
                relocatable: true,
                block: Some(section.current),
                defined_at: stream,
            };
            if !section.symbols.insert(&name, symbol) {
                self.errors
                    .push(AsmError::duplicate_symbol(line.number, &name));
            }
        }
    }

    fn push_inert(&mut self, stream: usize, line: &SourceLine) {
        self.lines.push(AssignedLine {
            line: line.clone(),
            stream,
            section: self.sections.len().saturating_sub(1),
            block: 0,
            offset: 0,
            addressed: false,
            address: None,
            kind: LineKind::Inert,
        });
    }

    fn push_at_locctr(&mut self, stream: usize, line: &SourceLine, kind: LineKind) {
        let section = self.sections.len() - 1;
        let block = self.sections[section].current;
        let offset = self.sections[section].locctr();
        self.lines.push(AssignedLine {
            line: line.clone(),
            stream,
            section,
            block,
            offset,
            addressed: true,
            address: None,
            kind,
        });
    }

    fn eval(&self, expr: &Expr, number: u32) -> Result<BlockValue, AsmError> {
        let first = self.eval_term(&expr.first, number)?;
        match &expr.rest {
            None => Ok(first),
            Some((op, term)) => {
                let second = self.eval_term(term, number)?;
                combine(first, *op, second, number)
            }
        }
    }

    fn eval_term(&self, term: &Term, number: u32) -> Result<BlockValue, AsmError> {
        let section = self.sections.last().unwrap();
        match term {
            Term::Number(n) => Ok(BlockValue {
                value: i64::from(*n),
                block: None,
            }),
            Term::Here => Ok(BlockValue {
                value: i64::from(section.locctr()),
                block: Some(section.current),
            }),
            Term::Symbol(name) => match section.symbols.get(name) {
                None => Err(AsmError::undefined_symbol(number, name)),
                Some(symbol) if symbol.kind == SymbolKind::External => Err(AsmError::new(
                    ErrorKind::Expression,
                    number,
                    format!("external symbol \"{}\" in an assembly-time expression", name),
                )),
                Some(symbol) => Ok(BlockValue {
                    value: i64::from(symbol.value),
                    block: symbol.block,
                }),
            },
        }
    }
}

fn combine(a: BlockValue, op: ExprOp, b: BlockValue, number: u32) -> Result<BlockValue, AsmError> {
    let bad = |message: &str| AsmError::new(ErrorKind::Expression, number, message);
    match op {
        ExprOp::Add => match (a.block, b.block) {
            (Some(_), Some(_)) => Err(bad("sum of two relocatable values")),
            (block, None) => Ok(BlockValue {
                value: a.value + b.value,
                block,
            }),
            (None, block) => Ok(BlockValue {
                value: a.value + b.value,
                block,
            }),
        },
        ExprOp::Sub => match (a.block, b.block) {
            (block, None) => Ok(BlockValue {
                value: a.value - b.value,
                block,
            }),
            (Some(p), Some(q)) if p == q => Ok(BlockValue {
                value: a.value - b.value,
                block: None,
            }),
            (Some(_), Some(_)) => Err(bad("difference across program blocks")),
            (None, Some(_)) => Err(bad("absolute value minus relocatable value")),
        },
    }
}
