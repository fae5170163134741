//! Pass 2: code generation.
//!
//! Walks the assigned line stream with the Pass 1 tables and produces the
//! object bytes, text and modification records, and the listing. Format 3
//! operands go through the addressing ladder: an absolute value encodes
//! directly, a relocatable target tries PC-relative, then the declared
//! BASE, then an automatic BASE candidate; when everything misses (or the
//! operand is external), the instruction is reported back to the driver
//! for promotion to format 4 instead of failing.

use std::collections::BTreeSet;

use byteorder::ByteOrder;
use matches::debug_assert_matches;
use sicobj::{ModRecord, ObjectProgram, SectionRecords, Sign};
use sicxe::constants::{BASE_DISP_MAX, F4_ADDR_MASK, PC_DISP_MAX, PC_DISP_MIN, WORD_MASK};
use sicxe::{
    make_format1, make_format2, make_format3, make_format4, Directive, Flags, Format, Formats,
    Opcode, RegisterId,
};
use util::Endian;

use crate::error::{AsmError, ErrorKind};
use crate::expr::{self, Expr, ExprOp, Term};
use crate::listing::{Listing, ListingLine};
use crate::operand::{self, AddrMode, Target};
use crate::pass1::{AssignedLine, LineKind, Pass1, Section};
use crate::symbols::SymbolKind;

pub enum Outcome {
    Done(ObjectProgram, Listing),
    /// Format 3 instructions (by stream index) that need format 4. The
    /// driver reruns both passes with these added to the promoted set.
    Promote(BTreeSet<usize>),
}

/// An operand value with its relocation behavior.
struct Resolved {
    value: i32,
    relocatable: bool,
    fixups: Vec<(Sign, String)>,
    /// True for a bare numeric constant, which may sit in the
    /// displacement field directly.
    constant: bool,
}

enum Reloc {
    Abs,
    Rel,
    Ext(String),
}

struct Generator<'p> {
    pass1: &'p Pass1,
    records: Vec<SectionRecords>,
    listing: Listing,
    errors: Vec<AsmError>,
    promote: BTreeSet<usize>,
    section: usize,
    base: Option<i32>,
}

pub fn run(pass1: &Pass1) -> Result<Outcome, Vec<AsmError>> {
    let records = pass1
        .sections
        .iter()
        .map(|s| SectionRecords::new(&s.name, s.start))
        .collect();
    let mut generator = Generator {
        pass1,
        records,
        listing: Listing::default(),
        errors: Vec::new(),
        promote: BTreeSet::new(),
        section: 0,
        base: None,
    };

    for assigned in &pass1.lines {
        generator.line(assigned);
    }
    generator.finish();

    if !generator.promote.is_empty() {
        // this round's output is stale; the driver will rerun both passes
        return Ok(Outcome::Promote(generator.promote));
    }
    if !generator.errors.is_empty() {
        return Err(generator.errors);
    }
    Ok(Outcome::Done(
        ObjectProgram {
            sections: generator.records,
        },
        generator.listing,
    ))
}

fn word3(word: sicxe::Word) -> Vec<u8> {
    let mut bytes = [0u8; 3];
    Endian::write_u24(&mut bytes, word);
    bytes.to_vec()
}

fn word4(word: sicxe::Word) -> Vec<u8> {
    let mut bytes = [0u8; 4];
    Endian::write_u32(&mut bytes, word);
    bytes.to_vec()
}

impl<'p> Generator<'p> {
    fn sec(&self) -> &Section {
        &self.pass1.sections[self.section]
    }

    fn error<M: Into<String>>(&mut self, kind: ErrorKind, number: u32, message: M) {
        self.errors.push(AsmError::new(kind, number, message));
    }

    fn line(&mut self, assigned: &AssignedLine) {
        if assigned.section != self.section {
            self.section = assigned.section;
            // BASE declarations do not survive a section boundary
            self.base = None;
        }

        let code = match &assigned.kind {
            LineKind::Inert | LineKind::Label => None,
            LineKind::Literal(index) => Some(self.sec().literals.get(*index).bytes.clone()),
            LineKind::Directive(directive) => self.directive(assigned, *directive),
            LineKind::Instr { op, format } => self.instruction(assigned, *op, *format),
        };

        if let (Some(bytes), Some(address)) = (&code, assigned.address) {
            if !bytes.is_empty() {
                self.records[assigned.section].push_bytes(address, bytes);
            }
        }

        self.listing.push(ListingLine {
            number: assigned.line.number,
            address: assigned.address,
            text: assigned.line.text.clone(),
            code: code.unwrap_or_default(),
        });
    }

    fn directive(&mut self, assigned: &AssignedLine, directive: Directive) -> Option<Vec<u8>> {
        use sicxe::Directive::*;

        match directive {
            BYTE => {
                let text = assigned.line.operand()?;
                // a malformed constant was already reported by Pass 1
                crate::literals::decode_const(text, assigned.line.number).ok()
            }
            WORD => self.word(assigned),
            RESB | RESW | ORG | USE => {
                self.records[assigned.section].break_text();
                None
            }
            BASE => {
                self.set_base(assigned);
                None
            }
            NOBASE => {
                self.base = None;
                None
            }
            START | CSECT | LTORG | EQU | EXTDEF | EXTREF | END => None,
        }
    }

    fn word(&mut self, assigned: &AssignedLine) -> Option<Vec<u8>> {
        let number = assigned.line.number;
        let text = match assigned.line.operand() {
            Some(text) => text,
            None => {
                self.error(ErrorKind::Expression, number, "WORD requires an operand");
                return None;
            }
        };
        let parsed = match expr::parse(text, number) {
            Ok(parsed) => parsed,
            Err(error) => {
                self.errors.push(error);
                return None;
            }
        };
        let resolved = match self.resolve(&parsed, assigned) {
            Ok(resolved) => resolved,
            Err(error) => {
                self.errors.push(error);
                return None;
            }
        };

        let address = assigned.address?;
        if !resolved.fixups.is_empty() {
            for (sign, name) in resolved.fixups {
                self.records[assigned.section].add_mod(ModRecord {
                    address,
                    halfbytes: 6,
                    symbol: Some((sign, name)),
                });
            }
        } else if resolved.relocatable {
            // an address constant must be relocated with the program
            self.records[assigned.section].add_mod(ModRecord {
                address,
                halfbytes: 6,
                symbol: None,
            });
        }

        let mut bytes = [0u8; 3];
        Endian::write_u24(&mut bytes, (resolved.value as u32) & WORD_MASK);
        Some(bytes.to_vec())
    }

    fn set_base(&mut self, assigned: &AssignedLine) {
        let number = assigned.line.number;
        let text = match assigned.line.operand() {
            Some(text) => text,
            None => {
                self.error(ErrorKind::Format, number, "BASE requires an operand");
                return;
            }
        };
        let resolved = expr::parse(text, number).and_then(|e| self.resolve(&e, assigned));
        match resolved {
            Ok(resolved) if resolved.fixups.is_empty() => self.base = Some(resolved.value),
            Ok(_) => self.error(
                ErrorKind::Expression,
                number,
                "BASE cannot name an external symbol",
            ),
            Err(error) => self.errors.push(error),
        }
    }

    fn instruction(&mut self, assigned: &AssignedLine, op: Opcode, format: Format) -> Option<Vec<u8>> {
        debug_assert_matches!(assigned.kind, LineKind::Instr { .. });
        match format {
            Format::One => Some(vec![make_format1(op) as u8]),
            Format::Two => self.format2(assigned, op),
            Format::Three | Format::Four => self.format34(assigned, op, format),
        }
    }

    fn format2(&mut self, assigned: &AssignedLine, op: Opcode) -> Option<Vec<u8>> {
        use sicxe::Opcode::*;

        let number = assigned.line.number;
        let text = match assigned.line.operand() {
            Some(text) => text,
            None => {
                self.error(ErrorKind::Format, number, format!("{} requires an operand", op));
                return None;
            }
        };
        let parts = operand::split_commas(text);

        let (r1, r2) = match op {
            CLEAR | TIXR => {
                self.expect_parts(&parts, 1, number, op)?;
                (self.parse_register(&parts[0], number)?, 0)
            }
            SVC => {
                self.expect_parts(&parts, 1, number, op)?;
                (self.parse_count(&parts[0], 0, 15, number)?, 0)
            }
            SHIFTL | SHIFTR => {
                self.expect_parts(&parts, 2, number, op)?;
                let register = self.parse_register(&parts[0], number)?;
                // the 4-bit field holds n-1 for shifts of 1..16 bits
                let count = self.parse_count(&parts[1], 1, 16, number)?;
                (register, count - 1)
            }
            _ => {
                self.expect_parts(&parts, 2, number, op)?;
                (
                    self.parse_register(&parts[0], number)?,
                    self.parse_register(&parts[1], number)?,
                )
            }
        };

        let mut bytes = [0u8; 2];
        Endian::write_u16(&mut bytes, make_format2(op, r1, r2) as u16);
        Some(bytes.to_vec())
    }

    fn expect_parts(&mut self, parts: &[String], want: usize, number: u32, op: Opcode) -> Option<()> {
        if parts.len() == want {
            Some(())
        } else {
            self.error(
                ErrorKind::Format,
                number,
                format!("{} takes {} operand(s), got {}", op, want, parts.len()),
            );
            None
        }
    }

    fn parse_register(&mut self, text: &str, number: u32) -> Option<u8> {
        match text.parse::<RegisterId>() {
            Ok(register) => Some(register.number()),
            Err(_) => {
                self.error(
                    ErrorKind::Format,
                    number,
                    format!("\"{}\" is not a register", text),
                );
                None
            }
        }
    }

    fn parse_count(&mut self, text: &str, min: u8, max: u8, number: u32) -> Option<u8> {
        match text.parse::<u8>() {
            Ok(n) if n >= min && n <= max => Some(n),
            _ => {
                self.error(
                    ErrorKind::Format,
                    number,
                    format!("\"{}\" is not a count in {}..={}", text, min, max),
                );
                None
            }
        }
    }

    fn format34(&mut self, assigned: &AssignedLine, op: Opcode, format: Format) -> Option<Vec<u8>> {
        let number = assigned.line.number;
        let text = match assigned.line.operand() {
            Some(text) => text,
            None => {
                if op == Opcode::RSUB {
                    return Some(match format {
                        Format::Four => word4(make_format4(op, Flags::simple(), 0)),
                        _ => word3(make_format3(op, Flags::simple(), 0)),
                    });
                }
                self.error(ErrorKind::Format, number, format!("{} requires an operand", op));
                return None;
            }
        };

        let field = match operand::parse(text, number) {
            Ok(field) => field,
            Err(error) => {
                self.errors.push(error);
                return None;
            }
        };
        if field.indexed && field.mode != AddrMode::Simple {
            self.error(
                ErrorKind::Format,
                number,
                "indexing cannot combine with immediate or indirect addressing",
            );
            return None;
        }

        let mut flags = match field.mode {
            AddrMode::Simple => Flags::simple(),
            AddrMode::Immediate => Flags::immediate(),
            AddrMode::Indirect => Flags::indirect(),
        };
        flags.x = field.indexed;

        let resolved = match &field.target {
            Target::Literal(text) => match self.sec().literals.address_of(text) {
                Some(address) => Resolved {
                    value: address as i32,
                    relocatable: true,
                    fixups: Vec::new(),
                    constant: false,
                },
                None => {
                    self.error(
                        ErrorKind::Literal,
                        number,
                        format!("literal {} was never placed in a pool", text),
                    );
                    return None;
                }
            },
            Target::Expr(parsed) => match self.resolve(parsed, assigned) {
                Ok(resolved) => resolved,
                Err(error) => {
                    self.errors.push(error);
                    return None;
                }
            },
        };

        let address = assigned.address?;
        match format {
            Format::Four => {
                if resolved.fixups.is_empty() && resolved.relocatable {
                    self.records[assigned.section].add_mod(ModRecord {
                        address: address + 1,
                        halfbytes: 5,
                        symbol: None,
                    });
                } else {
                    let section = assigned.section;
                    for (sign, name) in &resolved.fixups {
                        self.records[section].add_mod(ModRecord {
                            address: address + 1,
                            halfbytes: 5,
                            symbol: Some((*sign, name.clone())),
                        });
                    }
                }
                if resolved.constant
                    && (resolved.value < 0 || resolved.value > F4_ADDR_MASK as i32)
                {
                    self.error(
                        ErrorKind::DisplacementOutOfRange,
                        number,
                        format!("{} does not fit a 20-bit address field", resolved.value),
                    );
                    return None;
                }
                Some(word4(make_format4(op, flags, resolved.value as u32)))
            }
            _ => {
                if !resolved.fixups.is_empty() {
                    // PC-relative addressing into another section is
                    // impossible; an external target needs format 4
                    return self.request_promotion(assigned, op);
                }
                if resolved.constant || !resolved.relocatable {
                    let value = resolved.value;
                    if value >= 0 && value <= BASE_DISP_MAX {
                        return Some(word3(make_format3(op, flags, value as u32)));
                    }
                    return self.request_promotion(assigned, op);
                }

                let target = resolved.value;
                let pc = address as i32 + 3;
                let disp = target - pc;
                if disp >= PC_DISP_MIN && disp <= PC_DISP_MAX {
                    flags.p = true;
                    return Some(word3(make_format3(op, flags, disp as u32)));
                }
                if let Some(base) = self.base {
                    if target >= base && target - base <= BASE_DISP_MAX {
                        flags.b = true;
                        return Some(word3(make_format3(op, flags, (target - base) as u32)));
                    }
                }
                if let Some(base) = self.smart_base(target, assigned.stream) {
                    flags.b = true;
                    return Some(word3(make_format3(op, flags, (target - base) as u32)));
                }
                self.request_promotion(assigned, op)
            }
        }
    }

    /// Ask the driver for format 4, or fail if the mnemonic cannot have it.
    fn request_promotion(&mut self, assigned: &AssignedLine, op: Opcode) -> Option<Vec<u8>> {
        if op.formats().contains(Formats::F4) {
            self.promote.insert(assigned.stream);
        } else {
            self.error(
                ErrorKind::DisplacementOutOfRange,
                assigned.line.number,
                format!("operand of {} is out of reach of every addressing mode", op),
            );
        }
        None
    }

    /// Deterministic automatic BASE: the highest label at or below the
    /// target within base range, among labels defined before this
    /// instruction in the stream.
    fn smart_base(&self, target: i32, stream: usize) -> Option<i32> {
        self.sec()
            .symbols
            .iter()
            .filter(|(_, symbol)| {
                symbol.kind == SymbolKind::Label && symbol.relocatable && symbol.defined_at < stream
            })
            .map(|(_, symbol)| symbol.value as i32)
            .filter(|&value| value <= target && target - value <= BASE_DISP_MAX)
            .max()
    }

    fn resolve(&self, parsed: &Expr, assigned: &AssignedLine) -> Result<Resolved, AsmError> {
        let number = assigned.line.number;
        let (first, first_reloc) = self.resolve_term(&parsed.first, assigned)?;

        let mut fixups = Vec::new();
        let (value, relocatable) = match &parsed.rest {
            None => match first_reloc {
                Reloc::Abs => (first, false),
                Reloc::Rel => (first, true),
                Reloc::Ext(name) => {
                    fixups.push((Sign::Plus, name));
                    (first, false)
                }
            },
            Some((op, term)) => {
                let (second, second_reloc) = self.resolve_term(term, assigned)?;
                let apply = |a: i32, b: i32| match op {
                    ExprOp::Add => a + b,
                    ExprOp::Sub => a - b,
                };
                let sign = match op {
                    ExprOp::Add => Sign::Plus,
                    ExprOp::Sub => Sign::Minus,
                };
                let bad = |message: &str| AsmError::new(ErrorKind::Expression, number, message);

                match (first_reloc, second_reloc) {
                    (Reloc::Abs, Reloc::Abs) => (apply(first, second), false),
                    (Reloc::Rel, Reloc::Abs) => (apply(first, second), true),
                    (Reloc::Abs, Reloc::Rel) => match op {
                        ExprOp::Add => (apply(first, second), true),
                        ExprOp::Sub => return Err(bad("absolute value minus relocatable value")),
                    },
                    (Reloc::Rel, Reloc::Rel) => match op {
                        ExprOp::Sub => (apply(first, second), false),
                        ExprOp::Add => return Err(bad("sum of two relocatable values")),
                    },
                    (Reloc::Ext(a), Reloc::Abs) => {
                        fixups.push((Sign::Plus, a));
                        (apply(first, second), false)
                    }
                    (Reloc::Abs, Reloc::Ext(b)) => {
                        fixups.push((sign, b));
                        (first, false)
                    }
                    (Reloc::Ext(a), Reloc::Ext(b)) => {
                        fixups.push((Sign::Plus, a));
                        fixups.push((sign, b));
                        (0, false)
                    }
                    (Reloc::Ext(_), Reloc::Rel) | (Reloc::Rel, Reloc::Ext(_)) => {
                        return Err(bad(
                            "cannot mix external and section-relative terms in one expression",
                        ));
                    }
                }
            }
        };

        Ok(Resolved {
            value,
            relocatable,
            fixups,
            constant: parsed.is_constant(),
        })
    }

    fn resolve_term(&self, term: &Term, assigned: &AssignedLine) -> Result<(i32, Reloc), AsmError> {
        let number = assigned.line.number;
        match term {
            Term::Number(n) => Ok((*n, Reloc::Abs)),
            Term::Here => match assigned.address {
                Some(address) => Ok((address as i32, Reloc::Rel)),
                None => Err(AsmError::new(
                    ErrorKind::Expression,
                    number,
                    "* has no value on this line",
                )),
            },
            Term::Symbol(name) => match self.sec().symbols.get(name) {
                None => Err(AsmError::undefined_symbol(number, name)),
                Some(symbol) if symbol.kind == SymbolKind::External => {
                    Ok((0, Reloc::Ext(name.clone())))
                }
                Some(symbol) => {
                    let reloc = if symbol.relocatable {
                        Reloc::Rel
                    } else {
                        Reloc::Abs
                    };
                    Ok((symbol.value as i32, reloc))
                }
            },
        }
    }

    fn finish(&mut self) {
        for (index, section) in self.pass1.sections.iter().enumerate() {
            for (name, _) in &section.extdefs {
                if let Some(symbol) = section.symbols.get(name) {
                    if symbol.kind != SymbolKind::External {
                        self.records[index].defines.push((name.clone(), symbol.value));
                    }
                }
            }
            self.records[index].refers = section.extrefs.clone();
            self.records[index].close(section.length);
        }

        if self.records.is_empty() {
            return;
        }
        let entry = match &self.pass1.end_operand {
            Some((number, Some(name))) => match self.pass1.sections[0].symbols.get(name) {
                Some(symbol) if symbol.kind != SymbolKind::External => symbol.value,
                _ => {
                    self.errors.push(AsmError::undefined_symbol(*number, name));
                    self.pass1.sections[0].start
                }
            },
            _ => self.pass1.sections[0].start,
        };
        self.records[0].entry = Some(entry);
    }
}
