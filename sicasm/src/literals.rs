//! Literal operands and the per-section literal table.
//!
//! A literal (`=C'EOF'`, `=X'05'`, `=W'3'`) is an anonymous constant; the
//! table deduplicates by textual form, queues each new literal as pending,
//! and places the pending queue into a pool on `LTORG`, at section end, or
//! ahead of a large storage reservation.

use crate::error::{AsmError, ErrorKind};
use byteorder::ByteOrder;
use sicxe::constants::WORD_MASK;
use util::Endian;

#[derive(Clone, Debug, PartialEq)]
pub struct Literal {
    pub text: String,
    pub bytes: Vec<u8>,
    /// Before layout: offset within `block`. After layout: final address.
    /// `None` until the literal is placed in a pool.
    pub address: Option<u32>,
    pub block: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LiteralTable {
    entries: Vec<Literal>,
    pending: Vec<usize>,
}

impl LiteralTable {
    pub fn new() -> LiteralTable {
        LiteralTable::default()
    }

    /// Register a literal use. Identical text shares one entry (and thus
    /// one pool address); a new form joins the pending queue.
    pub fn intern(&mut self, text: &str, line: u32) -> Result<usize, AsmError> {
        if let Some(index) = self.entries.iter().position(|l| l.text == text) {
            return Ok(index);
        }
        let bytes = decode_literal(text, line)?;
        self.entries.push(Literal {
            text: text.to_owned(),
            bytes,
            address: None,
            block: None,
        });
        let index = self.entries.len() - 1;
        self.pending.push(index);
        Ok(index)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Place all pending literals at `locctr` in `block`, in first-use
    /// order. Returns the placed indices and the advanced location counter.
    pub fn flush(&mut self, block: usize, mut locctr: u32) -> (Vec<usize>, u32) {
        let placed = std::mem::replace(&mut self.pending, Vec::new());
        for &index in &placed {
            let literal = &mut self.entries[index];
            literal.block = Some(block);
            literal.address = Some(locctr);
            locctr += literal.bytes.len() as u32;
        }
        (placed, locctr)
    }

    pub fn get(&self, index: usize) -> &Literal {
        &self.entries[index]
    }

    pub fn address_of(&self, text: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|l| l.text == text)
            .and_then(|l| l.address)
    }

    /// Rebase placed literals onto the final block bases.
    pub fn finalize(&mut self, bases: &[u32]) {
        for literal in &mut self.entries {
            if let (Some(block), Some(address)) = (literal.block, literal.address) {
                literal.address = Some(address + bases[block]);
            }
        }
    }
}

/// Decode a `=...` literal body.
pub fn decode_literal(text: &str, line: u32) -> Result<Vec<u8>, AsmError> {
    let body = text.strip_prefix('=').ok_or_else(|| {
        AsmError::new(
            ErrorKind::Literal,
            line,
            format!("literal \"{}\" must begin with =", text),
        )
    })?;

    if let Some(digits) = quoted_body(body, 'W') {
        let value = digits.parse::<i32>().map_err(|_| {
            AsmError::new(
                ErrorKind::Literal,
                line,
                format!("bad word literal \"{}\"", text),
            )
        })?;
        let mut word = [0u8; 3];
        Endian::write_u24(&mut word, (value as u32) & WORD_MASK);
        return Ok(word.to_vec());
    }

    decode_const(body, line)
}

/// Decode a `C'...'` or `X'...'` constant body, as used by `BYTE` and by
/// character and hex literals.
pub fn decode_const(text: &str, line: u32) -> Result<Vec<u8>, AsmError> {
    if let Some(chars) = quoted_body(text, 'C') {
        return Ok(chars.bytes().collect());
    }

    if let Some(digits) = quoted_body(text, 'X') {
        if digits.len() % 2 != 0 {
            return Err(AsmError::new(
                ErrorKind::Literal,
                line,
                format!("hex constant \"{}\" has an odd number of digits", text),
            ));
        }
        let mut bytes = Vec::with_capacity(digits.len() / 2);
        for pair in digits.as_bytes().chunks(2) {
            let pair = std::str::from_utf8(pair).unwrap();
            bytes.push(u8::from_str_radix(pair, 16).map_err(|_| {
                AsmError::new(
                    ErrorKind::Literal,
                    line,
                    format!("\"{}\" is not a hex digit pair", pair),
                )
            })?);
        }
        return Ok(bytes);
    }

    Err(AsmError::new(
        ErrorKind::Literal,
        line,
        format!("\"{}\" is not a C'...' or X'...' constant", text),
    ))
}

fn quoted_body(text: &str, tag: char) -> Option<&str> {
    let rest = text.strip_prefix(tag)?;
    rest.strip_prefix('\'')?.strip_suffix('\'')
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn character_constant() {
        assert_eq!(decode_const("C'EOF'", 1).unwrap(), vec![0x45, 0x4F, 0x46]);
    }

    #[test]
    fn hex_constant() {
        assert_eq!(decode_const("X'F1'", 1).unwrap(), vec![0xF1]);
        assert_eq!(decode_const("X'0A0B'", 1).unwrap(), vec![0x0A, 0x0B]);
    }

    #[test]
    fn odd_hex_digit_count() {
        let error = decode_const("X'F10'", 7).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Literal);
        assert_eq!(error.line, 7);
    }

    #[test]
    fn word_literal_is_three_bytes() {
        assert_eq!(decode_literal("=W'5'", 1).unwrap(), vec![0, 0, 5]);
        assert_eq!(
            decode_literal("=W'-1'", 1).unwrap(),
            vec![0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn unknown_constant_form() {
        assert!(decode_const("D'5'", 1).is_err());
        assert!(decode_const("C'EOF", 1).is_err());
    }

    #[test]
    fn interning_deduplicates() {
        let mut table = LiteralTable::new();
        let a = table.intern("=C'EOF'", 1).unwrap();
        let b = table.intern("=C'EOF'", 2).unwrap();
        assert_eq!(a, b);
        assert!(table.has_pending());

        let (placed, locctr) = table.flush(0, 100);
        assert_eq!(placed, vec![0]);
        assert_eq!(locctr, 103);
        assert_eq!(table.address_of("=C'EOF'"), Some(100));
        assert!(!table.has_pending());
    }
}
