//! The side-by-side assembly listing.

use std::fmt;
use std::io::{self, Write};

/// One listing row: source line number, assigned address (blank for
/// comments, macro definitions and absolute equates), the source text
/// verbatim, and the generated object code.
#[derive(Clone, Debug, PartialEq)]
pub struct ListingLine {
    pub number: u32,
    pub address: Option<u32>,
    pub text: String,
    pub code: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Listing {
    lines: Vec<ListingLine>,
}

impl Listing {
    pub(crate) fn push(&mut self, line: ListingLine) {
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[ListingLine] {
        &self.lines
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write!(writer, "{}", self)
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for line in &self.lines {
            let address = match line.address {
                Some(address) => format!("{:04X}", address),
                None => String::new(),
            };
            let code: String = line.code.iter().map(|b| format!("{:02X}", b)).collect();
            let row = format!(
                "{:>4}  {:>6}  {:<40}{}",
                line.number, address, line.text, code
            );
            writeln!(f, "{}", row.trim_end())?;
        }
        Ok(())
    }
}
