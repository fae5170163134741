//! The standard SIC/XE relocatable object program format.
//!
//! An object program is line-oriented text: one record per line, the record
//! type in column 0. Each control section contributes a header (`H`) record,
//! optional define (`D`) and refer (`R`) records for its external symbols,
//! text (`T`) records carrying the object bytes, modification (`M`) records
//! describing the fields a linking loader must patch, and an end (`E`)
//! record, which on the first section names the transfer address.
//!
//! [`SectionRecords`] accumulates a section's records while code is being
//! generated: [`push_bytes`] appends object code, starting a fresh text
//! record whenever the current one is full or the new bytes are not
//! contiguous with it, and [`break_text`] forces a record boundary (used at
//! storage reservations and program-block switches).
//!
//! [`SectionRecords`]: struct.SectionRecords.html
//! [`push_bytes`]: struct.SectionRecords.html#method.push_bytes
//! [`break_text`]: struct.SectionRecords.html#method.break_text

use std::fs::File;
use std::io::prelude::*;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

/// Maximum number of object bytes one text record may carry.
pub const TEXT_RECORD_CAP: usize = 30;

/// Width of the name field in H, D and R records.
pub const NAME_WIDTH: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

impl Sign {
    fn glyph(self) -> char {
        match self {
            Sign::Plus => '+',
            Sign::Minus => '-',
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextRecord {
    pub start: u32,
    pub bytes: Vec<u8>,
}

/// A modification record: patch `halfbytes` half-bytes at `address` by
/// adding or subtracting a symbol value. `symbol` of `None` means the
/// program's own load address (intra-section relocation).
#[derive(Clone, Debug, PartialEq)]
pub struct ModRecord {
    pub address: u32,
    pub halfbytes: u8,
    pub symbol: Option<(Sign, String)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SectionRecords {
    pub name: String,
    pub start: u32,
    pub length: u32,
    pub defines: Vec<(String, u32)>,
    pub refers: Vec<String>,
    pub texts: Vec<TextRecord>,
    pub mods: Vec<ModRecord>,
    pub entry: Option<u32>,
    open: Option<TextRecord>,
}

impl SectionRecords {
    pub fn new(name: &str, start: u32) -> SectionRecords {
        SectionRecords {
            name: name.to_owned(),
            start,
            length: 0,
            defines: Vec::new(),
            refers: Vec::new(),
            texts: Vec::new(),
            mods: Vec::new(),
            entry: None,
            open: None,
        }
    }

    /// Append object bytes at `address`, splitting into as many text
    /// records as the 30-byte cap requires.
    pub fn push_bytes(&mut self, address: u32, bytes: &[u8]) {
        let mut address = address;
        let mut rest = bytes;

        while !rest.is_empty() {
            let contiguous = match self.open {
                Some(ref open) => {
                    open.start + open.bytes.len() as u32 == address
                        && open.bytes.len() < TEXT_RECORD_CAP
                }
                None => false,
            };

            if !contiguous {
                self.seal();
                self.open = Some(TextRecord {
                    start: address,
                    bytes: Vec::new(),
                });
            }

            // seal()/replacement above guarantees an open record here
            let open = self.open.as_mut().unwrap();
            let take = (TEXT_RECORD_CAP - open.bytes.len()).min(rest.len());
            open.bytes.extend_from_slice(&rest[..take]);
            address += take as u32;
            rest = &rest[take..];
        }
    }

    /// Force the next `push_bytes` to start a fresh text record.
    pub fn break_text(&mut self) {
        self.seal();
    }

    pub fn add_mod(&mut self, record: ModRecord) {
        self.mods.push(record);
    }

    /// Seal any open text record and stamp the section length.
    pub fn close(&mut self, length: u32) {
        self.seal();
        self.length = length;
    }

    fn seal(&mut self) {
        if let Some(record) = self.open.take() {
            if !record.bytes.is_empty() {
                self.texts.push(record);
            }
        }
    }
}

/// The control sections of one assembly, in source order.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ObjectProgram {
    pub sections: Vec<SectionRecords>,
}

fn clip(name: &str) -> &str {
    &name[..name.len().min(NAME_WIDTH)]
}

pub fn write<W: Write>(writer: &mut W, program: &ObjectProgram) -> io::Result<()> {
    for section in &program.sections {
        writeln!(
            writer,
            "H{:<width$}{:06X}{:06X}",
            clip(&section.name),
            section.start,
            section.length,
            width = NAME_WIDTH
        )?;

        if !section.defines.is_empty() {
            write!(writer, "D")?;
            for (name, address) in &section.defines {
                write!(writer, "{:<width$}{:06X}", clip(name), address, width = NAME_WIDTH)?;
            }
            writeln!(writer)?;
        }

        if !section.refers.is_empty() {
            write!(writer, "R")?;
            for name in &section.refers {
                write!(writer, "{:<width$}", clip(name), width = NAME_WIDTH)?;
            }
            writeln!(writer)?;
        }

        for text in &section.texts {
            write!(writer, "T{:06X}{:02X}", text.start, text.bytes.len())?;
            for byte in &text.bytes {
                write!(writer, "{:02X}", byte)?;
            }
            writeln!(writer)?;
        }

        for record in &section.mods {
            write!(writer, "M{:06X}{:02X}", record.address, record.halfbytes)?;
            if let Some((sign, name)) = &record.symbol {
                write!(writer, "{}{}", sign.glyph(), name)?;
            }
            writeln!(writer)?;
        }

        match section.entry {
            Some(address) => writeln!(writer, "E{:06X}", address)?,
            None => writeln!(writer, "E")?,
        }
    }
    Ok(())
}

fn invalid_data(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

fn field<'l>(line: &'l str, lo: usize, hi: usize) -> io::Result<&'l str> {
    line.get(lo..hi)
        .ok_or_else(|| invalid_data(format!("truncated record: {}", line)))
}

fn hex_field(line: &str, lo: usize, hi: usize) -> io::Result<u32> {
    let text = field(line, lo, hi)?;
    u32::from_str_radix(text, 16)
        .map_err(|_| invalid_data(format!("bad hex field \"{}\" in record: {}", text, line)))
}

pub fn read<R: BufRead>(reader: &mut R) -> io::Result<ObjectProgram> {
    let mut sections = Vec::new();
    let mut current: Option<SectionRecords> = None;

    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }

        let need_section = |current: Option<SectionRecords>| {
            current.ok_or_else(|| invalid_data(format!("record before H record: {}", line)))
        };

        match line.as_bytes()[0] {
            b'H' => {
                if let Some(section) = current.take() {
                    sections.push(section);
                }
                let name = field(&line, 1, 1 + NAME_WIDTH)?.trim_end().to_owned();
                let mut section = SectionRecords::new(&name, hex_field(&line, 7, 13)?);
                section.length = hex_field(&line, 13, 19)?;
                current = Some(section);
            }
            b'D' => {
                let mut section = need_section(current.take())?;
                let mut at = 1;
                while at < line.len() {
                    let name = field(&line, at, at + NAME_WIDTH)?.trim_end().to_owned();
                    let address = hex_field(&line, at + 6, at + 12)?;
                    section.defines.push((name, address));
                    at += 12;
                }
                current = Some(section);
            }
            b'R' => {
                let mut section = need_section(current.take())?;
                let mut at = 1;
                while at < line.len() {
                    let end = (at + NAME_WIDTH).min(line.len());
                    section.refers.push(field(&line, at, end)?.trim_end().to_owned());
                    at += NAME_WIDTH;
                }
                current = Some(section);
            }
            b'T' => {
                let mut section = need_section(current.take())?;
                let start = hex_field(&line, 1, 7)?;
                let count = hex_field(&line, 7, 9)? as usize;
                let mut bytes = Vec::with_capacity(count);
                for i in 0..count {
                    bytes.push(hex_field(&line, 9 + 2 * i, 11 + 2 * i)? as u8);
                }
                section.texts.push(TextRecord { start, bytes });
                current = Some(section);
            }
            b'M' => {
                let mut section = need_section(current.take())?;
                let address = hex_field(&line, 1, 7)?;
                let halfbytes = hex_field(&line, 7, 9)? as u8;
                let symbol = if line.len() > 9 {
                    let sign = match line.as_bytes()[9] {
                        b'+' => Sign::Plus,
                        b'-' => Sign::Minus,
                        other => {
                            return Err(invalid_data(format!(
                                "bad modification sign: {}",
                                other as char
                            )))
                        }
                    };
                    Some((sign, line[10..].trim_end().to_owned()))
                } else {
                    None
                };
                section.add_mod(ModRecord {
                    address,
                    halfbytes,
                    symbol,
                });
                current = Some(section);
            }
            b'E' => {
                let mut section = need_section(current.take())?;
                section.entry = if line.len() > 1 {
                    Some(hex_field(&line, 1, 7)?)
                } else {
                    None
                };
                sections.push(section);
            }
            other => {
                return Err(invalid_data(format!("unknown record type: {}", other as char)));
            }
        }
    }

    if let Some(section) = current {
        return Err(invalid_data(format!(
            "section {} has no E record",
            section.name
        )));
    }

    Ok(ObjectProgram { sections })
}

pub trait ReadObjExt: BufRead + Sized {
    fn read_obj(&mut self) -> io::Result<ObjectProgram> {
        read(self)
    }
}

impl<R: BufRead + Sized> ReadObjExt for R {}

pub trait WriteObjExt: Write + Sized {
    fn write_obj(&mut self, program: &ObjectProgram) -> io::Result<()> {
        write(self, program)
    }
}

impl<W: Write + Sized> WriteObjExt for W {}

pub fn read_file<P: AsRef<Path>>(path: P) -> io::Result<ObjectProgram> {
    BufReader::new(File::open(path)?).read_obj()
}

pub fn write_file<P: AsRef<Path>>(path: P, program: &ObjectProgram) -> io::Result<()> {
    BufWriter::new(File::create(path)?).write_obj(program)
}

#[cfg(test)]
mod test;
