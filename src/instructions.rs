use crate::constants::*;
use crate::enums::*;
use crate::{Address, Word};

/// A concrete instruction format chosen for one source line.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Format {
    One,
    Two,
    Three,
    Four,
}

impl Format {
    /// Instruction length in bytes.
    pub fn length(self) -> u32 {
        match self {
            Format::One => 1,
            Format::Two => 2,
            Format::Three => 3,
            Format::Four => 4,
        }
    }
}

/// Addressing flags of a format 3 or format 4 instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Flags {
    pub n: bool,
    pub i: bool,
    pub x: bool,
    pub b: bool,
    pub p: bool,
    pub e: bool,
}

impl Flags {
    /// Simple addressing (n=1, i=1).
    pub fn simple() -> Flags {
        Flags {
            n: true,
            i: true,
            ..Flags::default()
        }
    }

    /// Immediate addressing (n=0, i=1).
    pub fn immediate() -> Flags {
        Flags {
            i: true,
            ..Flags::default()
        }
    }

    /// Indirect addressing (n=1, i=0).
    pub fn indirect() -> Flags {
        Flags {
            n: true,
            ..Flags::default()
        }
    }
}

#[inline]
pub fn make_format1(oc: Opcode) -> Word {
    Word::from(oc.code())
}

#[inline]
pub fn make_format2(oc: Opcode, r1: u8, r2: u8) -> Word {
    (Word::from(oc.code()) << BYTE_WIDTH)
        | Word::from((u16::from(r1) << F2_R1_OFFSET) & F2_R1_MASK)
        | Word::from(u16::from(r2) & F2_R2_MASK)
}

pub fn make_format3(oc: Opcode, flags: Flags, disp: u32) -> Word {
    let mut word = ((Word::from(oc.code()) << (WORD_WIDTH - BYTE_WIDTH)) & F3_OPCODE_MASK)
        | (disp & F3_DISP_MASK);
    if flags.n {
        word |= F3_FLAG_N;
    }
    if flags.i {
        word |= F3_FLAG_I;
    }
    if flags.x {
        word |= F3_FLAG_X;
    }
    if flags.b {
        word |= F3_FLAG_B;
    }
    if flags.p {
        word |= F3_FLAG_P;
    }
    if flags.e {
        word |= F3_FLAG_E;
    }
    word
}

pub fn make_format4(oc: Opcode, flags: Flags, addr: Address) -> Word {
    let mut word = ((Word::from(oc.code()) << 24) & F4_OPCODE_MASK) | (addr & F4_ADDR_MASK);
    if flags.n {
        word |= F4_FLAG_N;
    }
    if flags.i {
        word |= F4_FLAG_I;
    }
    if flags.x {
        word |= F4_FLAG_X;
    }
    if flags.b {
        word |= F4_FLAG_B;
    }
    if flags.p {
        word |= F4_FLAG_P;
    }
    word | F4_FLAG_E
}
