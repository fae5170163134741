use bitflags::bitflags;
use num::traits::ToPrimitive;
use num_derive::{FromPrimitive, ToPrimitive};
use util::EnumFromStr;
use util_derive::EnumFromStr;

bitflags! {
    /// The set of instruction formats a mnemonic may assemble to.
    ///
    /// Every SIC/XE mnemonic permits either format 1, format 2, or the
    /// format 3/4 pair; `F34` entries choose between 3 and 4 based on the
    /// `+` prefix on the source mnemonic.
    pub struct Formats: u8 {
        const F1  = 0b0001;
        const F2  = 0b0010;
        const F3  = 0b0100;
        const F4  = 0b1000;
        const F34 = Self::F3.bits | Self::F4.bits;
    }
}

/// The SIC/XE opcode table. Each variant's discriminant is its opcode byte.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, ToPrimitive, FromPrimitive, EnumFromStr)]
pub enum Opcode {
    //  Mnemonic      | Formats | Effect
    //----------------+---------+--------------------------------------------
    // Load / store   |         |
    LDA = 0x00,    // | 3/4     | A = MEM[m..m+3]
    LDX = 0x04,    // | 3/4     | X = MEM[m..m+3]
    LDL = 0x08,    // | 3/4     | L = MEM[m..m+3]
    LDB = 0x68,    // | 3/4     | B = MEM[m..m+3]
    LDS = 0x6C,    // | 3/4     | S = MEM[m..m+3]
    LDT = 0x74,    // | 3/4     | T = MEM[m..m+3]
    LDF = 0x70,    // | 3/4     | F = MEM[m..m+6]
    LDCH = 0x50,   // | 3/4     | A[low byte] = MEM[m]
    STA = 0x0C,    // | 3/4     | MEM[m..m+3] = A
    STX = 0x10,    // | 3/4     | MEM[m..m+3] = X
    STL = 0x14,    // | 3/4     | MEM[m..m+3] = L
    STB = 0x78,    // | 3/4     | MEM[m..m+3] = B
    STS = 0x7C,    // | 3/4     | MEM[m..m+3] = S
    STT = 0x84,    // | 3/4     | MEM[m..m+3] = T
    STF = 0x80,    // | 3/4     | MEM[m..m+6] = F
    STCH = 0x54,   // | 3/4     | MEM[m] = A[low byte]
    STSW = 0xE8,   // | 3/4     | MEM[m..m+3] = SW
    //----------------+---------+--------------------------------------------
    // Arithmetic     |         |
    ADD = 0x18,    // | 3/4     | A += MEM[m..m+3]
    SUB = 0x1C,    // | 3/4     | A -= MEM[m..m+3]
    MUL = 0x20,    // | 3/4     | A *= MEM[m..m+3]
    DIV = 0x24,    // | 3/4     | A /= MEM[m..m+3]
    COMP = 0x28,   // | 3/4     | SW = compare(A, MEM[m..m+3])
    TIX = 0x2C,    // | 3/4     | X += 1; SW = compare(X, MEM[m..m+3])
    //----------------+---------+--------------------------------------------
    // Logic          |         |
    AND = 0x40,    // | 3/4     | A &= MEM[m..m+3]
    OR = 0x44,     // | 3/4     | A |= MEM[m..m+3]
    //----------------+---------+--------------------------------------------
    // Jumps          |         |
    J = 0x3C,      // | 3/4     | PC = m
    JEQ = 0x30,    // | 3/4     | PC = m if SW says equal
    JGT = 0x34,    // | 3/4     | PC = m if SW says greater
    JLT = 0x38,    // | 3/4     | PC = m if SW says less
    JSUB = 0x48,   // | 3/4     | L = PC; PC = m
    RSUB = 0x4C,   // | 3/4     | PC = L (operand-less)
    //----------------+---------+--------------------------------------------
    // Floating point |         |
    ADDF = 0x58,   // | 3/4     | F += MEM[m..m+6]
    SUBF = 0x5C,   // | 3/4     | F -= MEM[m..m+6]
    MULF = 0x60,   // | 3/4     | F *= MEM[m..m+6]
    DIVF = 0x64,   // | 3/4     | F /= MEM[m..m+6]
    COMPF = 0x88,  // | 3/4     | SW = compare(F, MEM[m..m+6])
    //----------------+---------+--------------------------------------------
    // Devices        |         |
    RD = 0xD8,     // | 3/4     | A[low byte] = device MEM[m]
    WD = 0xDC,     // | 3/4     | device MEM[m] = A[low byte]
    TD = 0xE0,     // | 3/4     | SW = test device MEM[m]
    //----------------+---------+--------------------------------------------
    // System         |         |
    LPS = 0xD0,    // | 3/4     | load processor status from MEM[m]
    STI = 0xD4,    // | 3/4     | MEM[m..m+3] = interval timer
    SSK = 0xEC,    // | 3/4     | protection key of m = A
    //----------------+---------+--------------------------------------------
    // Register ops   |         |
    ADDR = 0x90,   // | 2       | r2 += r1
    SUBR = 0x94,   // | 2       | r2 -= r1
    MULR = 0x98,   // | 2       | r2 *= r1
    DIVR = 0x9C,   // | 2       | r2 /= r1
    COMPR = 0xA0,  // | 2       | SW = compare(r1, r2)
    SHIFTL = 0xA4, // | 2       | r1 <<= n (circular)
    SHIFTR = 0xA8, // | 2       | r1 >>= n (sign filled)
    RMO = 0xAC,    // | 2       | r2 = r1
    CLEAR = 0xB4,  // | 2       | r1 = 0
    TIXR = 0xB8,   // | 2       | X += 1; SW = compare(X, r1)
    SVC = 0xB0,    // | 2       | supervisor call n
    //----------------+---------+--------------------------------------------
    // Format 1       |         |
    FLOAT = 0xC0,  // | 1       | F = float(A)
    FIX = 0xC4,    // | 1       | A = int(F)
    NORM = 0xC8,   // | 1       | F = normalized(F)
    SIO = 0xF0,    // | 1       | start I/O channel program
    HIO = 0xF4,    // | 1       | halt I/O channel program
    TIO = 0xF8,    // | 1       | test I/O channel program
}

impl Opcode {
    /// The opcode byte as it appears in the first byte of an instruction.
    pub fn code(self) -> u8 {
        enum_to_u32(self) as u8
    }

    /// The formats this mnemonic may assemble to.
    pub fn formats(self) -> Formats {
        use self::Opcode::*;
        match self {
            FLOAT | FIX | NORM | SIO | HIO | TIO => Formats::F1,
            ADDR | SUBR | MULR | DIVR | COMPR | SHIFTL | SHIFTR | RMO | CLEAR | TIXR | SVC => {
                Formats::F2
            }
            _ => Formats::F34,
        }
    }
}

/// Register numbering used by the format 2 register fields.
///
/// There is no register 7; PC and SW follow F at 8 and 9.
#[derive(Clone, Copy, PartialEq, Eq, Debug, ToPrimitive, FromPrimitive, EnumFromStr)]
pub enum RegisterId {
    A = 0,  // Accumulator
    X = 1,  // Index
    L = 2,  // Linkage (JSUB return address)
    B = 3,  // Base
    S = 4,  // General
    T = 5,  // General
    F = 6,  // Floating point accumulator (48 bit)
    PC = 8, // Program counter
    SW = 9, // Status word
}

impl RegisterId {
    /// The register number as encoded in a format 2 register field.
    pub fn number(self) -> u8 {
        enum_to_u32(self) as u8
    }
}

/// Assembler directives. These share the mnemonic field with opcodes but
/// are recognized separately by the pass drivers; they never produce an
/// instruction word themselves.
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumFromStr)]
pub enum Directive {
    START,
    END,
    BYTE,
    WORD,
    RESB,
    RESW,
    BASE,
    NOBASE,
    LTORG,
    EQU,
    USE,
    CSECT,
    EXTDEF,
    EXTREF,
    ORG,
}

#[inline]
pub fn enum_to_u32<T: ToPrimitive + Copy>(val: T) -> u32 {
    val.to_u32().unwrap()
}

macro_rules! impl_enum_display {
    ($e:ty) => {
        impl std::fmt::Display for $e {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                std::fmt::Debug::fmt(self, f)
            }
        }
    };
}

impl_enum_display!(Opcode);
impl_enum_display!(RegisterId);
impl_enum_display!(Directive);
