//! Instruction-set definitions for the SIC/XE architecture.
//!
//! This crate knows nothing about assembling source text; it defines the
//! architecture as data: the opcode table ([`Opcode`], with each mnemonic's
//! opcode byte and permitted instruction formats), the register numbering
//! ([`RegisterId`]), the assembler directive vocabulary ([`Directive`]),
//! the bit layout of the four instruction formats ([`constants`]), and the
//! pure functions that pack an opcode, addressing flags, and a displacement
//! or address into an instruction word ([`make_format1`] through
//! [`make_format4`]).
//!
//! SIC/XE is big-endian with a 24-bit word. Format 3 and format 4
//! instructions carry six addressing flags:
//!
//! Flag | Meaning
//! -----|---------------------------------------------
//! `n`  | indirect addressing
//! `i`  | immediate addressing
//! `x`  | indexed (register X is added to the target)
//! `b`  | base-relative displacement
//! `p`  | program-counter-relative displacement
//! `e`  | extended (format 4, 20-bit address field)
//!
//! [`Opcode`]: enum.Opcode.html
//! [`RegisterId`]: enum.RegisterId.html
//! [`Directive`]: enum.Directive.html
//! [`constants`]: constants/index.html
//! [`make_format1`]: fn.make_format1.html
//! [`make_format4`]: fn.make_format4.html

pub mod constants;

mod enums;
mod instructions;

pub use enums::*;
pub use instructions::*;

/// An instruction word. Formats 1 through 3 use only the low 8, 16 and
/// 24 bits respectively; format 4 uses all 32.
pub type Word = u32;

/// A 20-bit SIC/XE memory address.
pub type Address = u32;
