//! Two-pass macro assembler for the SIC/XE architecture.
//!
//! The entry point is [`assemble`], which takes source text and returns an
//! [`Assembly`]: the relocatable object program (in the standard H/D/R/T/M/E
//! record format, see the `sicobj` crate) together with the side-by-side
//! [`Listing`].
//!
//! Lines are split into fields with [pest]; everything after that is a
//! linear pipeline: the macro preprocessor rewrites the line stream, Pass 1
//! assigns addresses and builds the per-section symbol and literal tables,
//! and Pass 2 generates object code and records. When Pass 2 finds a
//! format 3 instruction whose operand no addressing mode can reach, the
//! instruction is promoted to format 4 and both passes rerun, so that the
//! two passes always agree on every address in the final output.
//!
//! # Source format
//!
//! One statement per line. A non-blank character in column 0 starts a
//! label; the mnemonic and the operand field follow, whitespace-separated.
//! Anything after the operand field is a remark. Lines whose first
//! non-blank character is `.` are comments.
//!
//! ```text
//! COPY    START   1000        initial address (hex)
//! FIRST   STL     RETADR
//!         LDB     #LENGTH
//!         BASE    LENGTH
//!         +JSUB   WRREC       explicit format 4
//!         LDA     BUFFER,X    indexed
//!         LDCH    @PTR        indirect
//!         AND     #4095       immediate
//!         LDT     =C'EOF'     literal
//!         END     FIRST
//! ```
//!
//! ## Directives
//!
//! Directive        | Effect
//! -----------------|---------------------------------------------------
//! `START n`        | name the program, begin at hex address `n`
//! `END [sym]`      | end of source; optional entry point
//! `BYTE c`         | emit a `C'...'` or `X'...'` constant
//! `WORD expr`      | emit one 3-byte word
//! `RESB n` / `RESW n` | reserve `n` bytes / words
//! `BASE sym` / `NOBASE` | declare or clear the base register value
//! `LTORG`          | place all pending literals here
//! `EQU expr`       | define the label to the expression value
//! `ORG expr`       | move the location counter
//! `USE [name]`     | switch program block
//! `CSECT`          | begin a new control section (label = name)
//! `EXTDEF a,b`     | export symbols from this section
//! `EXTREF a,b`     | import symbols into this section
//!
//! ## Addressing
//!
//! Operands take `#` (immediate), `@` (indirect), or neither (simple), and
//! an optional `,X` index suffix. Format 3 displacements are chosen
//! PC-relative first, then base-relative against the declared `BASE`, then
//! against an automatic base candidate; a target no mode reaches promotes
//! the instruction to format 4. `=C'...'`, `=X'...'` and `=W'n'` literals
//! are pooled per section at `LTORG`/`END`.
//!
//! ## Macros
//!
//! `NAME MACRO &A,&B` ... `MEND` defines a macro; invoking `NAME` splices
//! in its body with `&A`/`&B` replaced by the actual arguments. Macros are
//! global across control sections; definitions may not nest and a macro
//! may not appear in its own expansion.
//!
//! [pest]: https://docs.rs/pest/
//! [`assemble`]: fn.assemble.html
//! [`Assembly`]: struct.Assembly.html
//! [`Listing`]: struct.Listing.html

mod error;
mod expr;
mod listing;
mod literals;
mod macros;
mod operand;
mod parser;
mod pass1;
mod pass2;
mod symbols;


use std::collections::BTreeSet;

pub use error::{AsmError, Error, ErrorKind};
pub use listing::{Listing, ListingLine};
pub use parser::{LineBody, Rule, SourceLine};

pub type Result<T> = std::result::Result<T, Error>;

/// The two artifacts of a successful assembly.
pub struct Assembly {
    pub object: sicobj::ObjectProgram,
    pub listing: Listing,
}

pub fn assemble(input: &str) -> Result<Assembly> {
    let lines = parser::parse_lines(input)?;
    let expanded = macros::expand(lines)?;

    let mut promoted = BTreeSet::new();
    loop {
        let pass1 = pass1::run(&expanded, &promoted)?;
        match pass2::run(&pass1)? {
            pass2::Outcome::Done(object, listing) => return Ok(Assembly { object, listing }),
            // the set only grows, so the loop reaches a fixpoint
            pass2::Outcome::Promote(more) => promoted.extend(more),
        }
    }
}
