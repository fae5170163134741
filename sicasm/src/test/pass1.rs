use std::collections::BTreeSet;

use crate::error::{AsmError, ErrorKind};
use crate::pass1::{self, Pass1};
use crate::symbols::SymbolKind;
use crate::{macros, parser};

fn assign(source: &str) -> Pass1 {
    let expanded = macros::expand(parser::parse_lines(source).unwrap()).unwrap();
    pass1::run(&expanded, &BTreeSet::new()).unwrap()
}

fn assign_errors(source: &str) -> Vec<AsmError> {
    let expanded = macros::expand(parser::parse_lines(source).unwrap()).unwrap();
    pass1::run(&expanded, &BTreeSet::new()).unwrap_err()
}

#[test]
fn start_operand_is_hexadecimal() {
    let pass1 = assign("P         START     100\n          END");
    assert_eq!(pass1.sections[0].start, 0x100);
}

#[test]
fn labels_get_the_location_counter() {
    let source = "\
COPY      START     1000
          LDA       FIVE
FIVE      WORD      5
          END";

    let pass1 = assign(source);
    let section = &pass1.sections[0];
    assert_eq!(section.symbols.get("COPY").unwrap().value, 0x1000);
    assert_eq!(section.symbols.get("FIVE").unwrap().value, 0x1003);
    assert_eq!(section.length, 6);
}

#[test]
fn program_blocks_are_concatenated_in_first_use_order() {
    let source = "\
P         START     0
          LDA       DATA
          USE       CDATA
DATA      WORD      3
          USE
          LDX       DATA
          END";

    let pass1 = assign(source);
    let section = &pass1.sections[0];

    // default block holds 6 bytes, CDATA starts right after it
    assert_eq!(section.symbols.get("DATA").unwrap().value, 6);
    assert_eq!(section.length, 9);

    // the LDX resumed the default block at offset 3
    let ldx = pass1
        .lines
        .iter()
        .find(|l| l.line.mnemonic() == Some("LDX"))
        .unwrap();
    assert_eq!(ldx.address, Some(3));
}

#[test]
fn equ_of_a_difference_is_absolute() {
    let source = "\
P         START     0
B         RESB      6
LEN       EQU       *-B
          END";

    let pass1 = assign(source);
    let len = pass1.sections[0].symbols.get("LEN").unwrap();
    assert_eq!(len.value, 6);
    assert_eq!(len.kind, SymbolKind::Equate);
    assert!(!len.relocatable);
}

#[test]
fn org_moves_the_location_counter_without_shrinking_the_block() {
    let source = "\
P         START     0
B         RESB      10
          ORG       B
C         RESB      4
          ORG       B+10
          END";

    let pass1 = assign(source);
    let section = &pass1.sections[0];
    assert_eq!(section.symbols.get("C").unwrap().value, 0);
    assert_eq!(section.length, 10);
}

#[test]
fn each_section_has_its_own_namespace() {
    let source = "\
MAIN      START     0
LOOP      J         LOOP
SUB       CSECT
LOOP      J         LOOP
          END";

    let pass1 = assign(source);
    assert_eq!(pass1.sections.len(), 2);
    assert_eq!(pass1.sections[0].symbols.get("LOOP").unwrap().value, 0);
    assert_eq!(pass1.sections[1].symbols.get("LOOP").unwrap().value, 0);
    assert_eq!(pass1.sections[1].name, "SUB");
}

#[test]
fn duplicate_label_in_one_section_is_an_error() {
    let source = "\
P         START     0
A         WORD      1
A         WORD      2
          END";

    let errors = assign_errors(source);
    assert_eq!(errors[0].kind, ErrorKind::DuplicateSymbol);
    assert_eq!(errors[0].line, 3);
}

#[test]
fn extref_names_are_external_symbols() {
    let source = "\
A         START     0
          EXTREF    X,Y
          END";

    let pass1 = assign(source);
    let section = &pass1.sections[0];
    assert_eq!(section.extrefs, vec!["X".to_owned(), "Y".to_owned()]);
    assert_eq!(section.symbols.get("X").unwrap().kind, SymbolKind::External);
}

#[test]
fn extdef_of_an_undefined_symbol_is_an_error() {
    let source = "\
A         START     0
          EXTDEF    NOPE
          END";

    let errors = assign_errors(source);
    assert_eq!(errors[0].kind, ErrorKind::UndefinedSymbol);
    assert_eq!(errors[0].line, 2);
}

#[test]
fn pending_literals_move_ahead_of_a_large_reservation() {
    let source = "\
C         START     0
          LDA       =C'EOF'
BUF       RESB      4096
          END";

    let pass1 = assign(source);
    let section = &pass1.sections[0];
    assert_eq!(section.literals.address_of("=C'EOF'"), Some(3));
    assert_eq!(section.symbols.get("BUF").unwrap().value, 6);
}

#[test]
fn identical_literals_share_one_address() {
    let source = "\
P         START     0
          LDA       =X'05'
          LDX       =X'05'
          LTORG
          END";

    let pass1 = assign(source);
    assert_eq!(pass1.sections[0].literals.address_of("=X'05'"), Some(6));
    assert_eq!(
        pass1
            .lines
            .iter()
            .filter(|l| matches!(l.kind, pass1::LineKind::Literal(_)))
            .count(),
        1
    );
}

#[test]
fn odd_hex_literal_is_an_error() {
    let source = "\
P         START     0
          LDA       =X'F10'
          END";

    let errors = assign_errors(source);
    assert_eq!(errors[0].kind, ErrorKind::Literal);
}

#[test]
fn extended_prefix_on_a_format_2_mnemonic_is_an_error() {
    let source = "\
P         START     0
          +CLEAR    X
          END";

    let errors = assign_errors(source);
    assert_eq!(errors[0].kind, ErrorKind::Format);
}

#[test]
fn end_records_the_entry_operand() {
    let source = "\
P         START     0
          END       P";

    let pass1 = assign(source);
    assert_eq!(pass1.end_operand, Some((2, Some("P".to_owned()))));
}
