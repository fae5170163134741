use crate::error::{AsmError, ErrorKind};
use crate::macros;
use crate::parser::{self, LineBody, SourceLine};

fn expand(source: &str) -> Result<Vec<SourceLine>, AsmError> {
    macros::expand(parser::parse_lines(source).unwrap())
}

fn statements(lines: &[SourceLine]) -> Vec<&SourceLine> {
    lines
        .iter()
        .filter(|l| matches!(l.body, LineBody::Statement { .. }))
        .collect()
}

#[test]
fn invocation_is_replaced_by_the_substituted_body() {
    let source = "\
RDBUFF    MACRO     &D
          OPEN      &D
          READ      &D
          MEND
          RDBUFF    INPUT";

    let lines = expand(source).unwrap();

    for line in &lines {
        assert_ne!(line.mnemonic(), Some("MACRO"));
        assert_ne!(line.mnemonic(), Some("MEND"));
    }

    let stmts = statements(&lines);
    assert_eq!(stmts.len(), 2);
    assert_eq!(stmts[0].mnemonic(), Some("OPEN"));
    assert_eq!(stmts[0].operand(), Some("INPUT"));
    assert_eq!(stmts[0].number, 5);
    assert_eq!(stmts[1].mnemonic(), Some("READ"));
    assert_eq!(stmts[1].operand(), Some("INPUT"));
}

#[test]
fn definition_lines_stay_as_comments() {
    let source = "\
M         MACRO
          LDA       X
          MEND";

    let lines = expand(source).unwrap();
    assert_eq!(lines.len(), 3);
    for line in &lines {
        assert_eq!(line.body, LineBody::Comment);
    }
    // the original text survives for the listing
    assert!(lines[0].text.contains("MACRO"));
}

#[test]
fn a_macro_may_invoke_an_earlier_macro() {
    let source = "\
INNER     MACRO     &A
          LDA       &A
          MEND
OUTER     MACRO     &B
          INNER     &B
          MEND
          OUTER     FIVE";

    let lines = expand(source).unwrap();
    let stmts = statements(&lines);
    assert_eq!(stmts.len(), 1);
    assert_eq!(stmts[0].mnemonic(), Some("LDA"));
    assert_eq!(stmts[0].operand(), Some("FIVE"));
}

#[test]
fn recursion_is_an_error() {
    let source = "\
LOOPY     MACRO
          LOOPY
          MEND
          LOOPY";

    let error = expand(source).unwrap_err();
    assert_eq!(error.kind, ErrorKind::Macro);
}

#[test]
fn argument_count_mismatch_is_an_error() {
    let source = "\
RDBUFF    MACRO     &D
          OPEN      &D
          MEND
          RDBUFF";

    let error = expand(source).unwrap_err();
    assert_eq!(error.kind, ErrorKind::Macro);
    assert_eq!(error.line, 4);
}

#[test]
fn mend_outside_a_definition_is_an_error() {
    let error = expand("          MEND").unwrap_err();
    assert_eq!(error.kind, ErrorKind::Macro);
}

#[test]
fn unterminated_definition_is_an_error() {
    let source = "\
M         MACRO
          LDA       X";

    let error = expand(source).unwrap_err();
    assert_eq!(error.kind, ErrorKind::Macro);
}

#[test]
fn nested_definitions_are_an_error() {
    let source = "\
A         MACRO
B         MACRO
          MEND
          MEND";

    let error = expand(source).unwrap_err();
    assert_eq!(error.kind, ErrorKind::Macro);
    assert_eq!(error.line, 2);
}

#[test]
fn substitution_stops_at_identifier_boundaries() {
    let source = "\
M         MACRO     &B
          LDA       &B2
          STA       &B
          MEND
          M         Z";

    let lines = expand(source).unwrap();
    let stmts = statements(&lines);
    assert_eq!(stmts[0].operand(), Some("&B2"));
    assert_eq!(stmts[1].operand(), Some("Z"));
}

#[test]
fn arguments_split_outside_quotes_only() {
    let source = "\
M         MACRO     &A,&B
          BYTE      &A
          BYTE      &B
          MEND
          M         C'X,Y',X'05'";

    let lines = expand(source).unwrap();
    let stmts = statements(&lines);
    assert_eq!(stmts[0].operand(), Some("C'X,Y'"));
    assert_eq!(stmts[1].operand(), Some("X'05'"));
}
