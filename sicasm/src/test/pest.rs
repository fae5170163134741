use crate::parser::{parse_lines, LineBody, Rule, SicParser};
use ::pest::*;

#[test]
fn comment() {
    parses_to! {
        parser: SicParser,
        input: ". copy a record",
        rule: Rule::comment,
        tokens: [ comment(0, 15) ]
    };

    parses_to! {
        parser: SicParser,
        input: "   .indented",
        rule: Rule::comment,
        tokens: [ comment(0, 12) ]
    };
}

#[test]
fn labeled_statement() {
    parses_to! {
        parser: SicParser,
        input: "COPY START 1000",
        rule: Rule::statement,
        tokens: [ statement(0, 15, [
            label(0, 4),
            mnemonic(5, 10),
            operand(11, 15)
        ]) ]
    };
}

#[test]
fn unlabeled_statement() {
    parses_to! {
        parser: SicParser,
        input: "  LDA FIVE",
        rule: Rule::statement,
        tokens: [ statement(0, 10, [
            mnemonic(2, 5),
            operand(6, 10)
        ]) ]
    };
}

#[test]
fn quoted_operand_keeps_blanks() {
    parses_to! {
        parser: SicParser,
        input: "  LDA C'HI THERE'",
        rule: Rule::statement,
        tokens: [ statement(0, 17, [
            mnemonic(2, 5),
            operand(6, 17)
        ]) ]
    };
}

#[test]
fn extended_format_prefix() {
    parses_to! {
        parser: SicParser,
        input: "  +JSUB WRREC",
        rule: Rule::statement,
        tokens: [ statement(0, 13, [
            mnemonic(2, 7),
            operand(8, 13)
        ]) ]
    };
}

#[test]
fn label_only_line() {
    parses_to! {
        parser: SicParser,
        input: "ALONE",
        rule: Rule::statement,
        tokens: [ statement(0, 5, [ label(0, 5) ]) ]
    };
}

#[test]
fn trailing_remark_is_separate() {
    parses_to! {
        parser: SicParser,
        input: "  RSUB  return here",
        rule: Rule::statement,
        tokens: [ statement(0, 19, [
            mnemonic(2, 6),
            operand(8, 14),
            remark(15, 19)
        ]) ]
    };
}

#[test]
fn ident_rejects_punctuation() {
    fails_with! {
        parser: SicParser,
        input: "@X",
        rule: Rule::ident,
        positives: vec![Rule::ident],
        negatives: vec![],
        pos: 0
    };
}

#[test]
fn program() {
    let src = "COPY START 1000\n. note\n LDA X";

    parses_to! {
        parser: SicParser,
        input: src,
        rule: Rule::program,
        tokens: [ program(0, 29, [
            line(0, 15, [ statement(0, 15, [
                label(0, 4),
                mnemonic(5, 10),
                operand(11, 15)
            ]) ]),
            line(16, 22, [ comment(16, 22) ]),
            line(23, 29, [ statement(23, 29, [
                mnemonic(24, 27),
                operand(28, 29)
            ]) ]),
            EOI(29, 29)
        ]) ]
    };
}

#[test]
fn extraction_fields() {
    let lines = parse_lines("COPY  START  1000\n  +LDA BUFFER,X\n\n. remark").unwrap();

    // the blank line is dropped
    assert_eq!(lines.len(), 3);

    assert_eq!(lines[0].number, 1);
    assert_eq!(lines[0].label(), Some("COPY"));
    assert_eq!(lines[0].mnemonic(), Some("START"));
    assert_eq!(lines[0].operand(), Some("1000"));
    assert!(!lines[0].extended());

    assert_eq!(lines[1].number, 2);
    assert_eq!(lines[1].label(), None);
    assert_eq!(lines[1].mnemonic(), Some("LDA"));
    assert!(lines[1].extended());
    assert_eq!(lines[1].operand(), Some("BUFFER,X"));

    assert_eq!(lines[2].number, 4);
    assert_eq!(lines[2].body, LineBody::Comment);
    assert_eq!(lines[2].text, ". remark");
}
