use crate::test::{asm_errors, assembled, object_text};
use crate::ErrorKind;

#[test]
fn rsub_takes_no_operand() {
    let source = "\
P         START     0
          RSUB
          END";

    assert_eq!(
        object_text(source),
        "HP     000000000003\n\
         T000000034F0000\n\
         E000000\n"
    );
}

#[test]
fn byte_constants() {
    let source = "\
P         START     0
          BYTE      C'EOF'
          BYTE      X'F1'
          END";

    assert_eq!(
        object_text(source),
        "HP     000000000004\n\
         T00000004454F46F1\n\
         E000000\n"
    );
}

#[test]
fn immediate_and_indirect_addressing() {
    let source = "\
P         START     0
          LDA       #3
          LDA       @PTR
PTR       WORD      0
          END";

    assert_eq!(
        object_text(source),
        "HP     000000000009\n\
         T00000009010003022000000000\n\
         E000000\n"
    );
}

#[test]
fn automatic_base_picks_the_nearest_backward_label() {
    let source = "\
P         START     0
FRONT     LDX       #0
          LDA       TAB
          RESB      3000
TAB       RESB      10
          END";

    // TAB sits 3000 bytes past the PC window; the assembler bases the
    // access on FRONT (address 0) without a BASE directive
    assert_eq!(
        object_text(source),
        "HP     000000000BC8\n\
         T00000006050000034BBE\n\
         E000000\n"
    );
}

#[test]
fn external_reference_in_an_instruction_promotes_to_format_4() {
    let source = "\
A         START     0
          EXTREF    X
          LDA       X
          END";

    assert_eq!(
        object_text(source),
        "HA     000000000004\n\
         RX     \n\
         T0000000403100000\n\
         M00000105+X\n\
         E000000\n"
    );
}

#[test]
fn difference_of_two_externals_in_word() {
    let source = "\
A         START     0
          EXTREF    X,Y
          WORD      X-Y
          END";

    assert_eq!(
        object_text(source),
        "HA     000000000003\n\
         RX     Y     \n\
         T00000003000000\n\
         M00000006+X\n\
         M00000006-Y\n\
         E000000\n"
    );
}

#[test]
fn extdef_produces_a_define_record() {
    let source = "\
A         START     0
          EXTDEF    T1,T2
T1        WORD      0
T2        WORD      0
          END";

    assert_eq!(
        object_text(source),
        "HA     000000000006\n\
         DT1    000000T2    000003\n\
         T00000006000000000000\n\
         E000000\n"
    );
}

#[test]
fn relocatable_word_gets_an_implicit_modification_record() {
    let source = "\
P         START     0
HERE      WORD      HERE
          END";

    assert_eq!(
        object_text(source),
        "HP     000000000003\n\
         T00000003000000\n\
         M00000006\n\
         E000000\n"
    );
}

#[test]
fn entry_point_comes_from_the_end_operand() {
    let source = "\
P         START     0
          WORD      0
MAIN      WORD      0
          END       MAIN";

    assert_eq!(
        object_text(source),
        "HP     000000000006\n\
         T00000006000000000000\n\
         E000003\n"
    );
}

#[test]
fn end_entry_must_be_a_first_section_symbol() {
    let source = "\
P         START     0
          WORD      0
          END       ELSEWHERE";

    let errors = asm_errors(source);
    assert_eq!(errors[0].kind, ErrorKind::UndefinedSymbol);
}

#[test]
fn nobase_clears_the_declared_base() {
    let source = "\
P         START     0
          BASE      TAB
          NOBASE
          LDA       TAB
          RESB      3000
TAB       RESB      10
          END";

    // without the declared base the automatic candidate is P (address 0),
    // so the displacement is TAB's own address
    assert_eq!(
        object_text(source),
        "HP     000000000BC5\n\
         T00000003034BBB\n\
         E000000\n"
    );
}

#[test]
fn undefined_operand_symbol_is_an_error() {
    let source = "\
P         START     0
          LDA       MISSING
          END";

    let errors = asm_errors(source);
    assert_eq!(errors[0].kind, ErrorKind::UndefinedSymbol);
    assert_eq!(errors[0].line, 2);
}

#[test]
fn listing_shows_literal_pools_under_a_star() {
    let source = "\
P         START     0
          LDA       =W'5'
          LTORG
          END";

    let assembly = assembled(source);
    let pool = assembly
        .listing
        .lines()
        .iter()
        .find(|l| l.text.contains('*'))
        .unwrap();
    assert_eq!(pool.address, Some(3));
    assert_eq!(pool.code, vec![0x00, 0x00, 0x05]);
    assert!(pool.text.contains("=W'5'"));
}

#[test]
fn format_4_output_is_independent_of_base_declarations() {
    let without_base = "\
P         START     0
          +LDA      FIVE
          +STA      FIVE
FIVE      WORD      5
          END";
    let with_base = "\
P         START     0
          BASE      FIVE
          +LDA      FIVE
          +STA      FIVE
FIVE      WORD      5
          END";

    assert_eq!(object_text(without_base), object_text(with_base));
}

#[test]
fn pass_locctr_matches_emitted_length() {
    let source = "\
P         START     0
          LDA       #1
          +LDA      #1
          CLEAR     A
          FIX
          BYTE      X'0102'
          END";

    let assembly = assembled(source);
    let lines = assembly.listing.lines();
    // each line's address delta equals the previous line's code length
    let mut expected = 0u32;
    for line in lines.iter().filter(|l| l.address.is_some()) {
        if line.text.contains("START") || line.text.contains("END") {
            continue;
        }
        assert_eq!(line.address, Some(expected));
        expected += line.code.len() as u32;
    }
}
