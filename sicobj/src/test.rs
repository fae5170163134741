use crate::*;

fn sample_section() -> SectionRecords {
    let mut section = SectionRecords::new("COPY", 0x1000);
    section.push_bytes(0x1000, &[0x03, 0x20, 0x03]);
    section.push_bytes(0x1003, &[0x00, 0x00, 0x05]);
    section.close(6);
    section.entry = Some(0x1000);
    section
}

#[test]
fn text_records_split_at_cap() {
    let mut section = SectionRecords::new("BIG", 0);
    section.push_bytes(0, &[0xAA; 45]);
    section.close(45);

    assert_eq!(section.texts.len(), 2);
    assert_eq!(section.texts[0].start, 0);
    assert_eq!(section.texts[0].bytes.len(), TEXT_RECORD_CAP);
    assert_eq!(section.texts[1].start, TEXT_RECORD_CAP as u32);
    assert_eq!(section.texts[1].bytes.len(), 15);
}

#[test]
fn noncontiguous_bytes_start_a_new_record() {
    let mut section = SectionRecords::new("GAP", 0);
    section.push_bytes(0, &[1, 2, 3]);
    // a RESB-style gap
    section.push_bytes(0x100, &[4, 5]);
    section.close(0x102);

    assert_eq!(section.texts.len(), 2);
    assert_eq!(section.texts[1].start, 0x100);
}

#[test]
fn break_text_forces_a_boundary() {
    let mut section = SectionRecords::new("BRK", 0);
    section.push_bytes(0, &[1, 2, 3]);
    section.break_text();
    section.push_bytes(3, &[4]);
    section.close(4);

    assert_eq!(section.texts.len(), 2);
}

#[test]
fn record_text_format() {
    let program = ObjectProgram {
        sections: vec![sample_section()],
    };

    let mut out = Vec::new();
    write(&mut out, &program).unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "H\
         COPY  001000000006\n\
         T00100006032003000005\n\
         E001000\n"
    );
}

#[test]
fn modification_and_linkage_records() {
    let mut section = SectionRecords::new("RDREC", 0);
    section.defines.push(("RDREC".to_owned(), 0));
    section.refers.push("BUFFER".to_owned());
    section.refers.push("LENGTH".to_owned());
    section.push_bytes(0, &[0xB4, 0x10]);
    section.add_mod(ModRecord {
        address: 1,
        halfbytes: 5,
        symbol: Some((Sign::Plus, "BUFFER".to_owned())),
    });
    section.add_mod(ModRecord {
        address: 4,
        halfbytes: 6,
        symbol: None,
    });
    section.close(2);

    let program = ObjectProgram {
        sections: vec![section],
    };
    let mut out = Vec::new();
    write(&mut out, &program).unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "HRDREC 000000000002\n\
         DRDREC 000000\n\
         RBUFFERLENGTH\n\
         T00000002B410\n\
         M00000105+BUFFER\n\
         M00000406\n\
         E\n"
    );
}

#[test]
fn read_round_trip() {
    let program = ObjectProgram {
        sections: vec![sample_section()],
    };

    let mut out = Vec::new();
    write(&mut out, &program).unwrap();
    let parsed = read(&mut &out[..]).unwrap();

    assert_eq!(parsed, program);
}

#[test]
fn read_rejects_unknown_record() {
    let text = b"HCOPY  000000000000\nQ000000\n";
    assert!(read(&mut &text[..]).is_err());
}

#[test]
fn read_rejects_missing_end() {
    let text = b"HCOPY  000000000000\n";
    assert!(read(&mut &text[..]).is_err());
}
