use pack_core::binary::{BinaryObject, HexError, HexErrorKind};

const EOF: &str = ":00000001FF";

fn parse(lines: &[&str], offset: u32) -> Result<BinaryObject, HexError> {
    BinaryObject::from_hex_lines("app.hex", lines, offset)
}

fn bytes_of(object: &BinaryObject) -> Vec<(u32, u8)> {
    object.memory().iter().map(|(a, v)| (a, *v)).collect()
}

#[test]
fn single_data_record() {
    let object = parse(&[":0100000001fe", EOF], 0).expect("valid hex");
    assert_eq!(bytes_of(&object), vec![(0, 0x01)]);
    assert_eq!(object.source(), "app.hex");
}

#[test]
fn file_offset_shifts_data() {
    let object = parse(&[":04000000DEADBEEFC4", EOF], 0x2000).unwrap();
    assert_eq!(
        bytes_of(&object),
        vec![(0x2000, 0xDE), (0x2001, 0xAD), (0x2002, 0xBE), (0x2003, 0xEF)]
    );
}

#[test]
fn extended_linear_address_sets_upper_bits() {
    let object = parse(&[":020000040800F2", ":02010000AABB98", EOF], 0).unwrap();
    assert_eq!(bytes_of(&object), vec![(0x0800_0100, 0xAA), (0x0800_0101, 0xBB)]);
}

#[test]
fn extended_segment_address_shifts_by_four() {
    let object = parse(&[":020000021000EC", ":0100020055A8", EOF], 0).unwrap();
    assert_eq!(bytes_of(&object), vec![(0x0001_0002, 0x55)]);
}

#[test]
fn start_address_records_are_ignored() {
    let object =
        parse(&[":0400000508000101ED", ":0400000300000100F8", ":0100000001fe", EOF], 0).unwrap();
    assert_eq!(bytes_of(&object), vec![(0, 0x01)]);
}

#[test]
fn blank_lines_and_surrounding_whitespace_are_skipped() {
    let object = parse(&["", "  :0100000001fe  ", "", EOF, ""], 0).unwrap();
    assert_eq!(object.memory().len(), 1);
}

#[test]
fn wrong_checksum_reports_line() {
    let err = parse(&[":0100000001fe", ":0100010001fe", EOF], 0).unwrap_err();
    assert_eq!(err.kind, HexErrorKind::InvalidChecksum);
    assert_eq!(err.line, 2);
    assert_eq!(err.to_string(), "app.hex:2: invalid checksum");
}

#[test]
fn missing_end_of_file_is_an_error() {
    let err = parse(&[":0100000001fe"], 0).unwrap_err();
    assert_eq!(err.kind, HexErrorKind::MissingEndOfFile);
    assert_eq!(err.file, "app.hex");
}

#[test]
fn data_after_end_of_file_is_an_error() {
    let err = parse(&[":0100000001fe", EOF, ":010001009965"], 0).unwrap_err();
    assert_eq!(err.kind, HexErrorKind::DataAfterEndOfFile);
    assert_eq!(err.line, 3);
}

#[test]
fn unknown_record_type_is_an_error() {
    let err = parse(&[":00000006FA", EOF], 0).unwrap_err();
    assert_eq!(err.kind, HexErrorKind::UnknownRecord(6));
    assert_eq!(err.line, 1);
}

#[test]
fn short_and_long_records_are_errors() {
    let short = parse(&[":01000000", EOF], 0).unwrap_err();
    assert_eq!(short.kind, HexErrorKind::TooShort);

    let long = parse(&[":0100000001fe00", EOF], 0).unwrap_err();
    assert_eq!(long.kind, HexErrorKind::TooLong);
}

#[test]
fn repeated_address_is_an_overwrite() {
    let err = parse(&[":0100000001fe", ":0100000001fe", EOF], 0).unwrap_err();
    assert_eq!(err.kind, HexErrorKind::Overwrite(0));
    assert_eq!(err.line, 2);
}

#[test]
fn padded_linearization_fills_gaps_with_erased_flash() {
    let object = parse(&[":04000000DEADBEEFC4", ":020010000102EB", EOF], 0x100).unwrap();
    let (bytes, start) = object.linearize_padded(0xFF);
    assert_eq!(start, 0x100);
    assert_eq!(bytes.len(), 0x12);
    assert_eq!(&bytes[..4], &[0xDE, 0xAD, 0xBE, 0xEF]);
    assert!(bytes[4..0x10].iter().all(|&b| b == 0xFF));
    assert_eq!(&bytes[0x10..], &[0x01, 0x02]);
}
