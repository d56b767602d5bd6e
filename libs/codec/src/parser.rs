//! ASTM record parsing
//!
//! Turns one frame's content into typed [`AstmRecord`]s. The parser is
//! deliberately lenient: instrument firmware varies in how many positional
//! fields it emits, so short records are padded with empty strings and
//! unrecognized lines are dropped with a log. Nothing in this module returns
//! an error.

use crate::constants::record_type;
use labwire_types::AstmRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid digit pattern"));

/// Parse one frame into records.
///
/// Records are separated by CR or CRLF (lone LF tolerated), fields within a
/// record by `|`. The first field selects the record type; lines with an
/// unknown discriminator are skipped.
pub fn parse_frame(frame: &[u8]) -> Vec<AstmRecord> {
    let text = String::from_utf8_lossy(frame);
    let mut records = Vec::new();
    for line in text.split(['\r', '\n']) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(record) = parse_record(line) {
            records.push(record);
        }
    }
    records
}

fn parse_record(line: &str) -> Option<AstmRecord> {
    let fields: Vec<&str> = line.split('|').collect();
    match fields[0] {
        record_type::PATIENT => Some(AstmRecord::Patient {
            patient_id: field(&fields, 2),
            patient_name: field(&fields, 3),
            sex: field(&fields, 4),
            dob: field(&fields, 5),
        }),
        record_type::ORDER => {
            let specimen_id = field(&fields, 2);
            let instrument_specimen_id = field(&fields, 3);
            let sample_id = extract_sample_id(&instrument_specimen_id, &specimen_id);
            Some(AstmRecord::Order {
                specimen_id,
                instrument_specimen_id,
                sample_id,
                test_id: field(&fields, 4),
                priority: field(&fields, 5),
                requested_datetime: field(&fields, 6),
            })
        }
        record_type::RESULT => Some(AstmRecord::Result {
            test_id: field(&fields, 2),
            value: field(&fields, 3),
            units: field(&fields, 4),
            reference_range: field(&fields, 5),
            abnormal_flags: field(&fields, 6),
            status: field(&fields, 7),
        }),
        record_type::COMMENT => Some(AstmRecord::Comment {
            comment_type: field(&fields, 2),
            comment_text: field(&fields, 3),
        }),
        record_type::TERMINATOR => Some(AstmRecord::Terminator {
            terminator_code: field(&fields, 2),
        }),
        other => {
            debug!(record_type = other, "skipping unrecognized record");
            None
        }
    }
}

/// Positional field access; anything past the end of the line is empty.
fn field(fields: &[&str], index: usize) -> String {
    fields.get(index).copied().unwrap_or_default().to_string()
}

/// The sample number embedded in an Order record's specimen fields.
///
/// Instruments wrap it in component delimiters and padding, e.g.
/// `^^                   866^M`, so the first run of digits is taken from
/// `instrument_specimen_id`; the plain `specimen_id` field is consulted only
/// when the instrument field is empty.
fn extract_sample_id(instrument_specimen_id: &str, specimen_id: &str) -> String {
    let source = if instrument_specimen_id.is_empty() {
        specimen_id
    } else {
        instrument_specimen_id
    };
    DIGIT_RUN
        .find(source)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_record_per_nonempty_line() {
        let frame = b"P|1|PID001|Doe^Jane|F|19900101\rO|1||^^^251100001^M\rR|1|^^^^WBC^1|4.79\rL|1|N";
        let records = parse_frame(frame);
        assert_eq!(records.len(), 4);
        let codes: Vec<char> = records.iter().map(|r| r.type_code()).collect();
        assert_eq!(codes, vec!['P', 'O', 'R', 'L']);
    }

    #[test]
    fn short_records_pad_with_empty_fields() {
        let records = parse_frame(b"R|1\rP");
        assert_eq!(
            records[0],
            AstmRecord::Result {
                test_id: String::new(),
                value: String::new(),
                units: String::new(),
                reference_range: String::new(),
                abnormal_flags: String::new(),
                status: String::new(),
            }
        );
        assert_eq!(records[1].type_code(), 'P');
    }

    #[test]
    fn result_record_positional_layout() {
        let records = parse_frame(b"R|1|^^^^WBC^1|4.79|10^3/uL|3.0-15.0|N|F");
        assert_eq!(
            records[0],
            AstmRecord::Result {
                test_id: "^^^^WBC^1".to_string(),
                value: "4.79".to_string(),
                units: "10^3/uL".to_string(),
                reference_range: "3.0-15.0".to_string(),
                abnormal_flags: "N".to_string(),
                status: "F".to_string(),
            }
        );
    }

    #[test]
    fn order_record_derives_sample_id_from_digits() {
        let records = parse_frame(b"O|1||^^                   866^M|^^^^WBC\r");
        match &records[0] {
            AstmRecord::Order { sample_id, .. } => assert_eq!(sample_id, "866"),
            other => panic!("expected order record, got {other:?}"),
        }
    }

    #[test]
    fn order_sample_id_falls_back_to_specimen_id() {
        let records = parse_frame(b"O|1|251100001|");
        match &records[0] {
            AstmRecord::Order { sample_id, .. } => assert_eq!(sample_id, "251100001"),
            other => panic!("expected order record, got {other:?}"),
        }
    }

    #[test]
    fn unknown_and_header_lines_are_skipped() {
        let records = parse_frame(b"H|\\^&|||XN-330\rQ|1|ALL\rL|1|N");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].type_code(), 'L');
    }

    #[test]
    fn malformed_bytes_never_panic() {
        assert!(parse_frame(b"").is_empty());
        assert!(parse_frame(b"\r\r\n\r").is_empty());
        assert!(parse_frame(&[0xFF, 0xFE, b'\r']).is_empty());
        let records = parse_frame(b"|||\rR||||||||||extra|fields");
        assert_eq!(records.len(), 1);
    }
}
