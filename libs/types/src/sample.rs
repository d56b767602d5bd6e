//! Sample-number format helpers
//!
//! Sample numbers are 9 characters, `YYMMNNNNN`: two-digit year, two-digit
//! month, five-digit sequence. Example: `251100001` is the first sample
//! issued in November 2025. The sequence is shared across the outpatient and
//! inpatient stores so a number is never issued twice in a month.

/// Length of a well-formed sample number.
pub const SAMPLE_NO_LEN: usize = 9;

/// Render a sample number from a `YYMM` prefix and a sequence value.
pub fn format_sample_no(prefix: &str, sequence: u32) -> String {
    format!("{prefix}{sequence:05}")
}

/// Extract the sequence value from a sample number carrying the given
/// `YYMM` prefix. Returns `None` for anything malformed, from a different
/// month, or with a non-numeric tail.
pub fn sample_no_sequence(sample_no: &str, prefix: &str) -> Option<u32> {
    let sample_no = sample_no.trim();
    if sample_no.len() != SAMPLE_NO_LEN || !sample_no.starts_with(prefix) || prefix.len() != 4 {
        return None;
    }
    sample_no[prefix.len()..].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_zero_padding() {
        assert_eq!(format_sample_no("2511", 1), "251100001");
        assert_eq!(format_sample_no("2602", 12345), "260212345");
    }

    #[test]
    fn sequence_round_trips() {
        assert_eq!(sample_no_sequence("251100001", "2511"), Some(1));
        assert_eq!(sample_no_sequence(" 251100042 ", "2511"), Some(42));
    }

    #[test]
    fn rejects_other_months_and_malformed_input() {
        assert_eq!(sample_no_sequence("251200001", "2511"), None);
        assert_eq!(sample_no_sequence("25110001", "2511"), None);
        assert_eq!(sample_no_sequence("2511abcde", "2511"), None);
        assert_eq!(sample_no_sequence("", "2511"), None);
    }
}
