//! Per-transmission result aggregate

use std::collections::HashMap;

/// Everything extracted from one analyzer transmission.
///
/// Built once by `labwire_codec::extract_results` and immutable afterwards.
/// `sample_id` may be empty; callers must treat that as "discard, do not
/// process further", not as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedResult {
    pub sample_id: String,
    pub patient_id: String,
    pub specimen_id: String,
    pub instrument_specimen_id: String,
    /// test_id -> measured value; last occurrence wins within a transmission.
    pub results: HashMap<String, String>,
    /// test_id -> units.
    pub units: HashMap<String, String>,
    /// test_id -> abnormal flags.
    pub flags: HashMap<String, String>,
    pub comments: Vec<String>,
}

impl ExtractedResult {
    /// Whether the transmission carried a usable sample identifier.
    pub fn has_sample_id(&self) -> bool {
        !self.sample_id.trim().is_empty()
    }
}
