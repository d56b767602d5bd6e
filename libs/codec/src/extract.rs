//! Transmission-level result extraction

use labwire_types::{AstmRecord, ExtractedResult};

/// Aggregate the ordered records of one transmission.
///
/// Identity fields come from the first Patient and Order records seen;
/// every Result record updates the `results`/`units`/`flags` maps keyed by
/// `test_id` (last occurrence wins within the transmission); Comment records
/// append. The returned aggregate may carry an empty `sample_id`; callers
/// treat that as "discard", not as an error.
pub fn extract_results(records: &[AstmRecord]) -> ExtractedResult {
    let mut extracted = ExtractedResult::default();
    let mut saw_patient = false;
    let mut saw_order = false;

    for record in records {
        match record {
            AstmRecord::Patient { patient_id, .. } => {
                if !saw_patient {
                    saw_patient = true;
                    extracted.patient_id = patient_id.clone();
                }
            }
            AstmRecord::Order {
                specimen_id,
                instrument_specimen_id,
                sample_id,
                ..
            } => {
                if !saw_order {
                    saw_order = true;
                    extracted.specimen_id = specimen_id.clone();
                    extracted.instrument_specimen_id = instrument_specimen_id.clone();
                    // The derived digit run is preferred; raw specimen fields
                    // are a fallback for instruments that send a bare ID.
                    extracted.sample_id = [sample_id, instrument_specimen_id, specimen_id]
                        .into_iter()
                        .find(|s| !s.is_empty())
                        .cloned()
                        .unwrap_or_default();
                }
            }
            AstmRecord::Result {
                test_id,
                value,
                units,
                abnormal_flags,
                ..
            } => {
                if !test_id.is_empty() {
                    extracted.results.insert(test_id.clone(), value.clone());
                    extracted.units.insert(test_id.clone(), units.clone());
                    extracted
                        .flags
                        .insert(test_id.clone(), abnormal_flags.clone());
                }
            }
            AstmRecord::Comment { comment_text, .. } => {
                extracted.comments.push(comment_text.clone());
            }
            AstmRecord::Terminator { .. } => {}
        }
    }

    extracted
}
