//! Typed ASTM records
//!
//! One variant per record type the gateway understands. The parser produces
//! these directly; downstream code never sees raw field vectors.

/// A single pipe-delimited line within an ASTM frame, tagged by its
/// record-type discriminator (the first field).
///
/// All fields are plain strings. Instrument firmware varies in how many
/// positional fields it emits, so any position missing from the wire is
/// carried as an empty string rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstmRecord {
    /// Patient (P) record: demographics for the specimen owner.
    Patient {
        patient_id: String,
        patient_name: String,
        sex: String,
        dob: String,
    },
    /// Order (O) record: identifies the specimen and the requested panel.
    Order {
        specimen_id: String,
        instrument_specimen_id: String,
        /// First run of ASCII digits found in `instrument_specimen_id`,
        /// falling back to `specimen_id` when the instrument field is empty.
        sample_id: String,
        test_id: String,
        priority: String,
        requested_datetime: String,
    },
    /// Result (R) record: one measured value.
    Result {
        test_id: String,
        value: String,
        units: String,
        reference_range: String,
        abnormal_flags: String,
        status: String,
    },
    /// Comment (C) record.
    Comment {
        comment_type: String,
        comment_text: String,
    },
    /// Terminator (L) record: closes a transmission.
    Terminator { terminator_code: String },
}

impl AstmRecord {
    /// The single-character record-type code this variant corresponds to.
    pub fn type_code(&self) -> char {
        match self {
            AstmRecord::Patient { .. } => 'P',
            AstmRecord::Order { .. } => 'O',
            AstmRecord::Result { .. } => 'R',
            AstmRecord::Comment { .. } => 'C',
            AstmRecord::Terminator { .. } => 'L',
        }
    }
}
