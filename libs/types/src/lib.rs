//! # Labwire Type Definitions
//!
//! Pure data structures shared across the analyzer gateway: typed ASTM
//! records, the per-transmission result aggregate, template definitions, and
//! the persisted result document. This crate contains no parsing, transport,
//! or storage logic; those belong to `labwire-codec` and the service crates.

pub mod extract;
pub mod records;
pub mod sample;
pub mod template;

pub use extract::ExtractedResult;
pub use records::AstmRecord;
pub use sample::{format_sample_no, sample_no_sequence, SAMPLE_NO_LEN};
pub use template::{
    FieldType, FieldValue, MessageField, TemplateData, TemplateField, TemplateStructure,
};
