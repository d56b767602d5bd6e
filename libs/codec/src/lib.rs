//! # Labwire Protocol Codec
//!
//! ## Purpose
//!
//! The "rules" layer of the analyzer gateway: everything needed to turn a raw
//! analyzer byte stream into an [`ExtractedResult`], and nothing else.
//! Clinical instruments speak a simplified ASTM E1394-97 dialect over TCP
//! (STX/ETX-framed transmissions of pipe-delimited records), and firmware
//! variation makes leniency a protocol requirement, not a convenience.
//!
//! ## Integration Points
//!
//! - **Input**: raw bytes from the service crate's socket reads, accumulated
//!   in a [`FrameDecoder`] that survives partial delivery across TCP segments
//! - **Output**: typed [`AstmRecord`]s and the per-transmission
//!   [`ExtractedResult`] aggregate, ready for code mapping
//! - **Error handling**: the parsing layer is lenient by contract; missing
//!   fields become empty strings and unrecognized lines are dropped with a
//!   log; no error ever escapes this crate
//!
//! ## Architecture Role
//!
//! ```text
//! services/analyzer → [labwire-codec] → libs/types
//!       ↑                   ↓                ↓
//!  Socket reads        Framing rules     Pure data
//!  ACK writes          Record parsing    AstmRecord
//!  Dispatch            Extraction        ExtractedResult
//! ```
//!
//! Socket management, code mapping, and persistence live in the service
//! crate; data definitions live in `labwire-types`.

pub mod constants;
pub mod extract;
pub mod framing;
pub mod parser;

pub use constants::*;
pub use extract::extract_results;
pub use framing::FrameDecoder;
pub use parser::parse_frame;

pub use labwire_types::{AstmRecord, ExtractedResult};
