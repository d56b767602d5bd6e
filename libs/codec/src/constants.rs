//! Wire-protocol constants
//!
//! Control bytes and record-type codes of the simplified ASTM E1394-97
//! dialect the gateway speaks. These values are fixed by the standard and
//! must stay stable across every instrument integration.

/// Start of text: opens a frame.
pub const STX: u8 = 0x02;
/// End of text: closes a frame.
pub const ETX: u8 = 0x03;
/// End of transmission.
pub const EOT: u8 = 0x04;
/// Enquiry, sent by instruments that run the full handshake.
pub const ENQ: u8 = 0x05;
/// Acknowledge: the gateway's reply to each processed frame.
pub const ACK: u8 = 0x06;
/// Negative acknowledge. Defined for completeness; the gateway never sends
/// it (failures are answered with silence).
pub const NAK: u8 = 0x15;
/// Carriage return: record separator within a frame.
pub const CR: u8 = 0x0D;
/// Line feed, tolerated alongside CR as a record separator.
pub const LF: u8 = 0x0A;
/// Field separator within a record.
pub const FIELD_DELIMITER: u8 = b'|';

/// Record-type discriminators (field 0 of each record).
pub mod record_type {
    pub const PATIENT: &str = "P";
    pub const ORDER: &str = "O";
    pub const RESULT: &str = "R";
    pub const COMMENT: &str = "C";
    pub const TERMINATOR: &str = "L";
}
