//! GDS report IDs.
//!
//! The report ID is the one-byte wire discriminator in front of every frame.
//! IDs are globally unique, with one documented exception: 0x07 carries the
//! GAT data report on standard devices and the card data report on the
//! card-reader variant. That collision is resolved when the message registry
//! is built, never while parsing.

/// Transaction acknowledge / resync.
pub const ACK: u8 = 0x01;

/// Enable command (no payload).
pub const ENABLE: u8 = 0x02;

/// Disable command (no payload).
pub const DISABLE: u8 = 0x03;

/// Self-test command.
pub const SELF_TEST: u8 = 0x04;

/// Unsolicited power status report.
pub const POWER_STATUS: u8 = 0x06;

/// GAT data chunk (standard) or card data (card-reader variant).
pub const GAT_DATA: u8 = 0x07;

/// CRC calculation request.
pub const CRC_REQUEST: u8 = 0x08;

/// CRC calculation result.
pub const CRC_DATA: u8 = 0x09;

/// Enabled/disabled state report.
pub const DEVICE_STATE: u8 = 0x0A;

/// Returns a human-readable name for a report ID.
pub fn report_name(id: u8) -> &'static str {
    match id {
        ACK => "ACK",
        ENABLE => "ENABLE",
        DISABLE => "DISABLE",
        SELF_TEST => "SELF_TEST",
        POWER_STATUS => "POWER_STATUS",
        GAT_DATA => "GAT_DATA",
        CRC_REQUEST => "CRC_REQUEST",
        CRC_DATA => "CRC_DATA",
        DEVICE_STATE => "DEVICE_STATE",
        _ => "UNKNOWN",
    }
}
