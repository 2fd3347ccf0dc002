/// Errors that can occur while decoding a GDS frame.
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    /// The frame buffer is empty (no report ID byte).
    #[error("empty frame (missing report ID)")]
    Empty,

    /// A known report ID arrived with fewer body bytes than its layout needs.
    #[error("truncated frame for report 0x{report_id:02X} (need {expected} body bytes, got {actual})")]
    Truncated {
        report_id: u8,
        expected: usize,
        actual: usize,
    },

    /// A text payload contained non-ASCII bytes.
    #[error("non-ASCII data payload in report 0x{report_id:02X}")]
    NonAscii { report_id: u8 },

    /// A data payload does not fit its one-byte Length field.
    #[error("payload too large for report 0x{report_id:02X} ({size} bytes, max {max})")]
    PayloadTooLarge {
        report_id: u8,
        size: usize,
        max: usize,
    },
}

pub type Result<T> = std::result::Result<T, FramingError>;
