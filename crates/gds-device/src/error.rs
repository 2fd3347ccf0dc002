use gds_proto::FramingError;
use gds_transport::TransportError;

/// Errors that can occur in device operations.
///
/// Protocol-level non-responses (timeouts, stale reports, unknown report
/// IDs) are not represented here; they surface as neutral return values.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// An operation was invoked before `initialize` bound a transport.
    #[error("device has no bound transport")]
    NotInitialized,

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error.
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
