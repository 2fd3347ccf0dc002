/// Errors that can occur on the transport boundary.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A frame was submitted while the channel is closed.
    #[error("transport is not open")]
    NotOpen,

    /// The underlying channel rejected or lost the frame.
    #[error("failed to send frame: {0}")]
    SendFailed(String),

    /// The transport has been shut down and will not reopen.
    #[error("transport shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, TransportError>;
