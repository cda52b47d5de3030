/// Errors that can occur in explorer and session operations.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] drhd_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] drhd_frame::FrameError),

    /// The session is not connected.
    #[error("not connected")]
    NotConnected,

    /// The device echoed a different argument than the one requested.
    #[error("invalid response for output {expected}: device reported {actual}")]
    Protocol { expected: u16, actual: u16 },

    /// A port number outside the device's port range.
    #[error("port {port} out of range (device has {max})")]
    InvalidPort { port: u16, max: u16 },

    /// The explorer is already broadcasting.
    #[error("explorer already running")]
    AlreadyRunning,
}

pub type Result<T> = std::result::Result<T, DriverError>;
