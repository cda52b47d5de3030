/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The input length does not match the fixed size of the structure.
    #[error("invalid {structure} length ({actual} bytes, expected {expected})")]
    Format {
        structure: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The received checksum does not match the one computed over the frame.
    #[error("invalid frame checksum 0x{actual:02x} (expected 0x{expected:02x})")]
    Checksum { expected: u8, actual: u8 },

    /// A decoded field set is missing a field the structure requires.
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
