//! Error types for picolink.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Value coercion, frame validation, and
//! transport failures are all captured here.

/// The error type for all picolink operations.
///
/// The first four variants are raised by the pure framing core (coercion,
/// frame build, frame parse). They are scoped to the single call that
/// produced them and are never retried internally. The remaining variants
/// come from the transport and sender layers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller-supplied value has a shape the coercion cannot handle.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// Text that is not a number, or a frame that is structurally malformed.
    #[error("format error: {0}")]
    Format(String),

    /// A numeric value outside 0..=255, or a frame length outside 2..=255.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// The trailing CRC of a received frame does not match its contents.
    #[error("checksum mismatch: computed 0x{expected:04X}, received 0x{actual:04X}")]
    Checksum {
        /// CRC computed over the received bytes.
        expected: u16,
        /// CRC carried in the frame trailer.
        actual: u16,
    },

    /// A transport-level error (serial port open/configure failure).
    #[error("transport error: {0}")]
    Transport(String),

    /// An unexpected exchange on a scripted transport.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Timed out waiting for data from the device.
    ///
    /// Usually the device is unplugged, still enumerating, or running
    /// firmware that does not answer the command.
    #[error("timeout waiting for response")]
    Timeout,

    /// An invalid configuration parameter.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No connection to the device has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the device was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
