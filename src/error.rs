//! Error types and handling for the kftp library

use thiserror::Error;

/// Result type alias for kftp operations
pub type Result<T> = std::result::Result<T, KftpError>;

/// Main error type for the kftp library
#[derive(Error, Debug)]
pub enum KftpError {
    /// I/O errors from network or filesystem operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A datagram that cannot be parsed as a valid frame: header shorter
    /// than declared, payload length disagreeing with `data_size`, or a
    /// negative KFTP length
    #[error("framing error: {reason}")]
    Frame {
        /// Reason why the frame is invalid
        reason: String,
    },

    /// The retransmit budget was exhausted without seeing an acknowledgement
    #[error("no acknowledgement after {retries} retries")]
    AckTimeout {
        /// Number of retransmissions attempted after the initial send
        retries: u32,
    },

    /// Invalid configuration parameter
    #[error("invalid configuration: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },
}

impl KftpError {
    /// Create a new framing error
    pub fn frame(reason: impl Into<String>) -> Self {
        Self::Frame {
            reason: reason.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether a request-handling loop may keep serving after this error.
    /// Everything except a broken configuration is scoped to the current
    /// operation.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config { .. })
    }
}
