//! Error types for host sessions

use spibridge_core::spi::IoMode;
use thiserror::Error;

/// Host session errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// Only chip select 0 is wired
    #[error("Chip select {0} not supported, only chip 0 is available")]
    UnsupportedChip(u8),

    /// Only single-lane transfers are possible
    #[error("I/O mode {0:?} not supported")]
    UnsupportedMode(IoMode),

    /// Argument outside what the protocol can express
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error during communication
    #[error("I/O error: {0}")]
    Io(String),

    /// Serial port error
    #[cfg(feature = "serial")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Failed to connect to device
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Timeout during communication
    #[error("Communication timeout")]
    Timeout,

    /// Simulated interpreter cannot make progress
    #[error("Interpreter stalled before the expected response arrived")]
    Stalled,

    /// SYNC barrier answered with something other than zero
    #[error("Synchronization failed: barrier returned 0x{0:02X}")]
    SyncFailed(u8),

    /// A previous stream fault left the session in an unknown state
    #[error("Session must be reset after a stream fault")]
    NeedsReset,

    /// Protocol or configuration error from the core crate
    #[error("Protocol error: {0}")]
    Protocol(#[from] spibridge_core::Error),
}

impl SessionError {
    /// Returns true if the device state can no longer be trusted
    ///
    /// Contract violations are raised before anything is sent and leave the
    /// session usable; stream faults and a failed barrier do not.
    pub fn poisons(&self) -> bool {
        match self {
            Self::Io(_)
            | Self::ConnectionFailed(_)
            | Self::Timeout
            | Self::Stalled
            | Self::SyncFailed(_) => true,
            #[cfg(feature = "serial")]
            Self::Serial(_) => true,
            _ => false,
        }
    }
}

/// Result type for host session operations
pub type Result<T> = std::result::Result<T, SessionError>;

impl From<std::io::Error> for SessionError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => SessionError::Timeout,
            _ => SessionError::Io(e.to_string()),
        }
    }
}
