//! Error types for spibridge-core
//!
//! This module provides a no_std compatible error type shared by the host
//! encoder and the device-side interpreter.

use core::fmt;

use crate::spi::IoMode;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Protocol errors
    /// Opcode high nibble does not name a known command
    UnknownOpcode(u8),
    /// Opcode carries flag or operand bits that the command does not define
    ReservedBits(u8),

    // Configuration errors
    /// A clock frequency of zero was requested
    FrequencyZero,
    /// Requested clock is too fast for the system clock
    FrequencyTooHigh {
        /// Requested output frequency in Hz
        requested_hz: u32,
        /// Fastest frequency that can be generated, in Hz
        max_hz: u32,
    },
    /// Clock period is shorter than the input synchronizer allows
    PeriodTooShort(u32),

    // Capability errors
    /// Requested I/O mode is not supported by the interpreter
    IoModeNotSupported(IoMode),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOpcode(op) => write!(f, "unknown opcode 0x{:02X}", op),
            Self::ReservedBits(op) => write!(f, "reserved bits set in opcode 0x{:02X}", op),
            Self::FrequencyZero => write!(f, "clock frequency must not be zero"),
            Self::FrequencyTooHigh {
                requested_hz,
                max_hz,
            } => write!(
                f,
                "clock frequency {} Hz too high (maximum {} Hz)",
                requested_hz, max_hz
            ),
            Self::PeriodTooShort(cyc) => write!(
                f,
                "clock period of {} cycles is below the minimum of {}",
                cyc,
                crate::config::MIN_PERIOD_CYC
            ),
            Self::IoModeNotSupported(mode) => {
                write!(f, "I/O mode {:?} not supported by interpreter", mode)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
