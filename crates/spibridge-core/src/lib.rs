//! spibridge-core - Wire protocol of the spibridge command interpreter
//!
//! This crate holds everything the host encoder and the device-side
//! interpreter must agree on: opcode values and framing, lane capability
//! checks, and the bus clock configuration. It is `no_std` compatible so the
//! interpreter model can run without an operating system.
//!
//! # Features
//!
//! - `std` - Implement `std::error::Error` for [`Error`]
//!
//! # Example
//!
//! ```
//! use spibridge_core::protocol::{Command, ShiftFlags};
//!
//! let cmd = Command::Shift { flags: ShiftFlags::DATA_OUT, count: 2 };
//! assert_eq!(cmd.encode().as_slice(), &[0x11, 0x02, 0x00]);
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "std")]
extern crate std;

pub mod config;
pub mod error;
pub mod protocol;
pub mod spi;

pub use error::{Error, Result};
