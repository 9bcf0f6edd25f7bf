//! spibridge-device - Cycle-level model of the command interpreter
//!
//! This crate models the device side of the protocol: the bus signal driver,
//! the clock generator, the command interpreter state machine and the two
//! flow-controlled byte FIFOs connecting it to the host. A pin-level
//! simulated peripheral can be attached to the bus so complete transactions
//! run without hardware.
//!
//! # Example
//!
//! ```
//! use spibridge_core::config::{BusConfig, Timing};
//! use spibridge_core::protocol::CMD_SYNC;
//! use spibridge_device::{Device, Echo};
//!
//! let timing = Timing::new(4, 1).unwrap();
//! let mut device = Device::new(BusConfig::default(), timing, Echo::default());
//! device.write(CMD_SYNC).unwrap();
//! device.run_until_starved(1_000);
//! assert_eq!(device.read(), Some(0));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod bus;
pub mod clockgen;
pub mod device;
pub mod fifo;
pub mod interpreter;
pub mod peer;

pub use bus::{BusEvent, Pins};
pub use device::Device;
pub use interpreter::{Interpreter, State};
pub use peer::{Echo, Peripheral, PinPeer, Scripted};
