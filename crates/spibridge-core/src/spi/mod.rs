//! SPI transaction types
//!
//! Lane modes, capability flags and a generic transaction descriptor used by
//! the host session to run complete opcode/address/data transactions.

mod address;
mod command;
mod features;
mod io_mode;

pub use address::AddressWidth;
pub use command::SpiCommand;
pub use features::SpiFeatures;
pub use io_mode::{check_io_mode_supported, IoMode};
