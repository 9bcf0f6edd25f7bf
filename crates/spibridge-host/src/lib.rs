//! spibridge-host - Host side of the spibridge command protocol
//!
//! This crate drives a command interpreter over a byte stream pair. A
//! [`Session`] encodes bus operations (select, exchange, write, read, dummy
//! clocks, delays, output enable) into command frames, decodes the response
//! stream and uses the SYNC barrier to wait for completion.
//!
//! # Supported Transports
//!
//! - Serial port: `/dev/ttyACM0`, `COM3`, etc. (`serial` feature)
//! - TCP socket: `host:port` (`tcp` feature)
//! - In-process simulated interpreter (`sim` feature)
//!
//! # Example
//!
//! ```
//! # #[cfg(all(feature = "sim", feature = "is_sync"))]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use spibridge_core::config::{BusConfig, Timing};
//! use spibridge_device::Echo;
//! use spibridge_host::{Session, SimTransport};
//!
//! let timing = Timing::new(4, 1)?;
//! let transport = SimTransport::with_peripheral(BusConfig::default(), timing, Echo::default());
//! let mut session = Session::new(transport);
//!
//! let reply = session.with_selected(0, |s| s.exchange(&[0x9F, 0x00]))?;
//! assert_eq!(reply, [0x00, 0x9F]);
//! session.synchronize()?;
//! # Ok(())
//! # }
//! # #[cfg(not(all(feature = "sim", feature = "is_sync")))]
//! # fn main() {}
//! ```

pub mod error;
pub mod session;
pub mod transport;

// Re-exports
pub use error::{Result, SessionError};
pub use session::Session;
pub use transport::Transport;

#[cfg(feature = "is_sync")]
pub use session::Selected;
#[cfg(feature = "serial")]
pub use transport::serial::SerialTransport;
#[cfg(feature = "sim")]
pub use transport::sim::SimTransport;
#[cfg(feature = "tcp")]
pub use transport::tcp::TcpTransport;
