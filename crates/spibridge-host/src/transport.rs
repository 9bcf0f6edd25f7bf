//! Transport layer abstraction for the command and response streams
//!
//! A transport carries the command stream to the interpreter and the response
//! stream back. Writes may be buffered until [`Transport::flush`]; reads always
//! return exactly the requested number of bytes or fail.

use maybe_async::maybe_async;

use crate::error::Result;

/// Ordered, reliable byte stream pair
#[maybe_async(AFIT)]
pub trait Transport {
    /// Write bytes to the command stream
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read exactly `buf.len()` bytes from the response stream
    async fn read(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Push buffered command bytes out to the interpreter
    async fn flush(&mut self) -> Result<()>;

    /// Reconnect so the interpreter starts from its initial state
    ///
    /// Bytes in flight in either direction are discarded.
    async fn reset(&mut self) -> Result<()>;
}

#[cfg(feature = "is_sync")]
impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read(buf)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }
}

#[cfg(feature = "serial")]
pub mod serial {
    //! Serial port transport implementation

    use super::*;
    use crate::error::SessionError;
    use maybe_async::maybe_async;
    use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
    use std::io::{Read, Write};
    use std::time::Duration;

    /// Baud rate used when none is given
    pub const DEFAULT_BAUD: u32 = 115200;

    /// Serial port transport
    pub struct SerialTransport {
        device: String,
        baud: u32,
        port: Option<Box<dyn SerialPort>>,
    }

    impl SerialTransport {
        /// Open a serial port with the specified baud rate
        pub fn open(device: &str, baud: Option<u32>) -> Result<Self> {
            let baud = baud.unwrap_or(DEFAULT_BAUD);
            let port = Self::open_port(device, baud)?;
            Ok(Self {
                device: device.to_string(),
                baud,
                port: Some(port),
            })
        }

        fn open_port(device: &str, baud: u32) -> Result<Box<dyn SerialPort>> {
            let port = serialport::new(device, baud)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .timeout(Duration::from_secs(5))
                .open()?;
            port.clear(ClearBuffer::All)?;

            log::info!("Opened serial port {} at {} baud", device, baud);
            Ok(port)
        }

        fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
            self.port
                .as_mut()
                .ok_or_else(|| SessionError::ConnectionFailed(format!("{} is closed", self.device)))
        }
    }

    #[maybe_async(AFIT)]
    impl Transport for SerialTransport {
        async fn write(&mut self, data: &[u8]) -> Result<()> {
            self.port()?.write_all(data)?;
            Ok(())
        }

        async fn read(&mut self, buf: &mut [u8]) -> Result<()> {
            self.port()?.read_exact(buf)?;
            Ok(())
        }

        async fn flush(&mut self) -> Result<()> {
            self.port()?.flush()?;
            Ok(())
        }

        async fn reset(&mut self) -> Result<()> {
            // The port is opened exclusively; close it before reopening
            self.port = None;
            self.port = Some(Self::open_port(&self.device, self.baud)?);
            Ok(())
        }
    }
}

#[cfg(feature = "tcp")]
pub mod tcp {
    //! TCP socket transport implementation

    use super::*;
    use crate::error::SessionError;
    use maybe_async::maybe_async;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::time::Duration;

    /// Read and write timeout applied to the socket
    const IO_TIMEOUT: Duration = Duration::from_secs(5);

    /// TCP socket transport
    pub struct TcpTransport {
        addr: String,
        stream: TcpStream,
    }

    impl TcpTransport {
        /// Connect to an interpreter listening at the specified host and port
        pub fn connect(host: &str, port: u16) -> Result<Self> {
            let addr = format!("{}:{}", host, port);
            let stream = Self::open_stream(&addr)?;
            Ok(Self { addr, stream })
        }

        fn open_stream(addr: &str) -> Result<TcpStream> {
            log::info!("Connecting to interpreter at {}", addr);

            let stream = TcpStream::connect(addr)
                .map_err(|e| SessionError::ConnectionFailed(e.to_string()))?;

            // Commands are small; do not let Nagle hold them back
            stream.set_nodelay(true).map_err(|e| {
                SessionError::ConnectionFailed(format!("Failed to set TCP_NODELAY: {}", e))
            })?;
            stream.set_read_timeout(Some(IO_TIMEOUT)).map_err(|e| {
                SessionError::ConnectionFailed(format!("Failed to set read timeout: {}", e))
            })?;
            stream.set_write_timeout(Some(IO_TIMEOUT)).map_err(|e| {
                SessionError::ConnectionFailed(format!("Failed to set write timeout: {}", e))
            })?;

            log::info!("Connected to interpreter at {}", addr);
            Ok(stream)
        }
    }

    #[maybe_async(AFIT)]
    impl Transport for TcpTransport {
        async fn write(&mut self, data: &[u8]) -> Result<()> {
            self.stream.write_all(data)?;
            Ok(())
        }

        async fn read(&mut self, buf: &mut [u8]) -> Result<()> {
            self.stream.read_exact(buf)?;
            Ok(())
        }

        async fn flush(&mut self) -> Result<()> {
            self.stream.flush()?;
            Ok(())
        }

        async fn reset(&mut self) -> Result<()> {
            let _ = self.stream.shutdown(std::net::Shutdown::Both);
            self.stream = Self::open_stream(&self.addr)?;
            Ok(())
        }
    }
}

#[cfg(feature = "sim")]
pub mod sim {
    //! Transport backed by the in-process device model

    use super::*;
    use crate::error::SessionError;
    use maybe_async::maybe_async;
    use spibridge_core::config::{BusConfig, Timing};
    use spibridge_device::{Device, Peripheral};
    use std::collections::VecDeque;

    /// Transport that runs a simulated [`Device`]
    ///
    /// The device only advances while the host waits on it: when a write finds
    /// the command FIFO full, on flush, and while a read is short of bytes.
    /// Committed response bytes are moved into an unbounded host-side buffer on
    /// every cycle, so the interpreter never blocks on the response stream.
    pub struct SimTransport<P> {
        device: Device<P>,
        rx: VecDeque<u8>,
        bytes_written: u64,
    }

    impl<P: Peripheral> SimTransport<P> {
        /// Wrap an existing device
        pub fn new(device: Device<P>) -> Self {
            log::info!("Simulated interpreter attached");
            Self {
                device,
                rx: VecDeque::new(),
                bytes_written: 0,
            }
        }

        /// Build a device with `peripheral` on its bus and wrap it
        pub fn with_peripheral(config: BusConfig, timing: Timing, peripheral: P) -> Self {
            Self::new(Device::new(config, timing, peripheral))
        }

        /// The simulated device
        pub fn device(&self) -> &Device<P> {
            &self.device
        }

        /// Mutable access to the simulated device
        pub fn device_mut(&mut self) -> &mut Device<P> {
            &mut self.device
        }

        /// Response bytes received but not yet read by the host
        pub fn pending(&self) -> usize {
            self.rx.len()
        }

        /// Command bytes written since creation
        pub fn bytes_written(&self) -> u64 {
            self.bytes_written
        }

        fn tick(&mut self) {
            self.device.tick();
            while let Some(byte) = self.device.read() {
                self.rx.push_back(byte);
            }
        }

        fn stalled(&self) -> SessionError {
            match self.device.fault() {
                Some(e) => log::error!("sim: interpreter halted: {}", e),
                None => log::error!("sim: interpreter starved in {:?}", self.device.state()),
            }
            SessionError::Stalled
        }
    }

    #[maybe_async(AFIT)]
    impl<P: Peripheral> Transport for SimTransport<P> {
        async fn write(&mut self, data: &[u8]) -> Result<()> {
            for &byte in data {
                while self.device.write(byte).is_err() {
                    if self.device.fault().is_some() {
                        return Err(self.stalled());
                    }
                    self.tick();
                }
                self.bytes_written += 1;
            }
            Ok(())
        }

        async fn read(&mut self, buf: &mut [u8]) -> Result<()> {
            while self.rx.len() < buf.len() {
                if self.device.is_starved() {
                    return Err(self.stalled());
                }
                self.tick();
            }
            let n = buf.len();
            for (dst, src) in buf.iter_mut().zip(self.rx.drain(..n)) {
                *dst = src;
            }
            Ok(())
        }

        async fn flush(&mut self) -> Result<()> {
            while !self.device.is_starved() {
                self.tick();
            }
            Ok(())
        }

        async fn reset(&mut self) -> Result<()> {
            self.device.reset();
            self.rx.clear();
            Ok(())
        }
    }

    #[cfg(all(test, feature = "is_sync"))]
    mod tests {
        use super::*;
        use spibridge_core::protocol::CMD_SYNC;
        use spibridge_device::Echo;

        fn transport() -> SimTransport<Echo> {
            let timing = Timing::new(4, 1).unwrap();
            SimTransport::with_peripheral(BusConfig::default(), timing, Echo::default())
        }

        #[test]
        fn test_sync_round_trip() {
            let mut t = transport();
            t.write(&[CMD_SYNC, CMD_SYNC]).unwrap();
            let mut buf = [0xFFu8; 2];
            t.read(&mut buf).unwrap();
            assert_eq!(buf, [0, 0]);
            assert_eq!(t.pending(), 0);
            assert_eq!(t.bytes_written(), 2);
        }

        #[test]
        fn test_read_without_commands_stalls() {
            let mut t = transport();
            let mut buf = [0u8; 1];
            assert!(matches!(t.read(&mut buf), Err(SessionError::Stalled)));
        }

        #[test]
        fn test_reset_recovers_from_fault() {
            let mut t = transport();
            t.write(&[0x80, CMD_SYNC]).unwrap();
            let mut buf = [0u8; 1];
            assert!(matches!(t.read(&mut buf), Err(SessionError::Stalled)));
            assert!(t.device().fault().is_some());

            t.reset().unwrap();
            t.write(&[CMD_SYNC]).unwrap();
            t.read(&mut buf).unwrap();
            assert_eq!(buf, [0]);
        }

        #[test]
        fn test_write_larger_than_fifo() {
            let mut t = transport();
            // SHIFT DATA-OUT with a 2000 byte payload, four times the FIFO depth
            t.write(&[0x11, 0xD0, 0x07]).unwrap();
            t.write(&[0x5A; 2000]).unwrap();
            t.flush().unwrap();
            assert_eq!(t.device().peer().clock_periods(), 2000 * 8);
        }
    }
}
