//! Host session encoder/decoder
//!
//! [`Session`] turns bus operations into command stream frames and decodes the
//! response stream. Long operations are split into frames of at most
//! [`MAX_COUNT`] units; the split is invisible on the bus.
//!
//! The session mirrors the chip select and output enable levels it last
//! requested. The interpreter is the only authority on the real levels, and
//! after a stream fault the mirror is stale: the session then refuses every
//! operation with [`SessionError::NeedsReset`] until [`Session::reset`].

use maybe_async::maybe_async;
use spibridge_core::protocol::{chunks, Command, ShiftFlags, MAX_COUNT, SYNC_REPLY};
use spibridge_core::spi::{check_io_mode_supported, IoMode, SpiCommand, SpiFeatures};

use crate::error::{Result, SessionError};
use crate::transport::Transport;

/// Capabilities of the interpreter: one chip select, single-lane transfers
const FEATURES: SpiFeatures = SpiFeatures::empty();

/// Format bytes as a compact hex string for trace logs
fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}

/// A connection to one command interpreter
pub struct Session<T: Transport> {
    transport: T,
    selected: Option<u8>,
    output_enabled: bool,
    poisoned: bool,
}

impl<T: Transport> Session<T> {
    /// Create a session over a freshly opened transport
    ///
    /// Nothing is sent; the interpreter is assumed to be in its initial
    /// state (deselected, chip select driven).
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            selected: None,
            output_enabled: true,
            poisoned: false,
        }
    }

    /// The underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the underlying transport
    ///
    /// Bytes written directly bypass the session's bookkeeping.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Chip the session last selected, if any
    pub fn selected(&self) -> Option<u8> {
        self.selected
    }

    /// Output enable level the session last requested
    pub fn output_enabled(&self) -> bool {
        self.output_enabled
    }

    /// Returns true if a stream fault requires [`Session::reset`]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    fn check(&self) -> Result<()> {
        if self.poisoned {
            Err(SessionError::NeedsReset)
        } else {
            Ok(())
        }
    }

    fn check_mode(mode: IoMode) -> Result<()> {
        check_io_mode_supported(mode, FEATURES).map_err(|_| SessionError::UnsupportedMode(mode))
    }

    fn check_dummy(cycles: usize) -> Result<()> {
        if cycles % 8 != 0 {
            return Err(SessionError::InvalidArgument(format!(
                "dummy cycle count {} is not a multiple of 8",
                cycles
            )));
        }
        Ok(())
    }

    /// Record a stream fault so later operations refuse to run
    fn track<R>(&mut self, result: Result<R>) -> Result<R> {
        if let Err(e) = &result {
            if e.poisons() {
                log::warn!("spi: session poisoned: {}", e);
                self.poisoned = true;
            }
        }
        result
    }

    #[maybe_async]
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let result = self.transport.write(data).await;
        self.track(result)
    }

    #[maybe_async]
    async fn send_command(&mut self, cmd: Command) -> Result<()> {
        self.send(&cmd.encode()).await
    }

    #[maybe_async]
    async fn flush(&mut self) -> Result<()> {
        let result = self.transport.flush().await;
        self.track(result)
    }

    #[maybe_async]
    async fn recv(&mut self, buf: &mut [u8]) -> Result<()> {
        let result = match self.transport.flush().await {
            Ok(()) => self.transport.read(buf).await,
            Err(e) => Err(e),
        };
        self.track(result)
    }

    /// Emit SHIFT frames covering `len` bytes, with payload if `data` is given
    #[maybe_async]
    async fn shift(&mut self, flags: ShiftFlags, len: usize, data: Option<&[u8]>) -> Result<()> {
        let mut offset = 0;
        for count in chunks(len) {
            self.send_command(Command::Shift { flags, count }).await?;
            let end = offset + count as usize;
            if let Some(data) = data {
                self.send(&data[offset..end]).await?;
            }
            offset = end;
        }
        Ok(())
    }

    /// Reconnect and return the interpreter to its initial state
    ///
    /// Clears the mirrored state and a previous stream fault. Nothing is sent
    /// on the command stream.
    #[maybe_async]
    pub async fn reset(&mut self) -> Result<()> {
        log::debug!("spi: reset");
        self.selected = None;
        self.output_enabled = true;
        let result = self.transport.reset().await;
        self.poisoned = result.is_err();
        result
    }

    /// Assert chip select `index`
    ///
    /// Prefer [`Session::select`] or [`Session::with_selected`], which always
    /// release the chip again.
    #[maybe_async]
    pub async fn assert_select(&mut self, index: u8) -> Result<()> {
        self.check()?;
        if index != 0 && !FEATURES.contains(SpiFeatures::MULTI_CS) {
            return Err(SessionError::UnsupportedChip(index));
        }
        log::trace!("spi: select chip={}", index);
        self.send_command(Command::Select(true)).await?;
        self.selected = Some(index);
        Ok(())
    }

    /// Release chip select and flush
    #[maybe_async]
    pub async fn deselect(&mut self) -> Result<()> {
        self.check()?;
        self.release().await
    }

    /// Deassert chip select and flush, even if the session is poisoned
    ///
    /// Closes a select scope on every exit path. A poisoned session stays
    /// poisoned.
    #[maybe_async]
    async fn release(&mut self) -> Result<()> {
        log::trace!("spi: deselect");
        let result = match self.transport.write(&Command::Select(false).encode()).await {
            Ok(()) => self.transport.flush().await,
            Err(e) => Err(e),
        };
        if result.is_ok() {
            self.selected = None;
        }
        self.track(result)
    }

    /// Drive (`true`) or tri-state (`false`) the chip select line
    #[maybe_async]
    pub async fn output_enable(&mut self, enable: bool) -> Result<()> {
        self.check()?;
        log::trace!("spi: output-enable={}", enable);
        self.send_command(Command::OutputEnable(enable)).await?;
        self.flush().await?;
        self.output_enabled = enable;
        Ok(())
    }

    /// Shift `data` out while shifting the same number of bytes in
    ///
    /// Returns the received bytes in bus order.
    #[maybe_async]
    pub async fn exchange(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.check()?;
        if data.is_empty() {
            return Ok(Vec::new());
        }
        log::trace!("spi: xchg-o={}", hex(data));
        self.shift(ShiftFlags::all(), data.len(), Some(data)).await?;

        let mut received = vec![0u8; data.len()];
        self.recv(&mut received).await?;
        log::trace!("spi: xchg-i={}", hex(&received));
        Ok(received)
    }

    /// Shift `data` out, discarding input
    #[maybe_async]
    pub async fn write(&mut self, data: &[u8], mode: IoMode) -> Result<()> {
        self.check()?;
        Self::check_mode(mode)?;
        if data.is_empty() {
            return Ok(());
        }
        log::trace!("spi: write={}", hex(data));
        self.shift(ShiftFlags::DATA_OUT, data.len(), Some(data))
            .await
    }

    /// Shift `count` bytes in while holding data out low
    #[maybe_async]
    pub async fn read(&mut self, count: usize, mode: IoMode) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; count];
        self.read_into(&mut buf, mode).await?;
        Ok(buf)
    }

    /// Shift `buf.len()` bytes in, filling `buf`
    #[maybe_async]
    pub async fn read_into(&mut self, buf: &mut [u8], mode: IoMode) -> Result<()> {
        self.check()?;
        Self::check_mode(mode)?;
        if buf.is_empty() {
            return Ok(());
        }
        self.shift(ShiftFlags::DATA_IN, buf.len(), None).await?;
        self.recv(buf).await?;
        log::trace!("spi: read={}", hex(buf));
        Ok(())
    }

    /// Generate `cycles` clock periods without moving data
    ///
    /// `cycles` must be a multiple of 8.
    #[maybe_async]
    pub async fn dummy(&mut self, cycles: usize) -> Result<()> {
        self.check()?;
        Self::check_dummy(cycles)?;
        log::trace!("spi: dummy={}", cycles);
        self.shift(ShiftFlags::empty(), cycles / 8, None).await
    }

    /// Wait on the device for `us` microseconds
    #[maybe_async]
    pub async fn delay_us(&mut self, us: u32) -> Result<()> {
        self.delay(us as u64).await
    }

    /// Wait on the device for `ms` milliseconds
    #[maybe_async]
    pub async fn delay_ms(&mut self, ms: u32) -> Result<()> {
        self.delay(ms as u64 * 1000).await
    }

    #[maybe_async]
    async fn delay(&mut self, us: u64) -> Result<()> {
        self.check()?;
        log::trace!("spi: delay us={}", us);
        let mut remaining = us;
        while remaining > 0 {
            let count = remaining.min(MAX_COUNT as u64) as u16;
            self.send_command(Command::Delay(count)).await?;
            remaining -= count as u64;
        }
        Ok(())
    }

    /// Wait until every queued operation has completed on the device
    ///
    /// Sends a SYNC barrier and consumes its single zero reply. Any other
    /// reply means the response stream is out of step with the session.
    #[maybe_async]
    pub async fn synchronize(&mut self) -> Result<()> {
        self.check()?;
        log::trace!("spi: sync-o");
        self.send_command(Command::Sync).await?;
        let mut reply = [0u8];
        self.recv(&mut reply).await?;
        log::trace!("spi: sync-i");
        if reply[0] != SYNC_REPLY {
            return self.track(Err(SessionError::SyncFailed(reply[0])));
        }
        Ok(())
    }

    /// Run a complete transaction on chip 0
    ///
    /// The opcode, address and write data are shifted out, followed by the
    /// dummy cycles, then the read buffer is filled. Chip select is released
    /// afterwards even if the transaction fails.
    #[maybe_async]
    pub async fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        self.check()?;
        Self::check_mode(cmd.io_mode)?;
        Self::check_dummy(cmd.dummy_cycles as usize)?;

        let header_len = cmd.header_len();
        let mut out = vec![0u8; header_len + cmd.write_data.len()];
        cmd.encode_header(&mut out);
        out[header_len..].copy_from_slice(cmd.write_data);

        self.assert_select(0).await?;
        let result = self.transaction(&out, cmd).await;
        let release = self.release().await;
        result.and(release)
    }

    #[maybe_async]
    async fn transaction(&mut self, out: &[u8], cmd: &mut SpiCommand<'_>) -> Result<()> {
        self.write(out, cmd.io_mode).await?;
        self.dummy(cmd.dummy_cycles as usize).await?;
        self.read_into(&mut *cmd.read_buf, cmd.io_mode).await
    }
}

#[cfg(feature = "is_sync")]
impl<T: Transport> Session<T> {
    /// Select chip `index` until the returned guard is dropped
    ///
    /// The guard dereferences to the session. Dropping it deasserts chip
    /// select and flushes; errors on that path are logged.
    pub fn select(&mut self, index: u8) -> Result<Selected<'_, T>> {
        self.assert_select(index)?;
        Ok(Selected { session: self })
    }

    /// Run `f` with chip `index` selected
    ///
    /// Chip select is released and flushed on every exit path. An error from
    /// `f` takes precedence over one from releasing.
    pub fn with_selected<R>(
        &mut self,
        index: u8,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        self.assert_select(index)?;
        let result = f(self);
        let release = self.release();
        match (result, release) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(e), _) | (Ok(_), Err(e)) => Err(e),
        }
    }
}

/// Scoped chip selection, see [`Session::select`]
#[cfg(feature = "is_sync")]
pub struct Selected<'a, T: Transport> {
    session: &'a mut Session<T>,
}

#[cfg(feature = "is_sync")]
impl<T: Transport> core::ops::Deref for Selected<'_, T> {
    type Target = Session<T>;

    fn deref(&self) -> &Session<T> {
        self.session
    }
}

#[cfg(feature = "is_sync")]
impl<T: Transport> core::ops::DerefMut for Selected<'_, T> {
    fn deref_mut(&mut self) -> &mut Session<T> {
        self.session
    }
}

// Drop implementation only for sync mode (async requires explicit deselect)
#[cfg(feature = "is_sync")]
impl<T: Transport> Drop for Selected<'_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.session.release() {
            log::warn!("spi: deselect on scope exit failed: {}", e);
        }
    }
}
