//! Bus signal driver
//!
//! Maps the interpreter's logical signals onto pin levels and derives the
//! `setup`/`latch` events from the clock. Chip select is active low and its
//! driver can be tri-stated; clock and data out are always driven. Data in
//! passes a two-stage synchronizer before the interpreter sees it.

use spibridge_core::config::{BusConfig, SckEdge};

/// Pin levels driven by the interpreter during one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pins {
    /// Clock level
    pub sck: bool,
    /// Chip select level, `None` while the driver is tri-stated
    pub cs: Option<bool>,
    /// Data out level
    pub copi: bool,
}

/// Timing event derived from the clock in one cycle
///
/// At most one event happens per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    /// No clock edge
    None,
    /// Safe to present the next output bit
    Setup,
    /// Safe to sample the input bit
    Latch,
}

/// Bus signal driver state
pub struct Bus {
    sck_idle: bool,
    sck_edge: SckEdge,
    /// Clock level of the previous cycle
    sck_r: bool,
    /// Two-stage input synchronizer, index 1 is the observed output
    cipo_sync: [bool; 2],
    cs: bool,
    cs_oe: bool,
}

impl Bus {
    /// Create a driver for the given bus configuration
    pub fn new(config: &BusConfig) -> Self {
        Self {
            sck_idle: config.sck_idle,
            sck_edge: config.sck_edge,
            sck_r: config.sck_idle,
            cipo_sync: [false; 2],
            cs: false,
            cs_oe: true,
        }
    }

    /// Return to the power-on state: deselected, chip select driven
    pub fn reset(&mut self) {
        self.sck_r = self.sck_idle;
        self.cipo_sync = [false; 2];
        self.cs = false;
        self.cs_oe = true;
    }

    /// Set the logical chip select level (`true` asserts)
    pub fn set_cs(&mut self, level: bool) {
        self.cs = level;
    }

    /// Enable or tri-state the chip select driver
    pub fn set_cs_oe(&mut self, enable: bool) {
        self.cs_oe = enable;
    }

    /// Logical chip select level
    pub fn cs(&self) -> bool {
        self.cs
    }

    /// Whether the chip select driver is enabled
    pub fn cs_oe(&self) -> bool {
        self.cs_oe
    }

    /// Clock level for a generator phase (`false` is idle)
    pub fn sck(&self, phase: bool) -> bool {
        phase ^ self.sck_idle
    }

    /// Pin levels for a clock phase and data out bit
    pub fn pins(&self, phase: bool, copi: bool) -> Pins {
        Pins {
            sck: self.sck(phase),
            cs: self.cs_oe.then_some(!self.cs),
            copi,
        }
    }

    /// Event caused by the clock moving from the previous level to `sck`
    pub fn event(&self, sck: bool) -> BusEvent {
        let rose = !self.sck_r && sck;
        let fell = self.sck_r && !sck;
        let (latch, setup) = match self.sck_edge {
            SckEdge::Rising => (rose, fell),
            SckEdge::Falling => (fell, rose),
        };
        if latch {
            BusEvent::Latch
        } else if setup {
            BusEvent::Setup
        } else {
            BusEvent::None
        }
    }

    /// Synchronized data in level
    pub fn cipo(&self) -> bool {
        self.cipo_sync[1]
    }

    /// Register this cycle's clock level and raw data in pin
    pub fn step(&mut self, sck: bool, cipo_pin: bool) {
        self.sck_r = sck;
        self.cipo_sync = [cipo_pin, self.cipo_sync[0]];
    }
}
