//! Simulated downstream peripheral
//!
//! [`PinPeer`] watches the pins driven by the interpreter and behaves like an
//! SPI target in the same clock mode: it samples data out on its latch edge,
//! drives data in on its setup edge, and hands whole bytes to a byte-level
//! [`Peripheral`].

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, collections::VecDeque, vec::Vec};
#[cfg(feature = "std")]
use std::collections::VecDeque;

use spibridge_core::config::{BusConfig, SckEdge};

use crate::bus::Pins;

/// Byte-level behaviour of a simulated SPI target
pub trait Peripheral {
    /// Chip select was asserted
    fn select(&mut self) {}

    /// Chip select was released
    fn deselect(&mut self) {}

    /// Byte to shift out next, requested before its first bit is driven
    fn next_out(&mut self) -> u8;

    /// A complete byte was shifted in
    fn received(&mut self, byte: u8);
}

impl<P: Peripheral + ?Sized> Peripheral for Box<P> {
    fn select(&mut self) {
        (**self).select()
    }

    fn deselect(&mut self) {
        (**self).deselect()
    }

    fn next_out(&mut self) -> u8 {
        (**self).next_out()
    }

    fn received(&mut self, byte: u8) {
        (**self).received(byte)
    }
}

/// Target that answers each byte with the previous byte it received
#[derive(Debug, Default)]
pub struct Echo {
    last: u8,
}

impl Peripheral for Echo {
    fn select(&mut self) {
        self.last = 0;
    }

    fn next_out(&mut self) -> u8 {
        self.last
    }

    fn received(&mut self, byte: u8) {
        self.last = byte;
    }
}

/// Target that answers with queued bytes and records what it receives
#[derive(Debug)]
pub struct Scripted {
    responses: VecDeque<u8>,
    fill: u8,
    received: Vec<u8>,
    selects: usize,
}

impl Scripted {
    /// Create a target answering `fill` once the queue runs dry
    pub fn new(fill: u8) -> Self {
        Self {
            responses: VecDeque::new(),
            fill,
            received: Vec::new(),
            selects: 0,
        }
    }

    /// Queue bytes to answer with
    pub fn respond(&mut self, bytes: &[u8]) {
        self.responses.extend(bytes.iter().copied());
    }

    /// Every byte received so far
    pub fn received(&self) -> &[u8] {
        &self.received
    }

    /// Number of times chip select was asserted
    pub fn selects(&self) -> usize {
        self.selects
    }
}

impl Default for Scripted {
    fn default() -> Self {
        Self::new(0xFF)
    }
}

impl Peripheral for Scripted {
    fn select(&mut self) {
        self.selects += 1;
    }

    fn next_out(&mut self) -> u8 {
        self.responses.pop_front().unwrap_or(self.fill)
    }

    fn received(&mut self, byte: u8) {
        self.received.push(byte);
    }
}

/// Pin-level model of an SPI target
pub struct PinPeer<P> {
    peripheral: P,
    sck_idle: bool,
    sck_edge: SckEdge,
    setup_on_leading: bool,
    selected: bool,
    sck_r: bool,
    tx: u8,
    /// Bits of `tx` already driven
    presented: u8,
    rx: u8,
    rx_bits: u8,
    cipo: bool,
    clock_periods: u64,
    copi_high: u64,
}

impl<P: Peripheral> PinPeer<P> {
    /// Attach a peripheral using the same clock mode as the bus
    pub fn new(config: &BusConfig, peripheral: P) -> Self {
        Self {
            peripheral,
            sck_idle: config.sck_idle,
            sck_edge: config.sck_edge,
            setup_on_leading: config.setup_on_leading_edge(),
            selected: false,
            sck_r: config.sck_idle,
            tx: 0,
            presented: 0,
            rx: 0,
            rx_bits: 0,
            cipo: false,
            clock_periods: 0,
            copi_high: 0,
        }
    }

    /// The byte-level peripheral
    pub fn peripheral(&self) -> &P {
        &self.peripheral
    }

    /// Mutable access to the byte-level peripheral
    pub fn peripheral_mut(&mut self) -> &mut P {
        &mut self.peripheral
    }

    /// Whether chip select is currently asserted
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Clock periods seen, counted on edges leaving idle
    pub fn clock_periods(&self) -> u64 {
        self.clock_periods
    }

    /// Latch edges on which data out was high
    pub fn copi_high(&self) -> u64 {
        self.copi_high
    }

    /// Observe this cycle's pins and return the data in level to drive
    pub fn tick(&mut self, pins: &Pins) -> bool {
        // A released chip select is pulled high
        let selected = pins.cs == Some(false);
        if selected && !self.selected {
            self.begin();
        } else if !selected && self.selected {
            self.peripheral.deselect();
            self.rx_bits = 0;
            self.cipo = false;
        }
        self.selected = selected;

        if pins.sck != self.sck_r {
            if pins.sck != self.sck_idle {
                self.clock_periods += 1;
            }
            let latch = match self.sck_edge {
                SckEdge::Rising => pins.sck,
                SckEdge::Falling => !pins.sck,
            };
            if latch {
                if pins.copi {
                    self.copi_high += 1;
                }
                if selected {
                    self.latch(pins.copi);
                }
            } else if selected {
                self.setup();
            }
        }
        self.sck_r = pins.sck;

        self.cipo
    }

    fn begin(&mut self) {
        self.peripheral.select();
        self.tx = self.peripheral.next_out();
        self.presented = 0;
        self.rx_bits = 0;
        if !self.setup_on_leading {
            self.present();
        }
    }

    fn present(&mut self) {
        self.cipo = (self.tx >> (7 - self.presented)) & 1 != 0;
        self.presented += 1;
    }

    fn setup(&mut self) {
        if self.presented == 8 {
            self.tx = self.peripheral.next_out();
            self.presented = 0;
        }
        self.present();
    }

    fn latch(&mut self, bit: bool) {
        self.rx = (self.rx << 1) | bit as u8;
        self.rx_bits += 1;
        if self.rx_bits == 8 {
            self.peripheral.received(self.rx);
            self.rx_bits = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pins(sck: bool, cs: bool, copi: bool) -> Pins {
        Pins {
            sck,
            cs: Some(!cs),
            copi,
        }
    }

    /// Clock one byte in mode 0, returning the bits driven on data in
    fn clock_byte(peer: &mut PinPeer<Scripted>, out: u8) -> u8 {
        let mut sampled = 0u8;
        for i in (0..8).rev() {
            let bit = (out >> i) & 1 != 0;
            let cipo = peer.tick(&pins(false, true, bit));
            peer.tick(&pins(true, true, bit));
            sampled = (sampled << 1) | cipo as u8;
        }
        peer.tick(&pins(false, true, false));
        sampled
    }

    #[test]
    fn test_mode0_exchange() {
        let mut scripted = Scripted::default();
        scripted.respond(&[0x9C, 0x3E]);
        let mut peer = PinPeer::new(&BusConfig::default(), scripted);

        peer.tick(&pins(false, false, false));
        assert_eq!(clock_byte(&mut peer, 0x12), 0x9C);
        assert_eq!(clock_byte(&mut peer, 0x34), 0x3E);
        assert_eq!(peer.peripheral().received(), &[0x12, 0x34]);
        assert_eq!(peer.peripheral().selects(), 1);
        assert_eq!(peer.clock_periods(), 16);
    }

    #[test]
    fn test_tristated_cs_deselects() {
        let mut peer = PinPeer::new(&BusConfig::default(), Echo::default());
        peer.tick(&pins(false, true, false));
        assert!(peer.is_selected());
        peer.tick(&Pins {
            sck: false,
            cs: None,
            copi: false,
        });
        assert!(!peer.is_selected());
    }
}
