//! Bus configuration and clock derivation
//!
//! The interpreter runs from a single system clock. The bus clock period and
//! the delay timer tick are both expressed as whole numbers of system clock
//! cycles, derived here from the requested frequencies.

use core::fmt;
use core::str::FromStr;

use crate::error::{Error, Result};

/// System clock of the interpreter when none is specified
pub const DEFAULT_SYS_CLK_HZ: u32 = 48_000_000;

/// Bus clock frequency when none is specified (100 kHz)
pub const DEFAULT_FREQUENCY_HZ: u32 = 100_000;

/// Delay timer tick frequency (one tick per microsecond)
pub const DELAY_TICK_HZ: u32 = 1_000_000;

/// Shortest bus clock period in system cycles
///
/// The input data pin passes a two-stage synchronizer, so each half period
/// must last at least two cycles for the sampled bit to be the one driven for
/// the current clock.
pub const MIN_PERIOD_CYC: u32 = 4;

/// Clock edge on which input data is latched
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SckEdge {
    /// Latch on the rising edge, set up on the falling edge
    #[default]
    Rising,
    /// Latch on the falling edge, set up on the rising edge
    Falling,
}

impl FromStr for SckEdge {
    type Err = &'static str;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        match s {
            "r" | "rising" => Ok(Self::Rising),
            "f" | "falling" => Ok(Self::Falling),
            _ => Err("expected one of: r, rising, f, falling"),
        }
    }
}

impl fmt::Display for SckEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rising => write!(f, "rising"),
            Self::Falling => write!(f, "falling"),
        }
    }
}

/// Bus options consumed by the interpreter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusConfig {
    /// Bus clock frequency in Hz
    pub frequency_hz: u32,
    /// Clock level while no transfer is running
    pub sck_idle: bool,
    /// Edge on which input data is latched
    pub sck_edge: SckEdge,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            sck_idle: false,
            sck_edge: SckEdge::Rising,
        }
    }
}

impl BusConfig {
    /// Returns true if the setup event falls on the edge leaving the idle level
    ///
    /// In that case the first bit of a byte must be presented without waiting
    /// for a preceding setup event (CPHA=1 in the usual mode numbering).
    pub const fn setup_on_leading_edge(&self) -> bool {
        matches!(
            (self.sck_idle, self.sck_edge),
            (false, SckEdge::Falling) | (true, SckEdge::Rising)
        )
    }

    /// The conventional SPI mode number (0-3) of this configuration
    pub const fn mode(&self) -> u8 {
        (self.sck_idle as u8) << 1 | self.setup_on_leading_edge() as u8
    }
}

/// Interpreter timing in system clock cycles
///
/// Only constructible through [`Timing::new`] or [`Timing::derive`], so the
/// period is always at least [`MIN_PERIOD_CYC`] and the delay tick at least
/// one cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    period_cyc: u32,
    delay_cyc: u32,
}

impl Timing {
    /// Build a timing from explicit cycle counts
    ///
    /// Fails if the period is below [`MIN_PERIOD_CYC`]; a zero delay length is
    /// treated as one cycle.
    pub fn new(period_cyc: u32, delay_cyc: u32) -> Result<Self> {
        if period_cyc < MIN_PERIOD_CYC {
            return Err(Error::PeriodTooShort(period_cyc));
        }
        Ok(Self {
            period_cyc,
            delay_cyc: delay_cyc.max(1),
        })
    }

    /// Derive the timing for a bus configuration running from `sys_clk_hz`
    pub fn derive(sys_clk_hz: u32, bus: &BusConfig) -> Result<Self> {
        let period_cyc = derive_clock(sys_clk_hz, bus.frequency_hz, MIN_PERIOD_CYC)?;
        let delay_cyc = derive_clock(sys_clk_hz, DELAY_TICK_HZ, 1)?;
        log::debug!(
            "bus clock {} Hz -> period {} cycles, delay tick {} cycles",
            bus.frequency_hz,
            period_cyc,
            delay_cyc
        );
        Ok(Self {
            period_cyc,
            delay_cyc,
        })
    }

    /// Full bus clock period
    pub const fn period_cyc(&self) -> u32 {
        self.period_cyc
    }

    /// Length of one delay timer tick
    pub const fn delay_cyc(&self) -> u32 {
        self.delay_cyc
    }
}

/// Compute the number of input cycles per output cycle
///
/// The ratio is rounded to the nearest integer. Results below `min_cyc` are
/// rejected instead of clamped so the caller learns the real limit.
pub fn derive_clock(input_hz: u32, output_hz: u32, min_cyc: u32) -> Result<u32> {
    if output_hz == 0 {
        return Err(Error::FrequencyZero);
    }

    let input = input_hz as u64;
    let output = output_hz as u64;
    let cyc = ((input + output / 2) / output) as u32;

    if cyc < min_cyc.max(1) {
        return Err(Error::FrequencyTooHigh {
            requested_hz: output_hz,
            max_hz: input_hz / min_cyc.max(1),
        });
    }

    let actual_hz = input_hz / cyc;
    if actual_hz != output_hz {
        log::debug!(
            "requested {} Hz, generating {} Hz ({} cycles)",
            output_hz,
            actual_hz,
            cyc
        );
    }

    Ok(cyc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sck_edge_parse() {
        assert_eq!("r".parse::<SckEdge>(), Ok(SckEdge::Rising));
        assert_eq!("rising".parse::<SckEdge>(), Ok(SckEdge::Rising));
        assert_eq!("f".parse::<SckEdge>(), Ok(SckEdge::Falling));
        assert_eq!("falling".parse::<SckEdge>(), Ok(SckEdge::Falling));
        assert!("both".parse::<SckEdge>().is_err());
    }

    #[test]
    fn test_modes() {
        let mut bus = BusConfig::default();
        assert_eq!(bus.mode(), 0);
        bus.sck_edge = SckEdge::Falling;
        assert_eq!(bus.mode(), 1);
        bus.sck_idle = true;
        assert_eq!(bus.mode(), 2);
        bus.sck_edge = SckEdge::Rising;
        assert_eq!(bus.mode(), 3);
    }

    #[test]
    fn test_derive_clock() {
        assert_eq!(derive_clock(48_000_000, 100_000, 4), Ok(480));
        assert_eq!(derive_clock(48_000_000, 12_000_000, 4), Ok(4));
        assert_eq!(derive_clock(48_000_000, 1_000_000, 1), Ok(48));
        // 48 MHz / 7 MHz = 6.86 rounds to 7
        assert_eq!(derive_clock(48_000_000, 7_000_000, 4), Ok(7));
    }

    #[test]
    fn test_derive_clock_rejects() {
        assert_eq!(derive_clock(48_000_000, 0, 4), Err(Error::FrequencyZero));
        assert_eq!(
            derive_clock(48_000_000, 16_000_000, 4),
            Err(Error::FrequencyTooHigh {
                requested_hz: 16_000_000,
                max_hz: 12_000_000,
            })
        );
    }

    #[test]
    fn test_timing() {
        let timing = Timing::derive(DEFAULT_SYS_CLK_HZ, &BusConfig::default()).unwrap();
        assert_eq!(timing.period_cyc(), 480);
        assert_eq!(timing.delay_cyc(), 48);

        assert_eq!(Timing::new(0, 1), Err(Error::PeriodTooShort(0)));
        assert_eq!(Timing::new(3, 1), Err(Error::PeriodTooShort(3)));
        assert_eq!(Timing::new(4, 0).unwrap().delay_cyc(), 1);
    }
}
