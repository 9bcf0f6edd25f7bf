//! SPI I/O modes

use crate::error::{Error, Result};
use crate::spi::SpiFeatures;

/// I/O mode for SPI transfers
///
/// Only [`IoMode::Single`] is executable by the command interpreter; the
/// others are named so callers can ask for them and get a typed refusal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IoMode {
    /// Standard SPI: 1-1-1
    #[default]
    Single,
    /// Dual Output: 1-1-2 (data phase on 2 lines)
    DualOut,
    /// Dual I/O: 1-2-2 (addr and data on 2 lines)
    DualIo,
    /// Quad Output: 1-1-4 (data phase on 4 lines)
    QuadOut,
    /// Quad I/O: 1-4-4 (addr and data on 4 lines)
    QuadIo,
    /// QPI mode: 4-4-4 (everything on 4 lines)
    Qpi,
}

impl IoMode {
    /// Capability flag a master needs to run this mode
    const fn required_feature(&self) -> SpiFeatures {
        match self {
            Self::Single => SpiFeatures::empty(),
            Self::DualOut => SpiFeatures::DUAL_IN,
            Self::DualIo => SpiFeatures::DUAL_IO,
            Self::QuadOut => SpiFeatures::QUAD_IN,
            Self::QuadIo => SpiFeatures::QUAD_IO,
            Self::Qpi => SpiFeatures::QPI,
        }
    }
}

/// Check if a master with `features` can run the requested I/O mode
///
/// Returns `Ok(())` if the mode is supported, or `Err(IoModeNotSupported)` if not.
pub fn check_io_mode_supported(mode: IoMode, features: SpiFeatures) -> Result<()> {
    if features.contains(mode.required_feature()) {
        Ok(())
    } else {
        Err(Error::IoModeNotSupported(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_always_supported() {
        assert_eq!(
            check_io_mode_supported(IoMode::Single, SpiFeatures::empty()),
            Ok(())
        );
    }

    #[test]
    fn test_multi_lane_rejected() {
        for mode in [
            IoMode::DualOut,
            IoMode::DualIo,
            IoMode::QuadOut,
            IoMode::QuadIo,
            IoMode::Qpi,
        ] {
            assert_eq!(
                check_io_mode_supported(mode, SpiFeatures::empty()),
                Err(Error::IoModeNotSupported(mode))
            );
        }
        assert_eq!(
            check_io_mode_supported(IoMode::DualOut, SpiFeatures::DUAL_IN),
            Ok(())
        );
    }
}
