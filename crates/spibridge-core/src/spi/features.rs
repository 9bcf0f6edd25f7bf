//! Bus capability flags

use bitflags::bitflags;

bitflags! {
    /// Capabilities of a bus master
    ///
    /// The command interpreter shifts a single bit per clock, so a session
    /// reports none of these; they exist so lane checks are explicit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SpiFeatures: u32 {
        /// Can read two bits at once (1-1-2 mode)
        const DUAL_IN        = 1 << 0;
        /// Can transfer two bits at once (1-2-2 mode)
        const DUAL_IO        = 1 << 1;
        /// Can read four bits at once (1-1-4 mode)
        const QUAD_IN        = 1 << 2;
        /// Can transfer four bits at once (1-4-4 mode)
        const QUAD_IO        = 1 << 3;
        /// Can send commands with quad I/O (4-4-4 mode)
        const QPI            = 1 << 4;
        /// Supports more than one chip select line
        const MULTI_CS       = 1 << 5;
    }
}

impl Default for SpiFeatures {
    fn default() -> Self {
        SpiFeatures::empty()
    }
}
