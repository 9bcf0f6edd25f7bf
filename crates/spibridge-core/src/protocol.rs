//! Command stream protocol constants and framing
//!
//! Every command starts with one opcode byte. The high nibble selects the
//! command, the low nibble carries flags or a single operand bit. SHIFT and
//! DELAY are followed by a little-endian 16-bit count; SHIFT with DATA-OUT is
//! additionally followed by `count` payload bytes.
//!
//! The response stream carries one byte per DATA-IN transferred byte and one
//! zero byte per SYNC.

use bitflags::bitflags;
use heapless::Vec;

use crate::error::{Error, Result};

/// Mask selecting the command nibble of an opcode
pub const CMD_MASK: u8 = 0b1111_0000;
/// Drive chip select, bit 0 is the logical level
pub const CMD_SELECT: u8 = 0b0000_0000;
/// Shift bytes on the bus, low bits are [`ShiftFlags`]
pub const CMD_SHIFT: u8 = 0b0001_0000;
/// Wait for a number of microseconds
pub const CMD_DELAY: u8 = 0b0010_0000;
/// Barrier, answered with a single zero byte
pub const CMD_SYNC: u8 = 0b0011_0000;
/// Enable or tri-state the chip select driver, bit 0 is the enable
pub const CMD_OUT_EN: u8 = 0b0100_0000;

/// Largest count a single SHIFT or DELAY frame can carry
pub const MAX_COUNT: usize = 0xFFFF;

/// Length of a SHIFT or DELAY header (opcode plus 16-bit count)
pub const HEADER_LEN: usize = 3;

/// Value of the byte answering a SYNC
pub const SYNC_REPLY: u8 = 0x00;

/// Operand bit of SELECT and OUTPUT-ENABLE
const OPERAND_BIT: u8 = 0b0001;

bitflags! {
    /// Data direction flags of a SHIFT opcode
    ///
    /// A SHIFT with neither flag set still clocks the bus, eight periods per
    /// counted byte, without moving data.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShiftFlags: u8 {
        /// Payload bytes follow on the command stream and are shifted out
        const DATA_OUT = 0b0001;
        /// Sampled bytes are returned on the response stream
        const DATA_IN  = 0b0010;
    }
}

/// A decoded opcode byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Set the logical chip select level (`true` asserts)
    Select(bool),
    /// Shift bytes in the given directions
    Shift(ShiftFlags),
    /// Wait for microseconds
    Delay,
    /// Emit one zero byte once everything before it has completed
    Sync,
    /// Drive (`true`) or tri-state (`false`) the chip select line
    OutputEnable(bool),
}

impl Opcode {
    /// Decode an opcode byte
    ///
    /// Unknown command nibbles and undefined low bits are rejected rather than
    /// being silently interpreted.
    pub fn from_byte(byte: u8) -> Result<Self> {
        let low = byte & !CMD_MASK;
        match byte & CMD_MASK {
            CMD_SELECT if low & !OPERAND_BIT == 0 => Ok(Self::Select(low != 0)),
            CMD_SHIFT => ShiftFlags::from_bits(low)
                .map(Self::Shift)
                .ok_or(Error::ReservedBits(byte)),
            CMD_DELAY if low == 0 => Ok(Self::Delay),
            CMD_SYNC if low == 0 => Ok(Self::Sync),
            CMD_OUT_EN if low & !OPERAND_BIT == 0 => Ok(Self::OutputEnable(low != 0)),
            CMD_SELECT | CMD_DELAY | CMD_SYNC | CMD_OUT_EN => Err(Error::ReservedBits(byte)),
            _ => Err(Error::UnknownOpcode(byte)),
        }
    }

    /// Encode this opcode into its wire byte
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Select(level) => CMD_SELECT | level as u8,
            Self::Shift(flags) => CMD_SHIFT | flags.bits(),
            Self::Delay => CMD_DELAY,
            Self::Sync => CMD_SYNC,
            Self::OutputEnable(enable) => CMD_OUT_EN | enable as u8,
        }
    }

    /// Returns true if a 16-bit count follows this opcode
    pub const fn has_count(self) -> bool {
        matches!(self, Self::Shift(_) | Self::Delay)
    }
}

/// A single command frame header
///
/// Payload bytes of SHIFT with DATA-OUT are not part of the frame; they are
/// written right after the encoded header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Set chip select level
    Select(bool),
    /// Shift `count` bytes
    Shift {
        /// Data directions
        flags: ShiftFlags,
        /// Number of bytes (eight clock periods each)
        count: u16,
    },
    /// Wait `count` microseconds
    Delay(u16),
    /// Barrier
    Sync,
    /// Chip select driver enable
    OutputEnable(bool),
}

impl Command {
    /// Opcode byte of this command
    pub const fn opcode(&self) -> Opcode {
        match *self {
            Self::Select(level) => Opcode::Select(level),
            Self::Shift { flags, .. } => Opcode::Shift(flags),
            Self::Delay(_) => Opcode::Delay,
            Self::Sync => Opcode::Sync,
            Self::OutputEnable(enable) => Opcode::OutputEnable(enable),
        }
    }

    /// Number of payload bytes that must follow the header on the command stream
    pub const fn payload_len(&self) -> usize {
        match *self {
            Self::Shift { flags, count } if flags.contains(ShiftFlags::DATA_OUT) => count as usize,
            _ => 0,
        }
    }

    /// Number of bytes this command produces on the response stream
    pub const fn response_len(&self) -> usize {
        match *self {
            Self::Shift { flags, count } if flags.contains(ShiftFlags::DATA_IN) => count as usize,
            Self::Sync => 1,
            _ => 0,
        }
    }

    /// Encode the frame header (opcode and, if present, little-endian count)
    pub fn encode(&self) -> Vec<u8, HEADER_LEN> {
        let mut buf = Vec::new();
        // Capacity covers the longest header, pushes cannot fail.
        let _ = buf.push(self.opcode().to_byte());
        let count = match *self {
            Self::Shift { count, .. } | Self::Delay(count) => Some(count),
            _ => None,
        };
        if let Some(count) = count {
            let _ = buf.extend_from_slice(&count.to_le_bytes());
        }
        buf
    }
}

/// Split a logical length into frame counts of at most [`MAX_COUNT`]
///
/// A length of zero yields no frames.
pub fn chunks(len: usize) -> impl Iterator<Item = u16> {
    let mut remaining = len;
    core::iter::from_fn(move || {
        if remaining == 0 {
            return None;
        }
        let n = remaining.min(MAX_COUNT);
        remaining -= n;
        Some(n as u16)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_bytes() {
        assert_eq!(Opcode::Select(true).to_byte(), 0x01);
        assert_eq!(Opcode::Select(false).to_byte(), 0x00);
        assert_eq!(Opcode::Shift(ShiftFlags::all()).to_byte(), 0x13);
        assert_eq!(Opcode::Shift(ShiftFlags::DATA_OUT).to_byte(), 0x11);
        assert_eq!(Opcode::Shift(ShiftFlags::DATA_IN).to_byte(), 0x12);
        assert_eq!(Opcode::Shift(ShiftFlags::empty()).to_byte(), 0x10);
        assert_eq!(Opcode::Delay.to_byte(), 0x20);
        assert_eq!(Opcode::Sync.to_byte(), 0x30);
        assert_eq!(Opcode::OutputEnable(true).to_byte(), 0x41);
    }

    #[test]
    fn test_opcode_decode() {
        assert_eq!(Opcode::from_byte(0x01), Ok(Opcode::Select(true)));
        assert_eq!(
            Opcode::from_byte(0x13),
            Ok(Opcode::Shift(ShiftFlags::DATA_IN | ShiftFlags::DATA_OUT))
        );
        assert_eq!(Opcode::from_byte(0x40), Ok(Opcode::OutputEnable(false)));
        assert_eq!(Opcode::from_byte(0x30), Ok(Opcode::Sync));
    }

    #[test]
    fn test_opcode_decode_rejects_malformed() {
        assert_eq!(Opcode::from_byte(0x50), Err(Error::UnknownOpcode(0x50)));
        assert_eq!(Opcode::from_byte(0xFF), Err(Error::UnknownOpcode(0xFF)));
        assert_eq!(Opcode::from_byte(0x02), Err(Error::ReservedBits(0x02)));
        assert_eq!(Opcode::from_byte(0x14), Err(Error::ReservedBits(0x14)));
        assert_eq!(Opcode::from_byte(0x21), Err(Error::ReservedBits(0x21)));
        assert_eq!(Opcode::from_byte(0x38), Err(Error::ReservedBits(0x38)));
    }

    #[test]
    fn test_command_encode() {
        let cmd = Command::Shift {
            flags: ShiftFlags::DATA_OUT,
            count: 0x1234,
        };
        assert_eq!(cmd.encode().as_slice(), &[0x11, 0x34, 0x12]);
        assert_eq!(cmd.payload_len(), 0x1234);
        assert_eq!(cmd.response_len(), 0);

        assert_eq!(Command::Delay(1000).encode().as_slice(), &[0x20, 0xE8, 0x03]);
        assert_eq!(Command::Sync.encode().as_slice(), &[0x30]);
        assert_eq!(Command::Sync.response_len(), 1);
        assert_eq!(Command::Select(false).encode().as_slice(), &[0x00]);
    }

    #[test]
    fn test_chunks() {
        let mut it = chunks(0);
        assert_eq!(it.next(), None);

        let sizes: [u16; 2] = [0xFFFF, 2];
        assert!(chunks(65537).eq(sizes.iter().copied()));

        let sizes: [u16; 2] = [0xFFFF, 0xFFFF];
        assert!(chunks(2 * MAX_COUNT).eq(sizes.iter().copied()));
        assert!(chunks(7).eq(core::iter::once(7)));
    }
}
