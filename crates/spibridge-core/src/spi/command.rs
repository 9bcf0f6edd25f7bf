//! SPI transaction descriptor

use super::{AddressWidth, IoMode};

/// A single chip-selected SPI transaction
///
/// Designed to avoid allocation - uses slices for data.
/// The lifetime parameter `'a` ties the command to the buffers it references.
pub struct SpiCommand<'a> {
    /// The opcode byte
    pub opcode: u8,

    /// Address (if any)
    pub address: Option<u32>,

    /// Address width
    pub address_width: AddressWidth,

    /// I/O mode
    pub io_mode: IoMode,

    /// Number of dummy clock cycles after the address
    pub dummy_cycles: u8,

    /// Data to write after opcode and address
    pub write_data: &'a [u8],

    /// Buffer to read into after the write phase
    pub read_buf: &'a mut [u8],
}

impl<'a> SpiCommand<'a> {
    /// Create a command with only an opcode
    pub fn simple(opcode: u8) -> Self {
        Self {
            opcode,
            address: None,
            address_width: AddressWidth::None,
            io_mode: IoMode::Single,
            dummy_cycles: 0,
            write_data: &[],
            read_buf: &mut [],
        }
    }

    /// Create a register read: opcode followed by `buf.len()` read bytes
    pub fn read_reg(opcode: u8, buf: &'a mut [u8]) -> Self {
        Self {
            read_buf: buf,
            ..Self::simple(opcode)
        }
    }

    /// Create a register write: opcode followed by `data`
    pub fn write_reg(opcode: u8, data: &'a [u8]) -> Self {
        Self {
            write_data: data,
            ..Self::simple(opcode)
        }
    }

    /// Create a read with a 3-byte address
    pub fn read_3b(opcode: u8, addr: u32, buf: &'a mut [u8]) -> Self {
        Self {
            address: Some(addr),
            address_width: AddressWidth::ThreeByte,
            read_buf: buf,
            ..Self::simple(opcode)
        }
    }

    /// Create a write with a 3-byte address
    pub fn write_3b(opcode: u8, addr: u32, data: &'a [u8]) -> Self {
        Self {
            address: Some(addr),
            address_width: AddressWidth::ThreeByte,
            write_data: data,
            ..Self::simple(opcode)
        }
    }

    /// Set the I/O mode for this command
    pub fn with_io_mode(mut self, mode: IoMode) -> Self {
        self.io_mode = mode;
        self
    }

    /// Set the number of dummy cycles
    pub fn with_dummy_cycles(mut self, cycles: u8) -> Self {
        self.dummy_cycles = cycles;
        self
    }

    /// Length of the opcode plus address phase in bytes
    pub fn header_len(&self) -> usize {
        1 + if self.address.is_some() {
            self.address_width.bytes()
        } else {
            0
        }
    }

    /// Encode opcode and address into the start of `buf`
    ///
    /// `buf` must be at least [`header_len`](Self::header_len) bytes long.
    pub fn encode_header(&self, buf: &mut [u8]) {
        buf[0] = self.opcode;
        if let Some(addr) = self.address {
            self.address_width.encode(addr, &mut buf[1..]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_encoding() {
        let mut buf = [0u8; 4];
        let cmd = SpiCommand::read_3b(0x03, 0x123456, &mut buf);
        assert_eq!(cmd.header_len(), 4);

        let mut header = [0u8; 4];
        cmd.encode_header(&mut header);
        assert_eq!(header, [0x03, 0x12, 0x34, 0x56]);
    }

    #[test]
    fn test_simple_header() {
        let cmd = SpiCommand::simple(0x06);
        assert_eq!(cmd.header_len(), 1);
        let mut header = [0u8; 1];
        cmd.encode_header(&mut header);
        assert_eq!(header, [0x06]);
    }

    #[test]
    fn test_write_header_excludes_data() {
        let data = [0xAA, 0xBB];
        let cmd = SpiCommand::write_3b(0x02, 0x000100, &data);
        assert_eq!(cmd.header_len(), 4);
        assert_eq!(cmd.write_data, &data);

        let mut header = [0u8; 4];
        cmd.encode_header(&mut header);
        assert_eq!(header, [0x02, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_four_byte_address_header() {
        let mut buf = [0u8; 1];
        let cmd = SpiCommand {
            address_width: AddressWidth::FourByte,
            ..SpiCommand::read_3b(0x13, 0x0102_0304, &mut buf)
        };
        assert_eq!(cmd.header_len(), 5);

        let mut header = [0u8; 5];
        cmd.encode_header(&mut header);
        assert_eq!(header, [0x13, 0x01, 0x02, 0x03, 0x04]);
    }
}
