//! Bounded byte FIFOs for the command and response streams
//!
//! Both streams are flow controlled: the writer checks `w_rdy` and the reader
//! checks `r_rdy`. The response FIFO additionally separates committed bytes,
//! which the host may take, from bytes still being gathered into a packet.

use heapless::Deque;

/// Depth of the command (host to interpreter) FIFO
pub const COMMAND_FIFO_DEPTH: usize = 512;

/// Depth of the response (interpreter to host) FIFO
pub const RESPONSE_FIFO_DEPTH: usize = 1024;

/// Number of uncommitted response bytes that are committed without a flush
pub const PACKET_SIZE: usize = 512;

/// Command stream FIFO
pub struct CommandFifo {
    queue: Deque<u8, COMMAND_FIFO_DEPTH>,
}

impl CommandFifo {
    /// Create an empty FIFO
    pub const fn new() -> Self {
        Self {
            queue: Deque::new(),
        }
    }

    /// Returns true if a byte can be read
    pub fn r_rdy(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Returns true if a byte can be written
    pub fn w_rdy(&self) -> bool {
        !self.queue.is_full()
    }

    /// Take the next byte, if any
    pub fn read(&mut self) -> Option<u8> {
        self.queue.pop_front()
    }

    /// Append a byte, handing it back if the FIFO is full
    pub fn write(&mut self, byte: u8) -> Result<(), u8> {
        self.queue.push_back(byte)
    }

    /// Number of queued bytes
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if no byte is queued
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop all queued bytes
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl Default for CommandFifo {
    fn default() -> Self {
        Self::new()
    }
}

/// Response stream FIFO
pub struct ResponseFifo {
    queue: Deque<u8, RESPONSE_FIFO_DEPTH>,
    /// Number of bytes at the front of `queue` visible to the reader
    committed: usize,
}

impl ResponseFifo {
    /// Create an empty FIFO
    pub const fn new() -> Self {
        Self {
            queue: Deque::new(),
            committed: 0,
        }
    }

    /// Returns true if a byte can be written
    pub fn w_rdy(&self) -> bool {
        !self.queue.is_full()
    }

    /// Append a byte, handing it back if the FIFO is full
    ///
    /// A full packet of uncommitted bytes is committed automatically.
    pub fn write(&mut self, byte: u8) -> Result<(), u8> {
        self.queue.push_back(byte)?;
        if self.pending() >= PACKET_SIZE {
            self.flush();
        }
        Ok(())
    }

    /// Commit every byte written so far
    pub fn flush(&mut self) {
        self.committed = self.queue.len();
    }

    /// Returns true if a committed byte can be read
    pub fn r_rdy(&self) -> bool {
        self.committed > 0
    }

    /// Take the next committed byte, if any
    pub fn read(&mut self) -> Option<u8> {
        if self.committed == 0 {
            return None;
        }
        self.committed -= 1;
        self.queue.pop_front()
    }

    /// Number of bytes written but not yet committed
    pub fn pending(&self) -> usize {
        self.queue.len() - self.committed
    }

    /// Number of queued bytes, committed or not
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if no byte is queued
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop all queued bytes
    pub fn clear(&mut self) {
        self.queue.clear();
        self.committed = 0;
    }
}

impl Default for ResponseFifo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_fifo_backpressure() {
        let mut fifo = CommandFifo::new();
        for i in 0..COMMAND_FIFO_DEPTH {
            assert!(fifo.w_rdy());
            fifo.write(i as u8).unwrap();
        }
        assert!(!fifo.w_rdy());
        assert_eq!(fifo.write(0xAA), Err(0xAA));
        assert_eq!(fifo.read(), Some(0));
        assert!(fifo.w_rdy());
    }

    #[test]
    fn test_response_needs_commit() {
        let mut fifo = ResponseFifo::new();
        fifo.write(0x12).unwrap();
        assert!(!fifo.r_rdy());
        assert_eq!(fifo.read(), None);
        assert_eq!(fifo.pending(), 1);

        fifo.flush();
        assert_eq!(fifo.pending(), 0);
        assert_eq!(fifo.read(), Some(0x12));
        assert_eq!(fifo.read(), None);
    }

    #[test]
    fn test_response_packet_autocommit() {
        let mut fifo = ResponseFifo::new();
        for i in 0..PACKET_SIZE - 1 {
            fifo.write(i as u8).unwrap();
        }
        assert!(!fifo.r_rdy());
        fifo.write(0xFF).unwrap();
        assert!(fifo.r_rdy());
        assert_eq!(fifo.pending(), 0);
        assert_eq!(fifo.read(), Some(0));
    }
}
