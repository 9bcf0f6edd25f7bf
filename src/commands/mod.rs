//! CLI command implementations
//!
//! Every bus command runs against a [`Session`] and ends with a SYNC barrier,
//! so the process only exits once the interpreter has retired everything.

mod bus;
mod list;

pub use bus::{run_delay, run_exchange, run_output_enable, run_read, run_write};
pub use list::list_targets;

use spibridge_host::{Session, Transport};

/// Session over whichever transport the target string selected
pub type BoxedSession = Session<Box<dyn Transport>>;

/// Format bytes as space-separated hex
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[]), "");
        assert_eq!(format_hex(&[0x9f, 0x00, 0xef]), "9f 00 ef");
    }
}
