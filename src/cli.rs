//! CLI argument parsing

use crate::targets;
use clap::{Parser, Subcommand, ValueEnum};
use spibridge_core::config::SckEdge;
use std::str::FromStr;

/// Bytes given on the command line as hex digit pairs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

impl FromStr for HexBytes {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_bytes(s).map(HexBytes)
    }
}

/// Parse a string of hex digit pairs, with an optional `0x` prefix
fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if digits.len() % 2 != 0 {
        return Err(format!("Odd number of hex digits in '{}'", s));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("Invalid hex byte at offset {} in '{}'", i, s))
        })
        .collect()
}

/// Parse a clock idle level given as 0 or 1
fn parse_level(s: &str) -> Result<bool, String> {
    match s {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(format!("Invalid level '{}' (expected 0 or 1)", s)),
    }
}

/// Generate dynamic help text for the target argument
fn target_help() -> String {
    format!(
        "Interpreter to connect to [available: {}]",
        targets::target_names_short()
    )
}

#[derive(Parser)]
#[command(name = "spibridge")]
#[command(author, version, about = "SPI command interpreter client", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short, long, global = true, default_value = "sim", help = target_help())]
    pub target: String,

    /// Bus clock frequency in kHz
    #[arg(short, long, global = true, default_value_t = 100)]
    pub frequency: u32,

    /// Clock level while idle (0 or 1)
    #[arg(
        long,
        global = true,
        default_value = "0",
        value_parser = parse_level,
        action = clap::ArgAction::Set
    )]
    pub sck_idle: bool,

    /// Clock edge on which data in is latched (r, rising, f, falling)
    #[arg(long, global = true, default_value = "rising")]
    pub sck_edge: SckEdge,

    #[command(subcommand)]
    pub command: Commands,
}

/// Chip select driver state
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    /// Drive chip select
    On,
    /// Tri-state chip select
    Off,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Exchange bytes, one chip select transaction per argument
    Exchange {
        /// Bytes to send as hex, e.g. 9f000000
        #[arg(required = true)]
        data: Vec<HexBytes>,
    },

    /// Write bytes in one transaction, discarding input
    Write {
        /// Bytes to send as hex
        data: HexBytes,
    },

    /// Read bytes in one transaction while holding data out low
    Read {
        /// Number of bytes to read
        count: usize,
    },

    /// Wait on the device
    #[command(group = clap::ArgGroup::new("duration").required(true))]
    Delay {
        /// Delay in microseconds
        #[arg(long, group = "duration")]
        us: Option<u32>,

        /// Delay in milliseconds
        #[arg(long, group = "duration")]
        ms: Option<u32>,
    },

    /// Drive or release the chip select line
    OutputEnable {
        /// New driver state
        #[arg(value_enum)]
        state: Switch,
    },

    /// List available targets
    ListTargets,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_bytes() {
        assert_eq!(parse_hex_bytes("9f00"), Ok(vec![0x9F, 0x00]));
        assert_eq!(parse_hex_bytes("0xAbCd"), Ok(vec![0xAB, 0xCD]));
        assert_eq!(parse_hex_bytes(""), Ok(vec![]));
        assert!(parse_hex_bytes("abc").is_err());
        assert!(parse_hex_bytes("zz").is_err());
    }

    #[test]
    fn test_cli_parses_exchange() {
        let cli = Cli::try_parse_from([
            "spibridge",
            "--sck-idle",
            "1",
            "--sck-edge",
            "f",
            "exchange",
            "9f000000",
            "05",
        ])
        .unwrap();
        assert!(cli.sck_idle);
        assert_eq!(cli.sck_edge, SckEdge::Falling);
        assert_eq!(cli.target, "sim");
        match cli.command {
            Commands::Exchange { data } => {
                assert_eq!(data, vec![HexBytes(vec![0x9F, 0, 0, 0]), HexBytes(vec![0x05])])
            }
            _ => panic!("expected exchange"),
        }
    }

    #[test]
    fn test_delay_needs_duration() {
        assert!(Cli::try_parse_from(["spibridge", "delay"]).is_err());
        assert!(Cli::try_parse_from(["spibridge", "delay", "--us", "5", "--ms", "1"]).is_err());
        assert!(Cli::try_parse_from(["spibridge", "delay", "--ms", "1"]).is_ok());
    }

    #[test]
    fn test_cli_debug_assert() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
