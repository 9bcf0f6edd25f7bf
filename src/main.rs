//! spibridge - Command-line client for the SPI command interpreter
//!
//! The interpreter executes a byte-stream protocol: select, shift, delay,
//! sync and output-enable commands go in, sampled bytes and sync
//! acknowledgements come out. This binary connects to an interpreter over a
//! serial port, a TCP socket or an in-process simulation and runs single bus
//! operations from the command line.

mod cli;
mod commands;
mod targets;

use clap::Parser;
use cli::{Cli, Commands, Switch};
use spibridge_core::config::BusConfig;
use spibridge_host::Session;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    if let Commands::ListTargets = cli.command {
        commands::list_targets();
        return Ok(());
    }

    let bus = BusConfig {
        frequency_hz: cli.frequency.saturating_mul(1000),
        sck_idle: cli.sck_idle,
        sck_edge: cli.sck_edge,
    };
    let transport = targets::open_target(&cli.target, &bus)?;
    let mut session = Session::new(transport);

    let result = match cli.command {
        Commands::Exchange { data } => {
            let transactions: Vec<Vec<u8>> = data.into_iter().map(|h| h.0).collect();
            commands::run_exchange(&mut session, &transactions)
        }
        Commands::Write { data } => commands::run_write(&mut session, &data.0),
        Commands::Read { count } => commands::run_read(&mut session, count),
        Commands::Delay { us, ms } => commands::run_delay(&mut session, us, ms),
        Commands::OutputEnable { state } => {
            commands::run_output_enable(&mut session, state == Switch::On)
        }
        Commands::ListTargets => Ok(()),
    };

    result.map_err(Into::into)
}
