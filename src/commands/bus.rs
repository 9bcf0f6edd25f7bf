//! Bus commands

use super::{format_hex, BoxedSession};
use spibridge_core::spi::IoMode;
use spibridge_host::Result;

/// Chip select line used by all commands
const CHIP: u8 = 0;

/// Run one exchange transaction per argument and print what came back
pub fn run_exchange(session: &mut BoxedSession, transactions: &[Vec<u8>]) -> Result<()> {
    for data in transactions {
        let received = session.with_selected(CHIP, |s| s.exchange(data))?;
        println!("{}", format_hex(&received));
    }
    session.synchronize()
}

/// Write `data` in one transaction
pub fn run_write(session: &mut BoxedSession, data: &[u8]) -> Result<()> {
    session.with_selected(CHIP, |s| s.write(data, IoMode::Single))?;
    session.synchronize()?;
    log::info!("Wrote {} bytes", data.len());
    Ok(())
}

/// Read `count` bytes in one transaction and print them
pub fn run_read(session: &mut BoxedSession, count: usize) -> Result<()> {
    let data = session.with_selected(CHIP, |s| s.read(count, IoMode::Single))?;
    session.synchronize()?;
    println!("{}", format_hex(&data));
    Ok(())
}

/// Wait on the device for `us` microseconds or `ms` milliseconds
pub fn run_delay(session: &mut BoxedSession, us: Option<u32>, ms: Option<u32>) -> Result<()> {
    if let Some(us) = us {
        session.delay_us(us)?;
    }
    if let Some(ms) = ms {
        session.delay_ms(ms)?;
    }
    session.synchronize()
}

/// Drive or tri-state chip select
pub fn run_output_enable(session: &mut BoxedSession, enable: bool) -> Result<()> {
    session.output_enable(enable)?;
    session.synchronize()?;
    log::info!(
        "Chip select {}",
        if enable { "driven" } else { "released" }
    );
    Ok(())
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use crate::targets::open_target;
    use spibridge_core::config::BusConfig;
    use spibridge_host::Session;

    fn sim_session() -> BoxedSession {
        Session::new(open_target("sim:period=4,delay=1", &BusConfig::default()).unwrap())
    }

    #[test]
    fn test_bus_commands_complete() {
        let mut session = sim_session();
        run_exchange(&mut session, &[vec![0x9F, 0x00], vec![0x05]]).unwrap();
        run_write(&mut session, &[0x06]).unwrap();
        run_read(&mut session, 4).unwrap();
        run_delay(&mut session, Some(10), None).unwrap();
        run_delay(&mut session, None, Some(1)).unwrap();
        run_output_enable(&mut session, false).unwrap();
        assert!(!session.output_enabled());
        assert_eq!(session.selected(), None);
    }
}
