//! Command interpreter
//!
//! A flat state machine over a handful of registers, advanced once per system
//! clock cycle by [`Interpreter::step`]. It reads opcodes and payload from the
//! command FIFO, shifts bytes through the bus driver and writes sampled bytes
//! and SYNC acknowledgements to the response FIFO.
//!
//! A stalled stream (command FIFO empty, response FIFO full) leaves the
//! machine in its current state until the stream becomes ready. The clock
//! generator runs only in [`State::Transfer`], so every transferred byte gets
//! exactly eight clock periods and no edge appears anywhere else.

use spibridge_core::config::{BusConfig, Timing};
use spibridge_core::protocol::{Opcode, ShiftFlags, SYNC_REPLY};
use spibridge_core::Error;

use crate::bus::{Bus, BusEvent, Pins};
use crate::clockgen::ClockGen;
use crate::fifo::{CommandFifo, ResponseFifo};

/// Interpreter states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Waiting for an opcode; commits pending response bytes
    RecvCommand,
    /// Emitting the SYNC acknowledgement
    Sync,
    /// Waiting for the low count byte
    RecvCount1,
    /// Waiting for the high count byte
    RecvCount2,
    /// Counting down microseconds
    Delay,
    /// Checking for an empty shift
    CountCheck,
    /// Loading the next output byte
    RecvData,
    /// Clocking one byte
    Transfer,
    /// Emitting the sampled byte
    SendData,
    /// Halted after a malformed opcode; only a reset leaves this state
    Fault(Error),
}

/// The command interpreter and its registers
pub struct Interpreter {
    config: BusConfig,
    timing: Timing,
    bus: Bus,
    clkgen: ClockGen,
    state: State,
    /// Opcode of the SHIFT or DELAY being executed
    op: Opcode,
    count: u16,
    bitno: u8,
    shreg_o: u8,
    shreg_i: u8,
    /// Suppress the next setup event so the MSB stays on the line
    skip_setup: bool,
    timer: u32,
}

impl Interpreter {
    /// Create an interpreter in its initial state
    pub fn new(config: BusConfig, timing: Timing) -> Self {
        Self {
            bus: Bus::new(&config),
            clkgen: ClockGen::new(timing.period_cyc()),
            config,
            timing,
            state: State::RecvCommand,
            op: Opcode::Delay,
            count: 0,
            bitno: 0,
            shreg_o: 0,
            shreg_i: 0,
            skip_setup: false,
            timer: 0,
        }
    }

    /// Return every register to its initial value
    pub fn reset(&mut self) {
        log::debug!("interpreter: reset");
        self.bus.reset();
        self.clkgen.step(true);
        self.state = State::RecvCommand;
        self.op = Opcode::Delay;
        self.count = 0;
        self.bitno = 0;
        self.shreg_o = 0;
        self.shreg_i = 0;
        self.skip_setup = false;
        self.timer = 0;
    }

    /// Current state
    pub fn state(&self) -> State {
        self.state
    }

    /// Error that halted the interpreter, if any
    pub fn fault(&self) -> Option<Error> {
        match self.state {
            State::Fault(e) => Some(e),
            _ => None,
        }
    }

    /// Bus configuration
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Timing in system cycles
    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Bus driver state
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Pin levels driven during the current cycle
    pub fn pins(&self) -> Pins {
        self.bus.pins(self.clkgen.clk(), self.shreg_o & 0x80 != 0)
    }

    /// Returns true if no further progress is possible without new commands
    ///
    /// Pending response bytes keep the interpreter busy until the next
    /// RecvCommand cycle has committed them.
    pub fn is_starved(&self, commands: &CommandFifo, responses: &ResponseFifo) -> bool {
        let waiting = match self.state {
            State::RecvCommand => responses.pending() == 0,
            State::RecvCount1 | State::RecvCount2 => true,
            State::RecvData => self.flags().contains(ShiftFlags::DATA_OUT),
            State::Fault(_) => return true,
            _ => false,
        };
        waiting && commands.is_empty()
    }

    fn flags(&self) -> ShiftFlags {
        match self.op {
            Opcode::Shift(flags) => flags,
            _ => ShiftFlags::empty(),
        }
    }

    /// Advance by one system cycle
    ///
    /// `cipo_pin` is the raw data in level for this cycle; it becomes visible
    /// to sampling two cycles later.
    pub fn step(&mut self, commands: &mut CommandFifo, responses: &mut ResponseFifo, cipo_pin: bool) {
        let sck = self.bus.sck(self.clkgen.clk());
        let event = self.bus.event(sck);
        let cipo = self.bus.cipo();
        let stb_r = self.clkgen.stb_r();
        let stb_f = self.clkgen.stb_f();
        let timer_zero = self.timer == 0;
        let mut timer_en = false;
        let in_transfer = self.state == State::Transfer;

        match event {
            BusEvent::Setup if self.skip_setup => self.skip_setup = false,
            BusEvent::Setup => self.shreg_o <<= 1,
            BusEvent::Latch => self.shreg_i = (self.shreg_i << 1) | cipo as u8,
            BusEvent::None => {}
        }

        match self.state {
            State::RecvCommand => {
                responses.flush();
                if let Some(byte) = commands.read() {
                    self.state = self.decode(byte);
                }
            }

            State::Sync => {
                if responses.write(SYNC_REPLY).is_ok() {
                    self.state = State::RecvCommand;
                }
            }

            State::RecvCount1 => {
                if let Some(byte) = commands.read() {
                    self.count = (self.count & 0xFF00) | byte as u16;
                    self.state = State::RecvCount2;
                }
            }

            State::RecvCount2 => {
                if let Some(byte) = commands.read() {
                    self.count = (self.count & 0x00FF) | (byte as u16) << 8;
                    self.state = if self.op == Opcode::Delay {
                        State::Delay
                    } else {
                        State::CountCheck
                    };
                }
            }

            State::Delay => {
                if timer_zero {
                    if self.count == 0 {
                        self.state = State::RecvCommand;
                    } else {
                        self.count -= 1;
                        timer_en = true;
                    }
                }
            }

            State::CountCheck => {
                self.state = if self.count == 0 {
                    State::RecvCommand
                } else {
                    State::RecvData
                };
            }

            State::RecvData => {
                let loaded = if self.flags().contains(ShiftFlags::DATA_OUT) {
                    match commands.read() {
                        Some(byte) => {
                            self.shreg_o = byte;
                            true
                        }
                        None => false,
                    }
                } else {
                    self.shreg_o = 0;
                    true
                };

                if loaded {
                    self.count -= 1;
                    self.bitno = 8;
                    self.skip_setup = self.config.setup_on_leading_edge();
                    self.state = State::Transfer;
                }
            }

            State::Transfer => {
                if stb_r {
                    self.bitno -= 1;
                } else if stb_f && self.bitno == 0 {
                    self.state = State::SendData;
                }
            }

            State::SendData => {
                let sent = !self.flags().contains(ShiftFlags::DATA_IN)
                    || responses.write(self.shreg_i).is_ok();
                if sent {
                    self.state = if self.count == 0 {
                        State::RecvCommand
                    } else {
                        State::RecvData
                    };
                }
            }

            State::Fault(_) => {}
        }

        if !timer_zero {
            self.timer -= 1;
        } else if timer_en {
            self.timer = self.timing.delay_cyc() - 1;
        }

        self.clkgen.step(!in_transfer);
        self.bus.step(sck, cipo_pin);
    }

    /// Act on an opcode read in RecvCommand and return the next state
    fn decode(&mut self, byte: u8) -> State {
        let op = match Opcode::from_byte(byte) {
            Ok(op) => op,
            Err(e) => {
                log::error!("interpreter: halting on malformed opcode: {}", e);
                return State::Fault(e);
            }
        };
        log::trace!("interpreter: {:?}", op);

        match op {
            Opcode::Select(level) => {
                self.bus.set_cs(level);
                State::RecvCommand
            }
            Opcode::OutputEnable(enable) => {
                self.bus.set_cs_oe(enable);
                State::RecvCommand
            }
            Opcode::Sync => State::Sync,
            Opcode::Shift(_) | Opcode::Delay => {
                self.op = op;
                State::RecvCount1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spibridge_core::protocol::{Command, CMD_SYNC};

    fn interpreter() -> (Interpreter, CommandFifo, ResponseFifo) {
        let timing = Timing::new(4, 2).unwrap();
        (
            Interpreter::new(BusConfig::default(), timing),
            CommandFifo::new(),
            ResponseFifo::new(),
        )
    }

    fn queue(fifo: &mut CommandFifo, bytes: &[u8]) {
        for &b in bytes {
            fifo.write(b).unwrap();
        }
    }

    /// Step until starved, returning the number of cycles taken
    fn run(interp: &mut Interpreter, cmd: &mut CommandFifo, rsp: &mut ResponseFifo) -> usize {
        let mut cycles = 0;
        while !interp.is_starved(cmd, rsp) {
            interp.step(cmd, rsp, false);
            cycles += 1;
            assert!(cycles < 1_000_000, "interpreter did not settle");
        }
        cycles
    }

    #[test]
    fn test_select_and_output_enable() {
        let (mut interp, mut cmd, mut rsp) = interpreter();
        queue(&mut cmd, &[0x01]);
        run(&mut interp, &mut cmd, &mut rsp);
        assert!(interp.bus().cs());
        assert_eq!(interp.pins().cs, Some(false));

        queue(&mut cmd, &[0x40]);
        run(&mut interp, &mut cmd, &mut rsp);
        assert_eq!(interp.pins().cs, None);

        queue(&mut cmd, &[0x41, 0x00]);
        run(&mut interp, &mut cmd, &mut rsp);
        assert_eq!(interp.pins().cs, Some(true));
        assert_eq!(interp.state(), State::RecvCommand);
    }

    #[test]
    fn test_sync_replies_zero() {
        let (mut interp, mut cmd, mut rsp) = interpreter();
        queue(&mut cmd, &[CMD_SYNC, CMD_SYNC]);
        run(&mut interp, &mut cmd, &mut rsp);
        assert_eq!(rsp.read(), Some(0));
        assert_eq!(rsp.read(), Some(0));
        assert_eq!(rsp.read(), None);
    }

    #[test]
    fn test_zero_count_shift_is_noop() {
        let (mut interp, mut cmd, mut rsp) = interpreter();
        let shift = Command::Shift {
            flags: ShiftFlags::all(),
            count: 0,
        };
        queue(&mut cmd, &shift.encode());
        queue(&mut cmd, &[CMD_SYNC]);
        run(&mut interp, &mut cmd, &mut rsp);
        assert_eq!(rsp.read(), Some(0));
        assert_eq!(rsp.read(), None);
    }

    #[test]
    fn test_read_shift_returns_sampled_bytes() {
        let (mut interp, mut cmd, mut rsp) = interpreter();
        let shift = Command::Shift {
            flags: ShiftFlags::DATA_IN,
            count: 3,
        };
        queue(&mut cmd, &shift.encode());
        // Data in held low: every sampled byte is zero
        run(&mut interp, &mut cmd, &mut rsp);
        assert_eq!(rsp.read(), Some(0));
        assert_eq!(rsp.read(), Some(0));
        assert_eq!(rsp.read(), Some(0));
        assert_eq!(rsp.read(), None);
    }

    #[test]
    fn test_shift_waits_for_payload() {
        let (mut interp, mut cmd, mut rsp) = interpreter();
        let shift = Command::Shift {
            flags: ShiftFlags::DATA_OUT,
            count: 2,
        };
        queue(&mut cmd, &shift.encode());
        queue(&mut cmd, &[0xA5]);
        run(&mut interp, &mut cmd, &mut rsp);
        // One byte shifted, the second is still awaited
        assert_eq!(interp.state(), State::RecvData);

        queue(&mut cmd, &[0x5A]);
        run(&mut interp, &mut cmd, &mut rsp);
        assert_eq!(interp.state(), State::RecvCommand);
    }

    #[test]
    fn test_response_backpressure_blocks() {
        let (mut interp, mut cmd, mut rsp) = interpreter();
        for _ in 0..crate::fifo::RESPONSE_FIFO_DEPTH {
            rsp.write(0xEE).unwrap();
        }
        queue(&mut cmd, &[CMD_SYNC]);
        for _ in 0..100 {
            interp.step(&mut cmd, &mut rsp, false);
        }
        assert_eq!(interp.state(), State::Sync);

        rsp.flush();
        rsp.read();
        interp.step(&mut cmd, &mut rsp, false);
        assert_eq!(interp.state(), State::RecvCommand);
    }

    #[test]
    fn test_delay_duration() {
        let (mut interp, mut cmd, mut rsp) = interpreter();
        queue(&mut cmd, &Command::Delay(10).encode());
        let short = run(&mut interp, &mut cmd, &mut rsp);

        queue(&mut cmd, &Command::Delay(20).encode());
        let long = run(&mut interp, &mut cmd, &mut rsp);

        // Each microsecond costs delay_cyc cycles
        assert_eq!(long - short, 10 * 2);
    }

    #[test]
    fn test_malformed_opcode_faults() {
        let (mut interp, mut cmd, mut rsp) = interpreter();
        queue(&mut cmd, &[0x77, CMD_SYNC]);
        run(&mut interp, &mut cmd, &mut rsp);
        assert_eq!(interp.fault(), Some(Error::UnknownOpcode(0x77)));
        // Nothing after the bad opcode is executed
        assert_eq!(cmd.len(), 1);
        rsp.flush();
        assert_eq!(rsp.read(), None);

        interp.reset();
        assert_eq!(interp.fault(), None);
        run(&mut interp, &mut cmd, &mut rsp);
        assert_eq!(rsp.read(), Some(0));
    }

    #[test]
    fn test_clock_idle_outside_transfer() {
        let (mut interp, mut cmd, mut rsp) = interpreter();
        queue(&mut cmd, &Command::Delay(5).encode());
        queue(&mut cmd, &[0x01, CMD_SYNC]);
        while !interp.is_starved(&cmd, &rsp) {
            assert!(!interp.pins().sck);
            interp.step(&mut cmd, &mut rsp, false);
        }
    }
}
