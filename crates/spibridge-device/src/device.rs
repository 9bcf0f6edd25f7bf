//! Interpreter, stream FIFOs and a simulated peripheral ticked together

use spibridge_core::config::{BusConfig, Timing};
use spibridge_core::Error;

use crate::bus::Pins;
use crate::fifo::{CommandFifo, ResponseFifo};
use crate::interpreter::{Interpreter, State};
use crate::peer::{Peripheral, PinPeer};

/// A complete simulated device
///
/// The host side pushes command bytes with [`Device::write`] and takes
/// committed response bytes with [`Device::read`]; [`Device::tick`] advances
/// everything by one system clock cycle.
pub struct Device<P> {
    interpreter: Interpreter,
    commands: CommandFifo,
    responses: ResponseFifo,
    peer: PinPeer<P>,
    /// Data in level driven by the peripheral, sampled on the next cycle
    cipo: bool,
    cycles: u64,
}

impl<P: Peripheral> Device<P> {
    /// Create a device with `peripheral` attached to its bus
    pub fn new(config: BusConfig, timing: Timing, peripheral: P) -> Self {
        log::debug!(
            "device: mode {}, period {} cycles, delay tick {} cycles",
            config.mode(),
            timing.period_cyc(),
            timing.delay_cyc()
        );
        Self {
            interpreter: Interpreter::new(config, timing),
            commands: CommandFifo::new(),
            responses: ResponseFifo::new(),
            peer: PinPeer::new(&config, peripheral),
            cipo: false,
            cycles: 0,
        }
    }

    /// Advance by one system clock cycle
    ///
    /// The peripheral observes the pins as they stand after the step, so it
    /// has seen every level change once the device reports starvation.
    pub fn tick(&mut self) {
        self.interpreter
            .step(&mut self.commands, &mut self.responses, self.cipo);
        self.cipo = self.peer.tick(&self.interpreter.pins());
        self.cycles += 1;
    }

    /// Queue a command byte, handing it back if the command FIFO is full
    pub fn write(&mut self, byte: u8) -> Result<(), u8> {
        self.commands.write(byte)
    }

    /// Take the next committed response byte
    pub fn read(&mut self) -> Option<u8> {
        self.responses.read()
    }

    /// Returns true if the interpreter cannot progress without more commands
    pub fn is_starved(&self) -> bool {
        self.interpreter
            .is_starved(&self.commands, &self.responses)
    }

    /// Tick until starved or until `max_cycles` have elapsed
    ///
    /// Returns the number of cycles run.
    pub fn run_until_starved(&mut self, max_cycles: u64) -> u64 {
        let start = self.cycles;
        while !self.is_starved() && self.cycles - start < max_cycles {
            self.tick();
        }
        self.cycles - start
    }

    /// Return the interpreter to its initial state and drop queued bytes
    pub fn reset(&mut self) {
        self.interpreter.reset();
        self.commands.clear();
        self.responses.clear();
        self.cipo = self.peer.tick(&self.interpreter.pins());
    }

    /// Error that halted the interpreter, if any
    pub fn fault(&self) -> Option<Error> {
        self.interpreter.fault()
    }

    /// Current interpreter state
    pub fn state(&self) -> State {
        self.interpreter.state()
    }

    /// Pin levels for the current cycle
    pub fn pins(&self) -> Pins {
        self.interpreter.pins()
    }

    /// System clock cycles elapsed since creation
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// The interpreter
    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// The simulated target on the bus
    pub fn peer(&self) -> &PinPeer<P> {
        &self.peer
    }

    /// Mutable access to the simulated target
    pub fn peer_mut(&mut self) -> &mut PinPeer<P> {
        &mut self.peer
    }
}
