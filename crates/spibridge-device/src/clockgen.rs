//! Bus clock generator
//!
//! Produces a clock phase that toggles every half period while running. The
//! phase is `false` at reset; the bus driver maps it onto the configured idle
//! level, so a rising phase edge always leaves idle and a falling phase edge
//! always returns to it.

/// Free-running clock with edge strobes
pub struct ClockGen {
    /// Full period in system cycles
    cyc: u32,
    counter: u32,
    clk: bool,
    clk_r: bool,
}

impl ClockGen {
    /// Create a generator with a period of `cyc` system cycles
    pub fn new(cyc: u32) -> Self {
        debug_assert!(cyc >= 2, "clock period must be at least two cycles");
        Self {
            cyc,
            counter: 0,
            clk: false,
            clk_r: false,
        }
    }

    /// Current clock phase
    pub fn clk(&self) -> bool {
        self.clk
    }

    /// Phase went high this cycle (leading edge)
    pub fn stb_r(&self) -> bool {
        !self.clk_r && self.clk
    }

    /// Phase went low this cycle (trailing edge)
    pub fn stb_f(&self) -> bool {
        self.clk_r && !self.clk
    }

    /// Advance by one system cycle; `reset` holds the generator at idle
    pub fn step(&mut self, reset: bool) {
        if reset {
            self.counter = 0;
            self.clk = false;
            self.clk_r = false;
            return;
        }

        self.clk_r = self.clk;
        let counter = self.counter;
        self.counter = if counter == 0 { self.cyc - 1 } else { counter - 1 };
        if counter == self.cyc / 2 {
            self.clk = true;
        } else if counter == 0 {
            self.clk = false;
        }
    }
}
