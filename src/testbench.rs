//! Clock-phase driver.
//!
//! Each cycle has two landing points: the stimulus phase right after the
//! rising edge, where inputs may be changed, and the response phase right
//! after the falling edge, where outputs are sampled. Rising-edge half steps
//! advance time by 1, falling-edge half steps by 4.

use crate::error::TbResult;
use crate::port::{PortId, PortView, XbarDut};
use crate::report::{LogCrateSink, LogRecord, LogSink, Severity};

const RISING_TIME_INC: u64 = 1;
const FALLING_TIME_INC: u64 = 4;
const RESET_CYCLES: u32 = 10;

pub struct Testbench<D: XbarDut, S: LogSink = LogCrateSink> {
    dut: D,
    sink: S,
    time: u64,
}

impl<D: XbarDut> Testbench<D> {
    pub fn new(dut: D) -> Self {
        Self::with_sink(dut, LogCrateSink)
    }
}

impl<D: XbarDut, S: LogSink> Testbench<D, S> {
    pub fn with_sink(mut dut: D, sink: S) -> Self {
        dut.eval();
        dut.dump(0);
        Self {
            dut,
            sink,
            time: 1,
        }
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn dut(&self) -> &D {
        &self.dut
    }

    pub fn dut_mut(&mut self) -> &mut D {
        &mut self.dut
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Accessor for controller port `n` (1 to 3).
    pub fn port(&mut self, n: u32) -> TbResult<PortView<'_, D>> {
        let id = PortId::new(n)?;
        Ok(PortView::new(&mut self.dut, id))
    }

    pub fn port_view(&mut self, id: PortId) -> PortView<'_, D> {
        PortView::new(&mut self.dut, id)
    }

    pub fn log(&mut self, severity: Severity, message: impl Into<String>) {
        let record = LogRecord::new(severity, self.time, message);
        self.sink.record(&record);
    }

    pub fn emit(&mut self, record: LogRecord) {
        self.sink.record(&record);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(Severity::Info, message);
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.log(Severity::Debug, message);
    }

    fn half_step(&mut self, clk: bool, time_inc: u64) {
        self.dut.eval();
        self.dut.dump(self.time);
        self.time += time_inc;

        self.dut.set_clk(clk);

        self.dut.eval();
        self.dut.dump(self.time);
        self.time += time_inc;
    }

    /// Returns just after a rising edge. Always advances time: when already in
    /// the stimulus phase a full cycle is run first.
    pub fn step_to_stimulus(&mut self) {
        if self.dut.clk() {
            self.step_to_response();
        }
        self.half_step(true, RISING_TIME_INC);
    }

    /// Returns just after a falling edge. Always advances time.
    pub fn step_to_response(&mut self) {
        if !self.dut.clk() {
            self.step_to_stimulus();
        }
        self.half_step(false, FALLING_TIME_INC);
    }

    /// Runs exactly `n` full clock cycles and ends in the phase it started in.
    pub fn step_clock(&mut self, n: u32) {
        for _ in 0..n {
            if self.dut.clk() {
                self.step_to_response();
                self.step_to_stimulus();
            } else {
                self.step_to_stimulus();
                self.step_to_response();
            }
        }
    }

    /// Holds `rst_ni` low for ten cycles, then lets the design settle for ten more.
    pub fn reset(&mut self) {
        self.step_to_stimulus();
        self.dut.set_rst_n(false);
        self.step_clock(RESET_CYCLES);
        self.dut.set_rst_n(true);
        self.step_clock(RESET_CYCLES);
    }
}
