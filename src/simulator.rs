use camino::Utf8Path;
use eyre::Result;
use marlin::{
    verilator::{VerilatorRuntime, VerilatorRuntimeOptions},
    verilog::prelude::*,
};

use crate::config::WORD_ADDR_WIDTH;
use crate::port::{PortId, PortSignal, XbarDut};

// Crossbar testbench top (includes the mock memories)
#[verilog(src = "xbar_tb.sv", name = "xbar_tb")]
pub struct XbarTestbench;

pub fn create_xbar_runtime(artifacts: &Utf8Path) -> Result<VerilatorRuntime> {
    let include_paths = [Utf8Path::new("rtl"), Utf8Path::new(".")];
    let src_files = [
        Utf8Path::new("xbar_tb.sv"),
        Utf8Path::new("rtl/xbar.sv"),
        Utf8Path::new("rtl/mock_memory.sv"),
    ];

    VerilatorRuntime::new(
        artifacts,
        &src_files,
        &include_paths,
        [],
        VerilatorRuntimeOptions::default_logging(),
    )
    .map_err(|e| eyre::eyre!("Failed to create runtime: {}", e))
}

/// [`XbarDut`] over the Verilated testbench, with optional VCD capture.
pub struct VerilatedXbar<'ctx> {
    model: XbarTestbench<'ctx>,
    trace: Option<Box<dyn FnMut(u64) + 'ctx>>,
}

impl<'ctx> VerilatedXbar<'ctx> {
    pub fn new(model: XbarTestbench<'ctx>) -> Self {
        Self { model, trace: None }
    }

    pub fn create(runtime: &'ctx VerilatorRuntime) -> Result<Self> {
        let model = runtime
            .create_model_simple::<XbarTestbench>()
            .map_err(|e| eyre::eyre!("Failed to create xbar model: {:?}", e))?;
        Ok(Self::new(model))
    }

    /// Dumps every evaluation to `path` from now on.
    pub fn trace_to(&mut self, path: &Utf8Path) {
        let mut vcd = self.model.open_vcd(path.as_std_path());
        self.trace = Some(Box::new(move |time| vcd.dump(time)));
    }
}

impl XbarDut for VerilatedXbar<'_> {
    fn eval(&mut self) {
        self.model.eval();
    }

    fn clk(&self) -> bool {
        self.model.clk_i != 0
    }

    fn set_clk(&mut self, high: bool) {
        self.model.clk_i = high as u8;
    }

    fn set_rst_n(&mut self, high: bool) {
        self.model.rst_ni = high as u8;
    }

    fn set_peripheral_delay(&mut self, peripheral: usize, delay: u32) {
        let delay = delay.min(u8::MAX as u32) as u8;
        match peripheral {
            0 => self.model.p1_delay = delay,
            1 => self.model.p2_delay = delay,
            2 => self.model.p3_delay = delay,
            3 => self.model.p4_delay = delay,
            _ => {}
        }
    }

    fn read(&self, port: PortId, signal: PortSignal) -> u32 {
        let m = &self.model;
        match (port.number(), signal) {
            (1, PortSignal::Req) => m.c1_req_i as u32,
            (1, PortSignal::Ready) => m.c1_ready_o as u32,
            (1, PortSignal::Addr) => m.c1_addr_i as u32,
            (1, PortSignal::Rdata) => m.c1_rdata_o,
            (2, PortSignal::Req) => m.c2_req_i as u32,
            (2, PortSignal::Ready) => m.c2_ready_o as u32,
            (2, PortSignal::Addr) => m.c2_addr_i as u32,
            (2, PortSignal::Rdata) => m.c2_rdata_o,
            (2, PortSignal::Wen) => m.c2_wen_i as u32,
            (2, PortSignal::Be) => m.c2_be_i as u32,
            (2, PortSignal::Wdata) => m.c2_wdata_i,
            (3, PortSignal::Req) => m.c3_req_i as u32,
            (3, PortSignal::Ready) => m.c3_ready_o as u32,
            (3, PortSignal::Addr) => m.c3_addr_i as u32,
            (3, PortSignal::Rdata) => m.c3_rdata_o,
            (3, PortSignal::Wen) => m.c3_wen_i as u32,
            (3, PortSignal::Be) => m.c3_be_i as u32,
            (3, PortSignal::Wdata) => m.c3_wdata_i,
            _ => 0,
        }
    }

    fn drive(&mut self, port: PortId, signal: PortSignal, value: u32) {
        let m = &mut self.model;
        match (port.number(), signal) {
            (1, PortSignal::Req) => m.c1_req_i = value as u8,
            (1, PortSignal::Addr) => m.c1_addr_i = value as u16,
            (2, PortSignal::Req) => m.c2_req_i = value as u8,
            (2, PortSignal::Addr) => m.c2_addr_i = value as u16,
            (2, PortSignal::Wen) => m.c2_wen_i = value as u8,
            (2, PortSignal::Be) => m.c2_be_i = value as u8,
            (2, PortSignal::Wdata) => m.c2_wdata_i = value,
            (3, PortSignal::Req) => m.c3_req_i = value as u8,
            (3, PortSignal::Addr) => m.c3_addr_i = value as u16,
            (3, PortSignal::Wen) => m.c3_wen_i = value as u8,
            (3, PortSignal::Be) => m.c3_be_i = value as u8,
            (3, PortSignal::Wdata) => m.c3_wdata_i = value,
            _ => {}
        }
    }

    fn is_write_capable(&self, port: PortId) -> bool {
        port.number() != 1
    }

    fn word_addr_width(&self) -> u32 {
        WORD_ADDR_WIDTH
    }

    fn dump(&mut self, time: u64) {
        if let Some(trace) = self.trace.as_mut() {
            trace(time);
        }
    }
}
