//! Cycle-level Rust model of `xbar_tb.sv`: three controllers, four mock
//! memories, round-robin grant per memory.
//!
//! Evaluation follows Verilator semantics. Inputs are plain state, `eval()`
//! performs the registered update when it sees a rising clock edge and then
//! settles the combinational outputs.

use crate::config::{AddressMap, CONTROLLER_PORTS, INITIAL_PATTERN, PERIPHERAL_COUNT, PERIPHERAL_DEPTH};
use crate::port::{PortId, PortSignal, XbarDut};
use crate::shadow::merge_byte_lanes;

#[derive(Debug, Clone, Copy, Default)]
struct ControllerInputs {
    req: bool,
    addr: u32,
    wen: bool,
    be: u8,
    wdata: u32,
}

#[derive(Debug, Clone)]
struct MockMemory {
    words: [u32; PERIPHERAL_DEPTH],
    delay: u32,
    grant: Option<usize>,
    waited: u32,
    last_grant: usize,
}

impl MockMemory {
    fn new() -> Self {
        Self {
            words: INITIAL_PATTERN,
            delay: 0,
            grant: None,
            waited: 0,
            last_grant: CONTROLLER_PORTS - 1,
        }
    }

    fn reset(&mut self) {
        self.words = INITIAL_PATTERN;
        self.grant = None;
        self.waited = 0;
        self.last_grant = CONTROLLER_PORTS - 1;
    }

    fn responding(&self) -> bool {
        self.grant.is_some() && self.waited >= self.delay
    }
}

/// One `eval()` snapshot handed to [`XbarDut::dump`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceSample {
    pub time: u64,
    pub clk: bool,
    pub req: [bool; CONTROLLER_PORTS],
    pub ready: [bool; CONTROLLER_PORTS],
}

#[derive(Debug, Clone)]
pub struct BehavioralXbar {
    map: AddressMap,
    clk: bool,
    last_clk: bool,
    rst_n: bool,
    inputs: [ControllerInputs; CONTROLLER_PORTS],
    memories: [MockMemory; PERIPHERAL_COUNT],
    ready: [bool; CONTROLLER_PORTS],
    rdata: [u32; CONTROLLER_PORTS],
    trace: Option<Vec<TraceSample>>,
    read_corruption: u32,
    spurious_ready: Option<usize>,
}

impl Default for BehavioralXbar {
    fn default() -> Self {
        Self::new()
    }
}

impl BehavioralXbar {
    pub fn new() -> Self {
        Self {
            map: AddressMap::default(),
            clk: false,
            last_clk: false,
            rst_n: true,
            inputs: [ControllerInputs::default(); CONTROLLER_PORTS],
            memories: std::array::from_fn(|_| MockMemory::new()),
            ready: [false; CONTROLLER_PORTS],
            rdata: [0; CONTROLLER_PORTS],
            trace: None,
            read_corruption: 0,
            spurious_ready: None,
        }
    }

    /// Keeps a [`TraceSample`] for every dump.
    pub fn with_trace(mut self) -> Self {
        self.trace = Some(Vec::new());
        self
    }

    /// XORs `mask` into every read response.
    pub fn corrupt_reads(&mut self, mask: u32) {
        self.read_corruption = mask;
    }

    /// Raises ready on `port` whenever its request is low.
    pub fn spurious_ready(&mut self, port: PortId) {
        self.spurious_ready = Some(port.index());
    }

    /// Word currently stored in a mock memory.
    pub fn memory_word(&self, peripheral: usize, offset: usize) -> u32 {
        self.memories[peripheral].words[offset % PERIPHERAL_DEPTH]
    }

    pub fn trace(&self) -> &[TraceSample] {
        self.trace.as_deref().unwrap_or_default()
    }

    fn target(&self, controller: usize) -> (usize, usize) {
        self.map.decode(self.inputs[controller].addr)
    }

    fn rising_edge(&mut self) {
        if !self.rst_n {
            self.memories.iter_mut().for_each(MockMemory::reset);
            return;
        }

        for p in 0..PERIPHERAL_COUNT {
            let mut completed = None;

            if let Some(c) = self.memories[p].grant {
                let input = self.inputs[c];
                if !input.req {
                    self.memories[p].grant = None;
                } else if self.memories[p].responding() {
                    // Handshake: transfer happens on this edge.
                    if input.wen {
                        let offset = self.map.offset_of(input.addr);
                        let word = &mut self.memories[p].words[offset];
                        *word = merge_byte_lanes(*word, input.wdata, input.be);
                    }
                    self.memories[p].grant = None;
                    completed = Some(c);
                } else {
                    self.memories[p].waited += 1;
                }
            }

            if self.memories[p].grant.is_none() {
                let start = self.memories[p].last_grant + 1;
                let next = (start..start + CONTROLLER_PORTS)
                    .map(|c| c % CONTROLLER_PORTS)
                    .find(|&c| {
                        completed != Some(c)
                            && self.inputs[c].req
                            && self.target(c).0 == p
                    });
                if let Some(c) = next {
                    let memory = &mut self.memories[p];
                    memory.grant = Some(c);
                    memory.waited = 0;
                    memory.last_grant = c;
                }
            }
        }
    }

    fn settle(&mut self) {
        for c in 0..CONTROLLER_PORTS {
            let (p, offset) = self.target(c);
            let memory = &self.memories[p];
            let granted = memory.grant == Some(c) && memory.responding();
            let ready = self.inputs[c].req && granted;

            self.ready[c] = ready || (self.spurious_ready == Some(c) && !self.inputs[c].req);
            self.rdata[c] = if ready {
                memory.words[offset] ^ self.read_corruption
            } else {
                0
            };
        }
    }
}

impl XbarDut for BehavioralXbar {
    fn eval(&mut self) {
        if self.clk && !self.last_clk {
            self.rising_edge();
        }
        self.last_clk = self.clk;
        self.settle();
    }

    fn clk(&self) -> bool {
        self.clk
    }

    fn set_clk(&mut self, high: bool) {
        self.clk = high;
    }

    fn set_rst_n(&mut self, high: bool) {
        self.rst_n = high;
    }

    fn set_peripheral_delay(&mut self, peripheral: usize, delay: u32) {
        if let Some(memory) = self.memories.get_mut(peripheral) {
            memory.delay = delay;
        }
    }

    fn read(&self, port: PortId, signal: PortSignal) -> u32 {
        let c = port.index();
        let input = &self.inputs[c];
        match signal {
            PortSignal::Req => input.req as u32,
            PortSignal::Ready => self.ready[c] as u32,
            PortSignal::Addr => input.addr,
            PortSignal::Rdata => self.rdata[c],
            _ if !self.is_write_capable(port) => 0,
            PortSignal::Wen => input.wen as u32,
            PortSignal::Be => input.be as u32,
            PortSignal::Wdata => input.wdata,
        }
    }

    fn drive(&mut self, port: PortId, signal: PortSignal, value: u32) {
        if signal.is_write_only() && !self.is_write_capable(port) {
            return;
        }
        let input = &mut self.inputs[port.index()];
        match signal {
            PortSignal::Req => input.req = value != 0,
            PortSignal::Addr => input.addr = self.map.mask(value),
            PortSignal::Wen => input.wen = value != 0,
            PortSignal::Be => input.be = (value & 0xF) as u8,
            PortSignal::Wdata => input.wdata = value,
            PortSignal::Ready | PortSignal::Rdata => {}
        }
    }

    fn is_write_capable(&self, port: PortId) -> bool {
        port.number() != 1
    }

    fn word_addr_width(&self) -> u32 {
        self.map.word_addr_width()
    }

    fn dump(&mut self, time: u64) {
        let req = std::array::from_fn(|c| self.inputs[c].req);
        let sample = TraceSample {
            time,
            clk: self.clk,
            req,
            ready: self.ready,
        };
        if let Some(trace) = self.trace.as_mut() {
            trace.push(sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(n: u32) -> PortId {
        PortId::new(n).unwrap()
    }

    fn edge(dut: &mut BehavioralXbar) {
        dut.set_clk(true);
        dut.eval();
        dut.set_clk(false);
        dut.eval();
    }

    #[test]
    fn zero_delay_read_is_ready_one_edge_after_request() {
        let mut dut = BehavioralXbar::new();
        dut.drive(port(1), PortSignal::Addr, 0x4002);
        dut.drive(port(1), PortSignal::Req, 1);
        dut.eval();
        assert_eq!(dut.read(port(1), PortSignal::Ready), 0);

        edge(&mut dut);
        assert_eq!(dut.read(port(1), PortSignal::Ready), 1);
        assert_eq!(dut.read(port(1), PortSignal::Rdata), 0x1234_ABCD);
    }

    #[test]
    fn delay_postpones_ready() {
        let mut dut = BehavioralXbar::new();
        dut.set_peripheral_delay(0, 2);
        dut.drive(port(2), PortSignal::Req, 1);
        edge(&mut dut);
        edge(&mut dut);
        assert_eq!(dut.read(port(2), PortSignal::Ready), 0);
        edge(&mut dut);
        assert_eq!(dut.read(port(2), PortSignal::Ready), 1);
    }

    #[test]
    fn write_is_committed_on_the_handshake_edge() {
        let mut dut = BehavioralXbar::new();
        dut.drive(port(3), PortSignal::Addr, 0xC002);
        dut.drive(port(3), PortSignal::Wen, 1);
        dut.drive(port(3), PortSignal::Be, 0x3);
        dut.drive(port(3), PortSignal::Wdata, 0xABAB_ABAB);
        dut.drive(port(3), PortSignal::Req, 1);
        edge(&mut dut);
        assert_eq!(dut.memory_word(3, 2), 0x1234_ABCD);
        edge(&mut dut);
        assert_eq!(dut.memory_word(3, 2), 0x1234_ABAB);
    }

    #[test]
    fn contending_controllers_are_served_one_at_a_time() {
        let mut dut = BehavioralXbar::new();
        for n in 1..=3 {
            dut.drive(port(n), PortSignal::Addr, 0x4000);
            dut.drive(port(n), PortSignal::Req, 1);
        }
        edge(&mut dut);
        let ready: Vec<u32> = (1..=3).map(|n| dut.read(port(n), PortSignal::Ready)).collect();
        assert_eq!(ready.iter().sum::<u32>(), 1);
    }

    #[test]
    fn reset_restores_the_pattern() {
        let mut dut = BehavioralXbar::new();
        dut.drive(port(2), PortSignal::Wen, 1);
        dut.drive(port(2), PortSignal::Be, 0xF);
        dut.drive(port(2), PortSignal::Req, 1);
        edge(&mut dut);
        edge(&mut dut);
        assert_eq!(dut.memory_word(0, 0), 0);

        dut.drive(port(2), PortSignal::Req, 0);
        dut.set_rst_n(false);
        edge(&mut dut);
        assert_eq!(dut.memory_word(0, 0), 0xDEAD_BEEF);
    }

    #[test]
    fn read_only_port_ignores_write_signals() {
        let mut dut = BehavioralXbar::new();
        dut.drive(port(1), PortSignal::Wen, 1);
        assert_eq!(dut.read(port(1), PortSignal::Wen), 0);
    }
}
