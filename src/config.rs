//! Address-space parameters of the crossbar testbench and the run
//! configuration of the `xbar-tb` binary.

use camino::Utf8PathBuf;

/// Width of a word address on every controller port (`PARAM_WORD_ADDR_WIDTH`).
pub const WORD_ADDR_WIDTH: u32 = 16;
/// Number of peripherals behind the crossbar, decoded from the top two address bits.
pub const PERIPHERAL_COUNT: usize = 4;
/// Words per peripheral. Addresses wrap inside a peripheral: `mem[n + 4] == mem[n]`.
pub const PERIPHERAL_DEPTH: usize = 4;
/// Number of controller (requester) ports.
pub const CONTROLLER_PORTS: usize = 3;

/// Contents of every mock memory right after reset.
pub const INITIAL_PATTERN: [u32; PERIPHERAL_DEPTH] =
    [0xDEAD_BEEF, 0xF1BE_F1BE, 0x1234_ABCD, 0xFFFF_FFFF];

/// Decodes word addresses into `(peripheral, offset)` pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressMap {
    word_addr_width: u32,
}

impl Default for AddressMap {
    fn default() -> Self {
        Self::new(WORD_ADDR_WIDTH)
    }
}

impl AddressMap {
    pub fn new(word_addr_width: u32) -> Self {
        assert!(
            (2..=32).contains(&word_addr_width),
            "word address width must leave room for the peripheral select bits"
        );
        Self { word_addr_width }
    }

    pub fn word_addr_width(&self) -> u32 {
        self.word_addr_width
    }

    /// Truncates `addr` to the width of the address bus.
    pub fn mask(&self, addr: u32) -> u32 {
        if self.word_addr_width >= 32 {
            addr
        } else {
            addr & ((1u32 << self.word_addr_width) - 1)
        }
    }

    fn select_shift(&self) -> u32 {
        self.word_addr_width - 2
    }

    pub fn peripheral_of(&self, addr: u32) -> usize {
        ((self.mask(addr) >> self.select_shift()) & 0x3) as usize
    }

    pub fn offset_of(&self, addr: u32) -> usize {
        addr as usize % PERIPHERAL_DEPTH
    }

    pub fn decode(&self, addr: u32) -> (usize, usize) {
        (self.peripheral_of(addr), self.offset_of(addr))
    }

    /// First word address of `peripheral`.
    pub fn base_of(&self, peripheral: usize) -> u32 {
        ((peripheral as u32) & 0x3) << self.select_shift()
    }
}

/// Which simulation model the binary drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// Pure Rust model of the crossbar and its mock memories.
    Behavioral,
    /// Verilated `xbar_tb.sv` (requires the `verilator` feature).
    Verilator,
}

/// Command line configuration of the `xbar-tb` binary.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "xbar-tb", about = "Drives request sequences through the crossbar and checks every response")]
pub struct HarnessConfig {
    /// Scenarios to run, in order. Runs all of them when omitted.
    #[arg(long = "scenario", value_delimiter = ',')]
    pub scenarios: Vec<String>,

    /// Seed for the variable delay fuzz scenario.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Slots per port generated by the variable delay fuzz scenario.
    #[arg(long, default_value_t = 150)]
    pub fuzz_requests: usize,

    /// Model to drive.
    #[arg(long, value_enum, default_value_t = Backend::Behavioral)]
    pub backend: Backend,

    /// Build directory for Verilator artifacts.
    #[arg(long, default_value = "artifacts")]
    pub artifacts: Utf8PathBuf,

    /// VCD trace output (Verilator backend only).
    #[arg(long, default_value = "build/trace.vcd")]
    pub trace: Utf8PathBuf,

    /// Skip trace capture.
    #[arg(long)]
    pub no_trace: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peripheral_select_uses_top_two_bits() {
        let map = AddressMap::default();
        assert_eq!(map.peripheral_of(0x0000), 0);
        assert_eq!(map.peripheral_of(0x4000), 1);
        assert_eq!(map.peripheral_of(0x8000), 2);
        assert_eq!(map.peripheral_of(0xC003), 3);
        assert_eq!(map.base_of(3), 0xC000);
    }

    #[test]
    fn bits_above_the_bus_are_ignored() {
        let map = AddressMap::default();
        assert_eq!(map.peripheral_of(0x1_4000), 1);
        assert_eq!(map.mask(0xFFFF_FFFF), 0xFFFF);
    }

    #[test]
    fn offsets_wrap_every_four_words() {
        let map = AddressMap::default();
        assert_eq!(map.decode(0x4001), (1, 1));
        assert_eq!(map.decode(0x4005), (1, 1));
        assert_eq!(map.decode(0x7FFF), (1, 3));
    }
}
